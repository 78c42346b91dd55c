//! User text handed to the pipeline by the host application.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which piece of a photo's text a fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Caption,
    Comment,
}

impl FieldKind {
    pub const ALL: [FieldKind; 2] = [FieldKind::Caption, FieldKind::Comment];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Caption => "caption",
            FieldKind::Comment => "comment",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a fragment across revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentKey {
    pub content_id: String,
    pub field_kind: FieldKind,
}

impl FragmentKey {
    pub fn new(content_id: impl Into<String>, field_kind: FieldKind) -> Self {
        Self {
            content_id: content_id.into(),
            field_kind,
        }
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_id, self.field_kind)
    }
}

/// One revision of a caption or comment.
///
/// Never mutated: an edit arrives as a new fragment with a higher
/// `revision`, which is how stale cache entries are detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Opaque identifier from the content store (e.g. photo id)
    pub content_id: String,
    pub field_kind: FieldKind,
    pub text: String,
    /// Monotonically increasing per (content_id, field_kind)
    pub revision: u64,
}

impl TextFragment {
    pub fn new(
        content_id: impl Into<String>,
        field_kind: FieldKind,
        text: impl Into<String>,
        revision: u64,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            field_kind,
            text: text.into(),
            revision,
        }
    }

    pub fn caption(content_id: impl Into<String>, text: impl Into<String>, revision: u64) -> Self {
        Self::new(content_id, FieldKind::Caption, text, revision)
    }

    pub fn comment(content_id: impl Into<String>, text: impl Into<String>, revision: u64) -> Self {
        Self::new(content_id, FieldKind::Comment, text, revision)
    }

    pub fn key(&self) -> FragmentKey {
        FragmentKey::new(self.content_id.clone(), self.field_kind)
    }

    /// Same identity, new text, next revision (saturates at `u64::MAX`).
    pub fn edited(&self, text: impl Into<String>) -> Self {
        Self {
            content_id: self.content_id.clone(),
            field_kind: self.field_kind,
            text: text.into(),
            revision: self.revision.saturating_add(1),
        }
    }
}
