/// Core domain types for mdlinks: extracted links, documents, and violations.
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// One local link or image target found in a markdown document.
/// At least one of `path` and `fragment` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    /// Only the fragment part of the link, without the leading `#`.
    pub fragment: String,
    /// Last line (1-based) of the enclosing block, or 0 when unknown.
    pub line_end: u32,
    /// First line (1-based) of the enclosing block, or 0 when unknown.
    pub line_start: u32,
    /// Only the path part of the link, percent-decoded.
    pub path: String,
    /// Target as written in the source, usually `some/path#fragment`.
    pub raw: String,
}

impl LinkInfo {
    /// Record the enclosing block's first and last line.
    pub const fn set_span(&mut self, (line_start, line_end): (u32, u32)) {
        self.line_start = line_start;
        self.line_end = line_end;
    }
}

/// Parsed metadata of one markdown file. Built once per scan, never mutated.
#[derive(Debug, Default)]
pub struct Document {
    /// Heading slugs, unique within this document.
    pub anchors: HashSet<String>,
    /// Local links in order of appearance.
    pub links: Vec<LinkInfo>,
}

impl Document {
    /// Whether `fragment` names one of this document's heading slugs.
    pub fn has_anchor(&self, fragment: &str) -> bool {
        return self.anchors.contains(fragment);
    }
}

/// Why a link is considered broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Path part points to a file that does not exist.
    FileNotFound,
    /// Fragment-only link names a slug missing from the current document.
    InternalAnchorNotFound,
    /// Fragment names a slug missing from the linked markdown document.
    ExternalAnchorNotFound,
}

impl ViolationKind {
    /// Short machine-friendly reason, also used as annotation title.
    pub const fn reason(self) -> &'static str {
        return match self {
            ViolationKind::FileNotFound => "link points to a non-existing file",
            ViolationKind::InternalAnchorNotFound => "link points to a non-existing local slug",
            ViolationKind::ExternalAnchorNotFound => "link points to a non-existing slug",
        };
    }

    /// The noun used in the human-readable line.
    const fn target_noun(self) -> &'static str {
        return match self {
            ViolationKind::FileNotFound => "file",
            ViolationKind::InternalAnchorNotFound => "local slug",
            ViolationKind::ExternalAnchorNotFound => "slug",
        };
    }
}

/// A broken link and the document it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    /// Document path relative to the scan root, `/`-separated.
    pub file: String,
    /// Classification of the violation.
    pub kind: ViolationKind,
    /// The offending link.
    pub link: LinkInfo,
}

impl fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(
            f,
            "{}: link {:?} points to a non-existing {}",
            self.file,
            self.link.raw,
            self.kind.target_noun()
        );
    }
}
