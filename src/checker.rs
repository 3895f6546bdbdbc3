//! Directory walk and link resolution.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use walkdir::{DirEntry, WalkDir};

use crate::cache::DocumentCache;
use crate::config::Config;
use crate::error::Error;
use crate::extract::Extractor;
use crate::types::{BrokenLink, Document, LinkInfo, ViolationKind};

/// Version-control metadata directory pruned from the walk.
const VCS_DIR: &str = ".git";

/// Scan `root` for files whose base name matches `pattern` and verify their
/// local links.
///
/// # Errors
///
/// Returns `Error::BrokenLinks` carrying every violation if any link is
/// broken. Fatal errors (`Error::InvalidPattern`, `Error::Io`,
/// `Error::InvalidUtf8`, `Error::Walk`) abort the scan.
pub fn check(root: &Path, pattern: &str, config: &Config) -> Result<(), Error> {
    let links = find_broken_links(root, pattern, config)?;
    if links.is_empty() {
        return Ok(());
    }
    Err(Error::BrokenLinks { links })
}

/// Collect broken links in walk order, then document order.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` before touching the filesystem if
/// `pattern` is not a valid glob, or the first read/decode/walk failure.
pub fn find_broken_links(
    root: &Path,
    pattern: &str,
    config: &Config,
) -> Result<Vec<BrokenLink>, Error> {
    let matcher = compile_pattern(pattern)?;
    let mut scan = Scan {
        cache: DocumentCache::new(root, Extractor::default()),
        matcher,
        root,
    };
    let mut broken = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_dir(e));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() || !scan.matcher.is_match(entry.file_name()) {
            continue;
        }
        let rel = relative_slash_path(root, entry.path());
        if !config.should_scan(&rel) {
            tracing::debug!(path = %rel, "excluded by config");
            continue;
        }

        tracing::debug!(path = %rel, "checking links");
        let doc = scan.cache.get(&rel)?;
        for link in &doc.links {
            if let Some(kind) = scan.resolve(&rel, &doc, link)? {
                tracing::trace!(path = %rel, raw = %link.raw, ?kind, "broken link");
                broken.push(BrokenLink {
                    file: rel.clone(),
                    kind,
                    link: link.clone(),
                });
            }
        }
    }

    tracing::info!(
        documents = scan.cache.len(),
        broken = broken.len(),
        "scan complete"
    );
    Ok(broken)
}

/// Compile a base-name glob.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if the glob syntax is invalid.
fn compile_pattern(pattern: &str) -> Result<GlobMatcher, Error> {
    let glob = Glob::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(glob.compile_matcher())
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == VCS_DIR
}

/// `path` relative to `root`, joined with `/` regardless of platform.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Root-relative location a link path points at. Rooted paths (`/x.md`) are
/// taken from the scan root, others from the directory of `current`.
/// Returns `None` when `..` segments climb above the root.
fn resolve_link_path(current: &str, link_path: &str) -> Option<String> {
    let (base, rest) = match link_path.strip_prefix('/') {
        Some(rooted) => ("", rooted),
        None => (current.rsplit_once('/').map_or("", |(dir, _)| dir), link_path),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop()?;
            },
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// State of one scan: the root, the compiled pattern, and parsed documents.
struct Scan<'a> {
    cache: DocumentCache,
    matcher: GlobMatcher,
    root: &'a Path,
}

impl Scan<'_> {
    /// Classify one link of document `current`; `None` means it resolves.
    ///
    /// # Errors
    ///
    /// Returns fatal errors from parsing the linked document.
    fn resolve(
        &mut self,
        current: &str,
        doc: &Document,
        link: &LinkInfo,
    ) -> Result<Option<ViolationKind>, Error> {
        if link.path.is_empty() {
            if doc.has_anchor(&link.fragment) {
                return Ok(None);
            }
            return Ok(Some(ViolationKind::InternalAnchorNotFound));
        }

        let Some(target) = resolve_link_path(current, &link.path) else {
            return Ok(Some(ViolationKind::FileNotFound));
        };
        let target_path = self.root.join(&target);
        if !target_path.exists() {
            return Ok(Some(ViolationKind::FileNotFound));
        }
        if link.fragment.is_empty() || !target_path.is_file() {
            return Ok(None);
        }

        let base_name = target.rsplit('/').next().unwrap_or_default();
        if !self.matcher.is_match(base_name) {
            return Ok(None);
        }
        let target_doc = self.cache.get(&target)?;
        if target_doc.has_anchor(&link.fragment) {
            return Ok(None);
        }
        Ok(Some(ViolationKind::ExternalAnchorNotFound))
    }
}
