//! Per-scan memo of parsed documents, keyed by root-relative path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::Error;
use crate::extract::Extractor;
use crate::types::Document;

/// Reads and parses each markdown file at most once per scan, whether it is
/// first reached by the walk or as the target of another document's link.
pub struct DocumentCache {
    documents: HashMap<String, Rc<Document>>,
    extractor: Extractor,
    root: PathBuf,
}

impl DocumentCache {
    /// Empty cache for files under `root`.
    pub fn new(root: &Path, extractor: Extractor) -> Self {
        return Self {
            documents: HashMap::new(),
            extractor,
            root: root.to_path_buf(),
        };
    }

    /// Metadata for the document at root-relative path `rel`, parsing it on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or
    /// `Error::InvalidUtf8` if its contents are not UTF-8.
    pub fn get(&mut self, rel: &str) -> Result<Rc<Document>, Error> {
        if let Some(doc) = self.documents.get(rel) {
            tracing::trace!(path = rel, "document cache hit");
            return Ok(Rc::clone(doc));
        }

        let bytes = std::fs::read(self.root.join(rel)).map_err(|source| Error::Io {
            path: PathBuf::from(rel),
            source,
        })?;
        let source = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 {
            path: PathBuf::from(rel),
        })?;

        let doc = Rc::new(self.extractor.extract(&source));
        tracing::debug!(
            path = rel,
            anchors = doc.anchors.len(),
            links = doc.links.len(),
            "parsed document"
        );
        self.documents.insert(rel.to_string(), Rc::clone(&doc));
        return Ok(doc);
    }

    /// Number of documents parsed so far.
    pub fn len(&self) -> usize {
        return self.documents.len();
    }
}
