//! Heading slug generation, unique per document.

use std::collections::HashSet;

/// Highest numeric suffix tried before a colliding heading is given up on.
const MAX_SUFFIX: u32 = 99;

/// Produces heading anchors for one document, remembering what it already
/// handed out so that repeated headings get `-1`, `-2`, ... suffixes.
#[derive(Debug, Default)]
pub struct SlugGenerator {
    seen: HashSet<String>,
}

impl SlugGenerator {
    /// Slugify `text` and register a unique anchor for it.
    /// Returns `None` for empty text, or when every suffix up to 99 is taken.
    pub fn generate(&mut self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let base = slugify(text);
        for i in 0..=MAX_SUFFIX {
            let candidate = if i == 0 { base.clone() } else { format!("{base}-{i}") };
            if self.seen.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
        None
    }

    /// Consume the generator, yielding every anchor it produced.
    pub fn into_anchors(self) -> HashSet<String> {
        self.seen
    }
}

/// Convert plain heading text to its base slug.
///
/// Letters and digits are lowercased, `-` and `_` are kept, each run of
/// whitespace becomes one `-`, and everything else is dropped. Whitespace is
/// ignored until the first letter or digit. Dropped symbols still split
/// whitespace runs, so `Foo & Bar` yields `foo--bar`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut seen_alphanumeric = false;
    let mut in_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if seen_alphanumeric && !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c == '-' || c == '_' {
            slug.push(c);
        } else if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            seen_alphanumeric = true;
        }
    }
    slug
}
