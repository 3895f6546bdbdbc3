use std::fmt::Write as _;

use serde::Serialize;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::types::{BrokenLink, ViolationKind};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// How broken links are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One `<file>: link "<raw>" points to ...` line per broken link.
    #[default]
    Text,
    /// A JSON array of broken link records.
    Json,
    /// GitHub Actions `::error` workflow commands.
    Github,
}

/// Flat JSON shape of one broken link.
#[derive(Serialize)]
struct JsonRecord<'a> {
    file: &'a str,
    fragment: &'a str,
    kind: ViolationKind,
    line_end: u32,
    line_start: u32,
    path: &'a str,
    raw: &'a str,
    reason: &'static str,
}

/// Render broken links in the requested format. Output ends with a newline
/// unless `links` is empty in text or github format.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn render_broken_links(links: &[BrokenLink], format: Format) -> Result<String, Error> {
    let mut out = String::new();
    match format {
        Format::Text => {
            for link in links {
                let _ = writeln!(out, "{link}");
            }
        },
        Format::Json => {
            let records: Vec<JsonRecord<'_>> = links.iter().map(json_record).collect();
            out = serde_json::to_string_pretty(&records)?;
            out.push('\n');
        },
        Format::Github => {
            for link in links {
                out.push_str(&github_annotation(link));
                out.push('\n');
            }
        },
    }
    Ok(out)
}

fn json_record(b: &BrokenLink) -> JsonRecord<'_> {
    JsonRecord {
        file: &b.file,
        fragment: &b.link.fragment,
        kind: b.kind,
        line_end: b.link.line_end,
        line_start: b.link.line_start,
        path: &b.link.path,
        raw: &b.link.raw,
        reason: b.kind.reason(),
    }
}

/// A GitHub Actions error annotation. Line properties are omitted when the
/// enclosing block could not be located.
fn github_annotation(b: &BrokenLink) -> String {
    let mut props = format!("file={}", escape_property(&b.file));
    if b.link.line_start > 0 {
        let _ = write!(props, ",line={},endLine={}", b.link.line_start, b.link.line_end);
    }
    let _ = write!(props, ",title={}", escape_property(b.kind.reason()));
    format!("::error {props}::{}", escape_data(&b.to_string()))
}

/// Workflow command message escaping.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Workflow command property escaping; also covers `:` and `,`.
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

/// Render a fatal error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a fatal error as a structured markdown diagnostic: what happened,
/// and how to fix it where there is an obvious fix.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::InvalidPattern { pattern, source } => format!("\
# Error: Invalid Pattern

`{pattern}` is not a valid glob: {source}

## Fix

Pass a base-name glob such as:

    mdlinks -p '*.md'
"),

        Error::InvalidUtf8 { path } => format!("\
# Error: Invalid Encoding

`{}` is not valid UTF-8.

## Fix

Re-encode the file as UTF-8, or narrow the pattern so it is not matched.
", path.display()),

        Error::Io { path, source } => format!("\
# Error: I/O

Could not read `{}`: {source}
", path.display()),

        Error::ConfigRead { path, source } => format!("\
# Error: Config Unreadable

Could not read `{}`: {source}
", path.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid Config

{e}

## Fix

Check `{CONFIG_FILE}`. Known keys are `pattern`, `include` and `exclude`.
"),

        Error::Walk(e) => format!("\
# Error: Directory Walk

{e}
"),

        Error::Json(e) => format!("\
# Error: JSON Serialization

{e}
"),

        Error::BrokenLinks { links } => render_broken_summary(links.len()),
    }
}

fn render_broken_summary(count: usize) -> String {
    format!("\
# Broken Links

{count} broken link(s) found.
")
}
