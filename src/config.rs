use std::path::Path;

use crate::error::Error;

/// Name of the optional config file looked up in the scan root.
pub const CONFIG_FILE: &str = ".mdlinks.toml";

/// Base-name glob used when neither the command line nor the config sets one.
pub const DEFAULT_PATTERN: &str = "*.md";

/// Project configuration loaded from `.mdlinks.toml`.
/// Include/exclude patterns are path prefixes applied to matched markdown files.
#[derive(Debug, Default)]
pub struct Config {
    exclude: Vec<String>,
    include: Vec<String>,
    pattern: Option<String>,
}

/// Raw TOML structure for `.mdlinks.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct MdlinksTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    pattern: Option<String>,
}

impl Config {
    /// Load config from `.mdlinks.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// A config file that exists but is malformed is an error, never a
    /// silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigRead` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(Error::ConfigRead { path, source }),
        };
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: MdlinksTomlConfig = toml::from_str(content)?;
        Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            pattern: raw.pattern,
        })
    }

    /// The file name pattern: `cli` if given, else the configured one, else `*.md`.
    pub fn pattern<'a>(&'a self, cli: Option<&'a str>) -> &'a str {
        cli.or(self.pattern.as_deref()).unwrap_or(DEFAULT_PATTERN)
    }

    /// Check whether a matched markdown file should be scanned for links.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    /// Files that are not scanned can still be link targets.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self.exclude.iter().any(|p| relative_path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pattern(None), "*.md");
        assert!(config.should_scan("any/where.md"));
    }

    #[test]
    fn cli_pattern_wins_over_config() {
        let config = Config::parse("pattern = \"*.markdown\"").unwrap();
        assert_eq!(config.pattern(None), "*.markdown");
        assert_eq!(config.pattern(Some("*.txt")), "*.txt");
    }

    #[test]
    fn include_then_exclude_prefixes() {
        let config = Config::parse(
            "include = [\"docs/\"]\nexclude = [\"docs/generated/\"]\n",
        )
        .unwrap();
        assert!(config.should_scan("docs/guide.md"));
        assert!(!config.should_scan("docs/generated/api.md"));
        assert!(!config.should_scan("README.md"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "pattern = [").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("patern = \"*.md\"").is_err());
    }
}
