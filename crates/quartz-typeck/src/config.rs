//! Checker configuration.

use serde::Deserialize;

/// Tunables for one analysis run.
///
/// Deserializes from a TOML table; missing keys take their defaults:
///
/// ```toml
/// max_iterations = 10000
/// max_nesting = 64
/// file_name = "main.qz"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Upper bound on unit checks before the run is abandoned with an
    /// internal error.
    pub max_iterations: u32,
    /// How deep method instances are checked eagerly at their first call
    /// site. Deeper instances are queued instead.
    pub max_nesting: u32,
    /// Source name shown in rendered diagnostics; defaults to the file
    /// recorded in the diagnostic's location.
    pub file_name: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            max_iterations: 10_000,
            max_nesting: 64,
            file_name: None,
        }
    }
}

impl CheckConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = CheckConfig::from_toml_str("").unwrap();
        assert_eq!(config, CheckConfig::default());
        assert_eq!(config.max_iterations, 10_000);
    }

    #[test]
    fn partial_override() {
        let config = CheckConfig::from_toml_str("max_iterations = 50\nfile_name = \"a.qz\"").unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.max_nesting, 64);
        assert_eq!(config.file_name.as_deref(), Some("a.qz"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(CheckConfig::from_toml_str("max_iter = 1").is_err());
    }
}
