use crate::ActionResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "quickfix.config.json";

/// Engine configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Options handed to every post-processing pass
    #[serde(default)]
    pub cleanup: CleanupOptions,
}

impl EngineConfig {
    /// Load config from a directory. A missing file yields the defaults.
    pub fn load(dir: impl AsRef<Path>) -> ActionResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> ActionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOptions {
    #[serde(default)]
    pub add_imports: AddImportOptions,

    #[serde(default)]
    pub simplifier: SimplifierOptions,

    #[serde(default)]
    pub formatting: FormattingOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddImportOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directive keyword, e.g. `using` or `import`
    #[serde(default = "default_directive_keyword")]
    pub directive_keyword: String,

    /// Keep `System` namespaces ahead of the others
    #[serde(default = "default_true")]
    pub place_system_first: bool,
}

impl Default for AddImportOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            directive_keyword: default_directive_keyword(),
            place_system_first: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifierOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SimplifierOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingOptions {
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,

    #[serde(default = "default_true")]
    pub trim_trailing_whitespace: bool,

    #[serde(default = "default_true")]
    pub normalize_line_endings: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            trim_trailing_whitespace: true,
            normalize_line_endings: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_directive_keyword() -> String {
    "using".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionError;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "cleanup": {
                "addImports": { "directiveKeyword": "import", "placeSystemFirst": false },
                "formatting": { "collapseWhitespace": false }
            }
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.cleanup.add_imports.directive_keyword, "import");
        assert!(!config.cleanup.add_imports.place_system_first);
        assert!(config.cleanup.add_imports.enabled);
        assert!(!config.cleanup.formatting.collapse_whitespace);
        assert!(config.cleanup.formatting.trim_trailing_whitespace);
        assert!(config.cleanup.simplifier.enabled);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config.cleanup.add_imports.directive_keyword, "using");
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "cleanup": { "simplifier": { "enabled": false } } }"#,
        )
        .unwrap();

        let config = EngineConfig::load(dir.path()).unwrap();
        assert!(!config.cleanup.simplifier.enabled);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();

        let result = EngineConfig::load(dir.path());
        assert!(matches!(result, Err(ActionError::Config(_))));
    }
}
