//! Generator configuration.

use serde::Deserialize;

use crate::error::{GenError, GenResult};

/// Settings for one generation run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Prefix module segments prepended to every module path (`@ohos`)
    pub module_prefix: Option<String>,
    /// Slash-separated path prepended to every module path
    pub path_prefix: Option<String>,
    /// Keep declaration names as written instead of lower-casing the first character
    pub keep_name: bool,
    /// Indentation string
    pub indent: String,
    /// Whether to precede each generated entry point with a comment naming its declaration
    pub emit_comments: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module_prefix: None,
            path_prefix: None,
            keep_name: false,
            indent: "    ".to_string(),
            emit_comments: false,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML configuration file body
    pub fn from_toml_str(text: &str) -> GenResult<Self> {
        let config: GeneratorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GenResult<()> {
        if self.indent.is_empty() || !self.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(GenError::Config(format!(
                "indent must be non-empty whitespace, got {:?}",
                self.indent
            )));
        }
        Ok(())
    }

    /// Segments every module path starts with
    pub fn prefix_segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        if let Some(module) = &self.module_prefix {
            segments.extend(module.split('.').filter(|s| !s.is_empty()).map(String::from));
        }
        if let Some(path) = &self.path_prefix {
            segments.extend(path.split('/').filter(|s| !s.is_empty()).map(String::from));
        }
        segments
    }
}
