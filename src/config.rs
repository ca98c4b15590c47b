//! `sql2kql.toml` configuration.
//!
//! ```toml
//! [translate]
//! alias_style = "positional"
//! max_depth = 32
//!
//! [tables]
//! log = "SecurityLog"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{KqlError, KqlResult};
use crate::transpiler::{AliasStyle, TranslateOptions};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "sql2kql.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub translate: TranslateSettings,
    /// Table name substitutions, `old = "new"`.
    pub tables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslateSettings {
    pub alias_style: Option<AliasStyle>,
    pub max_depth: Option<usize>,
}

impl Config {
    pub fn from_toml(content: &str) -> KqlResult<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| KqlError::Config(e.to_string()))?;
        if config.translate.max_depth == Some(0) {
            return Err(KqlError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> KqlResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            KqlError::Config(message) => {
                KqlError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Load `./sql2kql.toml`, else `<config dir>/sql2kql/config.toml`.
    /// Returns the default config when neither exists.
    pub fn discover() -> KqlResult<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sql2kql").join("config.toml"));
        }
        paths
    }

    /// Translation options with this config applied over the defaults.
    pub fn options(&self) -> TranslateOptions {
        let mut options = TranslateOptions {
            tables: self.tables.clone(),
            ..Default::default()
        };
        if let Some(style) = self.translate.alias_style {
            options.alias_style = style;
        }
        if let Some(depth) = self.translate.max_depth {
            options.max_depth = depth;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [translate]
            alias_style = "positional"
            max_depth = 16

            [tables]
            log = "SecurityLog"
            "#,
        )
        .unwrap();
        let options = config.options();
        assert_eq!(options.alias_style, AliasStyle::Positional);
        assert_eq!(options.max_depth, 16);
        assert_eq!(options.tables.get("log").map(String::as_str), Some("SecurityLog"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.options(), TranslateOptions::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_toml("[translate]\nalias_style = \"fancy\""),
            Err(KqlError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[translate]\nmax_depth = 0"),
            Err(KqlError::Config(_))
        ));
        assert!(Config::from_toml("[unknown]\nx = 1").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/sql2kql.toml")).unwrap_err();
        assert!(matches!(err, KqlError::Io(_)));
    }
}
