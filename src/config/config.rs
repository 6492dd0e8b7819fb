//! TOML configuration parsing.

#[cfg(feature = "config")]
use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application level settings for the dispatcher and the help output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Command shown in usage lines; the executable name when unset
    pub command_line: Option<String>,
    /// Omit plain parameters and let commands resolve them as services
    pub invoke_auto: bool,
    /// Show full error chains instead of the top level message
    pub full_errors: bool,
    /// Printed once before help output
    pub help_header: Option<String>,
    /// Colour help output (the `help` feature); `NO_COLOR` turns it off
    pub color: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command_line: None,
            invoke_auto: false,
            full_errors: false,
            help_header: None,
            color: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

impl CliConfig {
    /// Parse a TOML document
    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::config(format!("Invalid configuration: {e}")))
    }

    /// Read and parse a TOML file
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Command shown in usage lines
    pub fn command_line(&self) -> String {
        if let Some(command_line) = &self.command_line {
            return command_line.clone();
        }
        std::env::args()
            .next()
            .as_deref()
            .map(Path::new)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string())
    }

    /// Whether help output is coloured
    pub fn use_color(&self) -> bool {
        cfg!(feature = "help") && self.color
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_document() {
        let config = CliConfig::from_toml_str(
            r#"
command_line = "demo-cli"
invoke_auto = true
help_header = "Demo CLI 1.0"
"#,
        )
        .unwrap();
        assert_eq!(config.command_line(), "demo-cli");
        assert!(config.invoke_auto);
        assert!(!config.full_errors);
        assert_eq!(config.help_header.as_deref(), Some("Demo CLI 1.0"));
    }

    #[test]
    fn test_invalid_document() {
        let error = CliConfig::from_toml_str("invoke_auto = \"yes\"").unwrap_err();
        assert!(matches!(error, CliError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "full_errors = true").unwrap();
        writeln!(file, "color = false").unwrap();

        let config = CliConfig::from_file(file.path()).unwrap();
        assert!(config.full_errors);
        assert!(!config.use_color());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = CliConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(error.to_string().contains("Failed to read"));
    }
}
