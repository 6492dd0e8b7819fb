//! Configuration for CLI applications.
//!
//! [`CliConfig`] is always available. Loading it from TOML needs the
//! `config` feature.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "config")]
//! # {
//! use cliapi::config::CliConfig;
//!
//! let config = CliConfig::from_toml_str("command_line = \"demo\"\ncolor = false").unwrap();
//! assert_eq!(config.command_line(), "demo");
//! assert!(!config.use_color());
//! # }
//! ```

#[allow(clippy::module_inception)]
mod config;

pub use self::config::CliConfig;
