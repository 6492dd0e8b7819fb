//! Help rendering and the built-in APIs.
//!
//! Usage lines and help pages are derived from the exported metadata.
//! The `help` feature adds tables and colour; without it the output is
//! plain aligned text. Besides the `help` API, `version` and `about`
//! print the [`AppInfo`] registered as a service on the app.

mod about;
mod api;
mod helper;
mod render;
mod version;

pub use about::{about_api, AboutApi};
pub use api::{help_api, HelpApi};
pub use helper::DefaultHelper;
pub use render::{
    api_help, argument_usage, context_help, general_help, method_help, method_usage, ordered_arguments,
    requested_help, short_type_name,
};
pub use version::{version_api, AppInfo, VersionApi};
