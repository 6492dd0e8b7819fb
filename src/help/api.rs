//! The built-in help API

use super::render;
use crate::arg;
use crate::dispatch::{Call, CliApiContext, HelpProvider};
use crate::metadata::{ApiDescriptor, CliApi, MethodDescriptor};
use tracing::warn;

/// Renders help on request (`help --api demo --method echo`) and as the
/// designated help API of an exported set
#[derive(Debug, Default)]
pub struct HelpApi {
    api: Option<String>,
    method: Option<String>,
    details: bool,
}

impl CliApi for HelpApi {}

impl HelpProvider for HelpApi {
    fn display_help(&mut self, context: &CliApiContext) -> i32 {
        if let Err(error) = context.output().write_str(&render::context_help(context)) {
            warn!(error = %error, "Failed to write help output");
        }
        1
    }
}

impl HelpApi {
    fn help(&mut self, call: Call) -> anyhow::Result<i32> {
        let text = render::requested_help(
            call.apis(),
            call.config(),
            self.api.as_deref(),
            self.method.as_deref(),
            self.details,
        );
        call.output().write_str(&text)?;
        Ok(1)
    }
}

/// Declaration of [`HelpApi`], named `help`
pub fn help_api() -> ApiDescriptor {
    ApiDescriptor::builder::<HelpApi>("help")
        .title("CLI help API")
        .description("Provides generated usage instructions for the exported APIs")
        .designated_help()
        .help_provider()
        .property(
            arg::text("api")
                .optional()
                .title("Name of the API to display help for"),
            |help: &mut HelpApi, name| help.api = Some(name),
        )
        .property(
            arg::text("method")
                .optional()
                .title("Name of the API method to display help for"),
            |help: &mut HelpApi, name| help.method = Some(name),
        )
        .property(
            arg::flag("details").title("Print help details, if available"),
            |help: &mut HelpApi, details| help.details = details,
        )
        .method(
            MethodDescriptor::new("help")
                .default_method()
                .title("Display CLI API help")
                .description("Without arguments the available APIs are listed")
                .exit_code(1, "Help was displayed")
                .stdout("Help text")
                .run_on(HelpApi::help),
        )
        .build()
}
