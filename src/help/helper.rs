//! The default last-resort helper

use super::render;
use crate::dispatch::{CliApiContext, Helper};
use tracing::warn;

/// Writes the context help to the run's output and returns exit code `1`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHelper;

impl Helper for DefaultHelper {
    fn display_help(&self, context: &CliApiContext) -> i32 {
        if let Err(error) = context.output().write_str(&render::context_help(context)) {
            warn!(error = %error, "Failed to write help output");
        }
        1
    }
}
