//! Escalation: turning a failed or unidentifiable run into an exit code.
//!
//! The first capable strategy wins:
//!
//! 1. the resolved API instance, when it handles errors and an exception
//!    was captured
//! 2. the resolved API instance, when it provides help
//! 3. the designated help API of the exported set
//! 4. the app's [`Helper`]

use super::app::CliApp;
use super::context::CliApiContext;
use crate::metadata::CliApi;
use async_trait::async_trait;
use tracing::{debug, warn};

/// API capability: handle captured exceptions
#[async_trait]
pub trait ApiErrorHandler: Send + Sync {
    /// Handle `context.exception()` and return the exit code
    async fn handle_error(&mut self, context: &CliApiContext) -> i32;
}

/// API capability: display context help
pub trait HelpProvider: Send + Sync {
    /// Display help for the context and return the exit code
    fn display_help(&mut self, context: &CliApiContext) -> i32;
}

/// Last escalation resort, configured on the [`CliApp`]
pub trait Helper: Send + Sync {
    /// Display help for the context and return the exit code
    fn display_help(&self, context: &CliApiContext) -> i32;
}

impl CliApp {
    pub(crate) async fn escalate(&self, context: &CliApiContext, instance: Option<&mut dyn CliApi>) -> i32 {
        if let Some(error) = context.error() {
            if error.is_exception() {
                warn!(error = %error, "Escalating captured failure");
            } else {
                debug!(error = %error, "Escalating resolution miss");
            }
        }

        if let (Some(api), Some(instance)) = (context.api(), instance) {
            if context.exception().is_some() {
                if let Some(handler) = api.error_handler_of(&mut *instance) {
                    debug!(api = api.name(), "API handles the error");
                    return handler.handle_error(context).await;
                }
            }
            if let Some(provider) = api.help_provider_of(instance) {
                debug!(api = api.name(), "API provides help");
                return provider.display_help(context);
            }
        }

        if let Some(help) = self.apis().help_api() {
            let mut help_instance = help.construct();
            let code = help
                .help_provider_of(help_instance.as_mut())
                .map(|provider| provider.display_help(context));
            help_instance.dispose().await;
            if let Some(code) = code {
                debug!(api = help.name(), "Help API displayed help");
                return code;
            }
        }

        debug!("Using the default helper");
        self.helper().display_help(context)
    }
}
