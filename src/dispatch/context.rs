//! Run-scoped dispatch record

use super::call::Output;
use crate::args::CliArguments;
use crate::config::CliConfig;
use crate::error::DispatchError;
use crate::metadata::{ApiDescriptor, ApiSet, MethodDescriptor};
use std::sync::Arc;

/// Everything known about one dispatch run.
///
/// Created at the start of a run and dropped when it ends. Escalation
/// handlers receive it to decide what to display.
#[derive(Debug)]
pub struct CliApiContext {
    pub(crate) exported: ApiSet,
    pub(crate) raw: Vec<String>,
    pub(crate) arguments: Option<Arc<CliArguments>>,
    pub(crate) api: Option<Arc<ApiDescriptor>>,
    pub(crate) method: Option<Arc<MethodDescriptor>>,
    pub(crate) parameters: Vec<String>,
    pub(crate) error: Option<DispatchError>,
    pub(crate) output: Output,
    pub(crate) config: Arc<CliConfig>,
}

impl CliApiContext {
    /// Fresh context for `raw` against the exported set
    pub fn new(exported: ApiSet, raw: Vec<String>, output: Output, config: Arc<CliConfig>) -> Self {
        Self {
            exported,
            raw,
            arguments: None,
            api: None,
            method: None,
            parameters: Vec::new(),
            error: None,
            output,
            config,
        }
    }

    /// The exported API set
    pub fn exported(&self) -> &ApiSet {
        &self.exported
    }

    /// Raw tokens of the chunk
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Tokenized chunk, unless tokenizing failed
    pub fn arguments(&self) -> Option<&CliArguments> {
        self.arguments.as_deref()
    }

    /// Selected API
    pub fn api(&self) -> Option<&Arc<ApiDescriptor>> {
        self.api.as_ref()
    }

    /// Selected method
    pub fn method(&self) -> Option<&Arc<MethodDescriptor>> {
        self.method.as_ref()
    }

    /// Names of the parameters handed to the command
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Whether parameters were bound and the command was about to run
    pub fn has_parameters(&self) -> bool {
        self.method.is_some() && !self.parameters.is_empty()
    }

    /// Captured failure, resolution misses included
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Captured failure that counts as an exception
    pub fn exception(&self) -> Option<&DispatchError> {
        self.error.as_ref().filter(|e| e.is_exception())
    }

    /// Output channel of the run
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Active configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_filters_resolution_miss() {
        let mut context = CliApiContext::new(
            crate::dispatch::call::tests::apis(),
            vec!["nope".into()],
            Output::buffer().0,
            Arc::new(CliConfig::default()),
        );
        assert!(context.error().is_none());

        context.error = Some(DispatchError::resolution("Unknown API \"nope\""));
        assert!(context.error().is_some());
        assert!(context.exception().is_none());

        context.error = Some(DispatchError::Invocation(anyhow::anyhow!("boom")));
        assert!(context.exception().is_some());
        assert!(!context.has_parameters());
    }
}
