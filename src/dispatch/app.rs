//! The dispatcher

use super::call::{Call, Output, Services};
use super::context::CliApiContext;
use super::escalation::Helper;
use crate::args::{CliArguments, DefaultTokenizer, Tokenizer};
use crate::binder::{BindError, Binder, KeylessCursor, ParserRegistry};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult, DispatchError};
use crate::help::DefaultHelper;
use crate::metadata::{AnyValue, ApiDescriptor, ApiSet, CliApi, Parameter, ValueType};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A configured CLI application.
///
/// Holds everything a dispatch run needs. Nothing is global: every call to
/// [`run`](Self::run) builds its own [`CliApiContext`].
///
/// # Example
///
/// ```
/// use cliapi::prelude::*;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Default)]
/// struct DemoApi;
///
/// impl CliApi for DemoApi {}
///
/// # tokio_test::block_on(async {
/// let apis = ApiSet::new(vec![ApiDescriptor::builder::<DemoApi>("demo")
///     .method(MethodDescriptor::new("exit").run(|_| Ok(-123)))
///     .build()])?;
/// let app = CliApp::new(apis);
///
/// let code = app.run(&["exit"], &CancellationToken::new()).await?;
/// assert_eq!(code, -123);
/// # Ok::<(), CliError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct CliApp {
    apis: ApiSet,
    parsers: Arc<ParserRegistry>,
    tokenizer: Arc<dyn Tokenizer>,
    helper: Arc<dyn Helper>,
    config: Arc<CliConfig>,
    output: Output,
    services: Services,
}

impl CliApp {
    /// Create an app for the exported set with default collaborators
    pub fn new(apis: ApiSet) -> Self {
        Self {
            apis,
            parsers: Arc::new(ParserRegistry::new()),
            tokenizer: Arc::new(DefaultTokenizer),
            helper: Arc::new(DefaultHelper),
            config: Arc::new(CliConfig::default()),
            output: Output::stdout(),
            services: Services::new(),
        }
    }

    /// Replace the parser registry
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Arc::new(parsers);
        self
    }

    /// Register a parser for `T`
    pub fn with_parser<T, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str, &ValueType, &str) -> Result<T, String> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.parsers).register::<T, F>(f);
        self
    }

    /// Replace the tokenizer
    pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Replace the last-resort helper
    pub fn with_helper<H: Helper + 'static>(mut self, helper: H) -> Self {
        self.helper = Arc::new(helper);
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CliConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Replace the output channel
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Register a service commands can look up by type
    pub fn with_service<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    /// The exported API set
    pub fn apis(&self) -> &ApiSet {
        &self.apis
    }

    /// The parser registry
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Active configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// The output channel
    pub fn output(&self) -> &Output {
        &self.output
    }

    pub(crate) fn helper(&self) -> &dyn Helper {
        self.helper.as_ref()
    }

    /// Dispatch one chunk of raw tokens and return its exit code.
    ///
    /// Input mistakes and command failures end in the escalation chain and
    /// come back as `Ok`. `Err` means cancellation or a metadata authoring
    /// mistake.
    pub async fn run<S: AsRef<str>>(&self, raw: &[S], cancellation: &CancellationToken) -> CliResult<i32> {
        let raw: Vec<String> = raw.iter().map(|s| s.as_ref().to_string()).collect();
        tokio::task::yield_now().await;
        if cancellation.is_cancelled() {
            return Err(CliError::Cancelled);
        }
        self.dispatch(raw, cancellation).await
    }

    /// Run the process arguments, chunked like [`run_multi`](Self::run_multi)
    pub async fn run_env(&self, cancellation: &CancellationToken) -> CliResult<i32> {
        let raw: Vec<String> = std::env::args().skip(1).collect();
        self.run_multi(&raw, cancellation).await
    }

    pub(crate) fn context(&self, raw: Vec<String>) -> CliApiContext {
        CliApiContext::new(self.apis.clone(), raw, self.output.clone(), Arc::clone(&self.config))
    }

    async fn dispatch(&self, raw: Vec<String>, cancellation: &CancellationToken) -> CliResult<i32> {
        let mut context = self.context(raw);

        let arguments = match self.tokenizer.tokenize(context.raw()) {
            Ok(arguments) => Arc::new(arguments),
            Err(error) => {
                warn!(error = %error, "Parsing CLI arguments failed");
                context.error = Some(error.into());
                return Ok(self.escalate(&context, None).await);
            }
        };
        context.arguments = Some(Arc::clone(&arguments));

        let (api, base) = match super::resolve::select_api(&self.apis, &arguments) {
            Ok(selected) => selected,
            Err(miss) => {
                context.error = Some(miss);
                return Ok(self.escalate(&context, None).await);
            }
        };
        context.api = Some(Arc::clone(&api));

        let mut instance = api.construct();
        let result = self
            .dispatch_on(&mut context, &api, instance.as_mut(), arguments, base, cancellation)
            .await;
        instance.dispose().await;
        debug!(api = api.name(), "Disposed API instance");
        result
    }

    async fn dispatch_on(
        &self,
        context: &mut CliApiContext,
        api: &ApiDescriptor,
        instance: &mut dyn CliApi,
        arguments: Arc<CliArguments>,
        base: usize,
        cancellation: &CancellationToken,
    ) -> CliResult<i32> {
        let binder = Binder::new(&arguments, &self.parsers);
        let mut cursor = KeylessCursor::new(base);

        if let Err(error) = binder.bind_properties(instance.as_any_mut(), api.properties(), &mut cursor) {
            return self.bind_failed(context, instance, error).await;
        }
        cursor.rebase();

        let method = match super::resolve::select_method(&self.apis, api, &arguments, &mut cursor) {
            Ok(method) => method,
            Err(miss) => {
                context.error = Some(miss);
                return Ok(self.escalate(context, Some(instance)).await);
            }
        };
        context.method = Some(Arc::clone(&method));

        let mut params: Vec<(String, Option<AnyValue>)> = Vec::new();
        for parameter in method.parameters() {
            match parameter {
                Parameter::Argument(descriptor) => match binder.bind_slot(descriptor, &mut cursor) {
                    Ok(value) => params.push((descriptor.name().to_string(), value)),
                    Err(error) => return self.bind_failed(context, instance, error).await,
                },
                Parameter::Plain(_) if self.config.invoke_auto => {}
                Parameter::Plain(plain) => params.push((plain.name().to_string(), Some(plain.default_value()))),
            }
        }
        context.parameters = params.iter().map(|(name, _)| name.clone()).collect();

        let Some(handler) = method.handler.as_ref() else {
            return Err(CliError::configuration(format!(
                "Method \"{}\" of API \"{}\" has no handler",
                method.name(),
                api.name()
            )));
        };
        let call = Call::new(
            params,
            cancellation.clone(),
            self.output.clone(),
            self.apis.clone(),
            self.services.clone(),
            Arc::clone(&self.config),
            Arc::clone(&arguments),
        );

        debug!(api = api.name(), method = method.name(), "Invoking API method");
        let result = AssertUnwindSafe(handler.invoke(&mut *instance, call))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(outcome)) => {
                let code = outcome.exit_code();
                debug!(code, "API method returned");
                Ok(code)
            }
            Ok(Err(error)) => {
                warn!(error = %error, "API method failed");
                context.error = Some(DispatchError::Invocation(error));
                Ok(self.escalate(context, Some(instance)).await)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(panic = %message, "API method panicked");
                context.error = Some(DispatchError::Invocation(anyhow::anyhow!("Panic: {message}")));
                Ok(self.escalate(context, Some(instance)).await)
            }
        }
    }

    async fn bind_failed(
        &self,
        context: &mut CliApiContext,
        instance: &mut dyn CliApi,
        error: BindError,
    ) -> CliResult<i32> {
        match error {
            BindError::Configuration(message) => Err(CliError::Configuration(message)),
            BindError::Argument(error) => {
                warn!(error = %error, "Argument mapping failed");
                context.error = Some(error.into());
                Ok(self.escalate(context, Some(instance)).await)
            }
        }
    }

    /// Dispatch dash-delimited chunks one after another.
    ///
    /// The first chunk with a non-zero exit code stops the run and its code
    /// is returned. Without any token the escalation chain displays help.
    pub async fn run_multi<S: AsRef<str>>(&self, raw: &[S], cancellation: &CancellationToken) -> CliResult<i32> {
        let raw: Vec<String> = raw.iter().map(|s| s.as_ref().to_string()).collect();
        tokio::task::yield_now().await;
        if cancellation.is_cancelled() {
            return Err(CliError::Cancelled);
        }

        if raw.is_empty() {
            debug!("No arguments given, displaying help");
            let mut context = self.context(raw);
            context.arguments = self.tokenizer.tokenize(&[]).ok().map(Arc::new);
            return Ok(self.escalate(&context, None).await);
        }

        for (index, chunk) in super::chain::split_chunks(&raw).into_iter().enumerate() {
            let code = self.run(&raw[chunk], cancellation).await?;
            if code != 0 {
                info!("Break in arguments chunk {} with exit code {code}", index + 1);
                return Ok(code);
            }
        }
        Ok(0)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for CliApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliApp")
            .field("apis", &self.apis.names())
            .field("parsers", &self.parsers.len())
            .field("config", &self.config)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
