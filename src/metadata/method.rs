//! Method descriptors and the handler adapters fixed at registration

use super::api::CliApi;
use super::slot::{ArgumentDescriptor, ArgumentHost, DefaultFn, Slot};
use super::value::{AnyValue, IntoOutcome, Outcome, ValueType};
use crate::args::same_key;
use crate::dispatch::Call;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a command handler
pub type CommandFuture<'a> = BoxFuture<'a, anyhow::Result<Outcome>>;

type StaticFn = dyn Fn(Call) -> CommandFuture<'static> + Send + Sync;
type InstanceFn = dyn for<'a> Fn(&'a mut dyn CliApi, Call) -> CommandFuture<'a> + Send + Sync;

#[derive(Clone)]
pub(crate) enum Handler {
    Static(Arc<StaticFn>),
    Instance { owner: ValueType, run: Arc<InstanceFn> },
}

impl Handler {
    pub(crate) fn invoke<'a>(&self, api: &'a mut dyn CliApi, call: Call) -> CommandFuture<'a> {
        match self {
            Self::Static(run) => run(call),
            Self::Instance { run, .. } => run(api, call),
        }
    }

    pub(crate) fn owner(&self) -> Option<ValueType> {
        match self {
            Self::Static(_) => None,
            Self::Instance { owner, .. } => Some(*owner),
        }
    }
}

fn static_handler<F>(f: F) -> Handler
where
    F: Fn(Call) -> CommandFuture<'static> + Send + Sync + 'static,
{
    Handler::Static(Arc::new(f))
}

fn instance_handler<F>(owner: ValueType, f: F) -> Handler
where
    F: for<'a> Fn(&'a mut dyn CliApi, Call) -> CommandFuture<'a> + Send + Sync + 'static,
{
    Handler::Instance {
        owner,
        run: Arc::new(f),
    }
}

fn downcast_api<A: CliApi>(api: &mut dyn CliApi) -> anyhow::Result<&mut A> {
    api.as_any_mut()
        .downcast_mut::<A>()
        .ok_or_else(|| anyhow::anyhow!("API instance is not a {}", std::any::type_name::<A>()))
}

/// Declared stdin/stdout/stderr usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUsage {
    /// What the stream carries
    pub description: String,
    /// Whether the command needs the stream
    pub required: bool,
}

/// A method parameter that isn't bound from the command line
#[derive(Clone)]
pub struct PlainParameter {
    name: String,
    value_type: ValueType,
    default: DefaultFn,
}

impl PlainParameter {
    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub(crate) fn default_value(&self) -> AnyValue {
        (self.default)()
    }
}

/// One method parameter
#[derive(Clone)]
pub enum Parameter {
    /// Bound from the command line
    Argument(ArgumentDescriptor),
    /// Filled with its default, or injected under the auto-invocation convention
    Plain(PlainParameter),
}

impl Parameter {
    /// Parameter name
    pub fn name(&self) -> &str {
        match self {
            Self::Argument(descriptor) => descriptor.name(),
            Self::Plain(plain) => plain.name(),
        }
    }
}

/// One invocable command of an API
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    is_default: bool,
    title: Option<String>,
    description: Option<String>,
    pub(crate) parameters: Vec<Parameter>,
    exit_codes: BTreeMap<i32, String>,
    stdin: Option<StreamUsage>,
    stdout: Option<StreamUsage>,
    stderr: Option<StreamUsage>,
    pub(crate) handler: Option<Handler>,
}

impl MethodDescriptor {
    /// Create a method without parameters or handler
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: false,
            title: None,
            description: None,
            parameters: Vec::new(),
            exit_codes: BTreeMap::new(),
            stdin: None,
            stdout: None,
            stderr: None,
            handler: None,
        }
    }

    /// Used when the input names no method
    pub fn default_method(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Short title for help
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Longer description for help
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a parameter bound from the command line
    pub fn arg<T: Any + Send + Sync>(mut self, slot: Slot<T>) -> Self {
        let mut descriptor = slot.into_descriptor();
        descriptor.host = ArgumentHost::Parameter;
        self.parameters.push(Parameter::Argument(descriptor));
        self
    }

    /// Add a parameter that always receives `value`
    pub fn plain<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Clone + Any + Send + Sync,
    {
        self.parameters.push(Parameter::Plain(PlainParameter {
            name: name.into(),
            value_type: ValueType::of::<T>(),
            default: Arc::new(move || Box::new(value.clone()) as AnyValue),
        }));
        self
    }

    /// Add a parameter that receives `T::default()`
    pub fn plain_default<T>(mut self, name: impl Into<String>) -> Self
    where
        T: Default + Any + Send + Sync,
    {
        self.parameters.push(Parameter::Plain(PlainParameter {
            name: name.into(),
            value_type: ValueType::of::<T>(),
            default: Arc::new(|| Box::new(T::default()) as AnyValue),
        }));
        self
    }

    /// Document an exit code
    pub fn exit_code(mut self, code: i32, description: impl Into<String>) -> Self {
        self.exit_codes.insert(code, description.into());
        self
    }

    /// Declare stdin usage
    pub fn stdin(mut self, description: impl Into<String>, required: bool) -> Self {
        self.stdin = Some(StreamUsage {
            description: description.into(),
            required,
        });
        self
    }

    /// Declare stdout usage
    pub fn stdout(mut self, description: impl Into<String>) -> Self {
        self.stdout = Some(StreamUsage {
            description: description.into(),
            required: false,
        });
        self
    }

    /// Declare stderr usage
    pub fn stderr(mut self, description: impl Into<String>) -> Self {
        self.stderr = Some(StreamUsage {
            description: description.into(),
            required: false,
        });
        self
    }

    /// Synchronous command without access to the API instance
    pub fn run<F, R>(mut self, f: F) -> Self
    where
        F: Fn(Call) -> anyhow::Result<R> + Send + Sync + 'static,
        R: IntoOutcome + 'static,
    {
        let f = Arc::new(f);
        self.handler = Some(static_handler(move |call| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(call).map(IntoOutcome::into_outcome) })
        }));
        self
    }

    /// Asynchronous command without access to the API instance
    pub fn run_async<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoOutcome + 'static,
    {
        self.handler = Some(static_handler(move |call| {
            let future = f(call);
            Box::pin(async move { future.await.map(IntoOutcome::into_outcome) })
        }));
        self
    }

    /// Synchronous command on the API instance `A`
    pub fn run_on<A, F, R>(mut self, f: F) -> Self
    where
        A: CliApi,
        F: Fn(&mut A, Call) -> anyhow::Result<R> + Send + Sync + 'static,
        R: IntoOutcome + 'static,
    {
        let f = Arc::new(f);
        self.handler = Some(instance_handler(ValueType::of::<A>(), move |api, call| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(downcast_api::<A>(api)?, call).map(IntoOutcome::into_outcome) })
        }));
        self
    }

    /// Asynchronous command on the API instance `A`
    pub fn run_on_async<A, R>(
        mut self,
        f: for<'a> fn(&'a mut A, Call) -> BoxFuture<'a, anyhow::Result<R>>,
    ) -> Self
    where
        A: CliApi,
        R: IntoOutcome + 'static,
    {
        self.handler = Some(instance_handler(ValueType::of::<A>(), move |api, call| {
            Box::pin(async move {
                let api = downcast_api::<A>(api)?;
                f(api, call).await.map(IntoOutcome::into_outcome)
            })
        }));
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name match
    pub fn matches(&self, name: &str) -> bool {
        same_key(&self.name, name)
    }

    /// Whether the method is flagged default
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Declared title
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Declared description
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared parameters in order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameters bound from the command line
    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.parameters.iter().filter_map(|p| match p {
            Parameter::Argument(descriptor) => Some(descriptor),
            Parameter::Plain(_) => None,
        })
    }

    /// Every bindable slot, with argument holders flattened
    pub fn flatten(&self) -> Vec<&ArgumentDescriptor> {
        self.arguments().flat_map(|d| d.flatten()).collect()
    }

    /// Find a bindable slot by name, looking into argument holders
    pub fn argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.flatten().into_iter().find(|d| same_key(d.name(), name))
    }

    /// Documented exit codes
    pub fn exit_codes(&self) -> &BTreeMap<i32, String> {
        &self.exit_codes
    }

    /// Declared stdin usage
    pub fn stdin_usage(&self) -> Option<&StreamUsage> {
        self.stdin.as_ref()
    }

    /// Declared stdout usage
    pub fn stdout_usage(&self) -> Option<&StreamUsage> {
        self.stdout.as_ref()
    }

    /// Declared stderr usage
    pub fn stderr_usage(&self) -> Option<&StreamUsage> {
        self.stderr.as_ref()
    }

    /// Whether a handler was attached
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("is_default", &self.is_default)
            .field("parameters", &self.parameters.iter().map(Parameter::name).collect::<Vec<_>>())
            .field("exit_codes", &self.exit_codes)
            .finish_non_exhaustive()
    }
}
