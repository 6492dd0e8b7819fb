//! API descriptors: one command group each

use super::holder::{PropertySet, PropertySlot};
use super::method::MethodDescriptor;
use super::slot::{ArgumentDescriptor, Slot};
use super::value::{AsAny, ValueType};
use crate::args::same_key;
use crate::dispatch::{ApiErrorHandler, HelpProvider};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An API type. Instances are constructed per dispatch run.
///
/// `dispose` runs exactly once for every constructed instance, after the
/// command (or the escalation chain) finished.
#[async_trait]
pub trait CliApi: AsAny + Send + Sync {
    /// Release resources held by the instance
    async fn dispose(&mut self) {}
}

type ErrorHandlerAccess = fn(&mut dyn CliApi) -> Option<&mut dyn ApiErrorHandler>;
type HelpProviderAccess = fn(&mut dyn CliApi) -> Option<&mut dyn HelpProvider>;

fn construct_api<A: CliApi + Default>() -> Box<dyn CliApi> {
    Box::new(A::default())
}

fn error_handler_of<A: CliApi + ApiErrorHandler>(api: &mut dyn CliApi) -> Option<&mut dyn ApiErrorHandler> {
    api.as_any_mut()
        .downcast_mut::<A>()
        .map(|api| api as &mut dyn ApiErrorHandler)
}

fn help_provider_of<A: CliApi + HelpProvider>(api: &mut dyn CliApi) -> Option<&mut dyn HelpProvider> {
    api.as_any_mut()
        .downcast_mut::<A>()
        .map(|api| api as &mut dyn HelpProvider)
}

/// One command group
#[derive(Clone)]
pub struct ApiDescriptor {
    name: String,
    value_type: ValueType,
    is_default: bool,
    is_help_api: bool,
    title: Option<String>,
    description: Option<String>,
    construct: fn() -> Box<dyn CliApi>,
    pub(crate) properties: Vec<PropertySlot>,
    pub(crate) methods: Vec<Arc<MethodDescriptor>>,
    error_handler: Option<ErrorHandlerAccess>,
    help_provider: Option<HelpProviderAccess>,
}

impl ApiDescriptor {
    /// Start declaring the API type `A`
    pub fn builder<A: CliApi + Default>(name: impl Into<String>) -> ApiBuilder<A> {
        ApiBuilder {
            descriptor: Self {
                name: name.into(),
                value_type: ValueType::of::<A>(),
                is_default: false,
                is_help_api: false,
                title: None,
                description: None,
                construct: construct_api::<A>,
                properties: Vec::new(),
                methods: Vec::new(),
                error_handler: None,
                help_provider: None,
            },
            _api: PhantomData,
        }
    }

    /// API name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// API type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Bare type name, the fallback match key
    pub fn type_name(&self) -> &'static str {
        self.value_type.short_family()
    }

    /// Case-insensitive match against the name, then the bare type name
    pub fn matches(&self, name: &str) -> bool {
        same_key(&self.name, name) || same_key(self.type_name(), name)
    }

    /// Whether the API is flagged default
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Whether this is the designated help API
    pub fn is_help_api(&self) -> bool {
        self.is_help_api
    }

    /// Whether instances handle their own errors
    pub fn is_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }

    /// Whether instances display their own help
    pub fn is_help_provider(&self) -> bool {
        self.help_provider.is_some()
    }

    /// Short title for help
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Longer description for help
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// API-level property slots
    pub fn properties(&self) -> &[PropertySlot] {
        &self.properties
    }

    /// Commands in declaration order
    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    /// Find a command by name, ignoring case
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.iter().find(|m| m.matches(name))
    }

    /// The default-flagged command, else the first one
    pub fn default_method(&self) -> Option<&Arc<MethodDescriptor>> {
        self.methods
            .iter()
            .find(|m| m.is_default())
            .or_else(|| self.methods.first())
    }

    /// API-level slots with argument holders flattened
    pub fn flatten(&self) -> Vec<&ArgumentDescriptor> {
        self.properties.iter().flat_map(|p| p.descriptor().flatten()).collect()
    }

    /// Create a fresh instance
    pub fn construct(&self) -> Box<dyn CliApi> {
        (self.construct)()
    }

    /// The instance's error-handling capability
    pub fn error_handler_of<'a>(&self, api: &'a mut dyn CliApi) -> Option<&'a mut dyn ApiErrorHandler> {
        self.error_handler.and_then(|access| access(api))
    }

    /// The instance's help-providing capability
    pub fn help_provider_of<'a>(&self, api: &'a mut dyn CliApi) -> Option<&'a mut dyn HelpProvider> {
        self.help_provider.and_then(|access| access(api))
    }
}

impl fmt::Debug for ApiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("is_default", &self.is_default)
            .field("is_help_api", &self.is_help_api)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Typed builder for [`ApiDescriptor`]
///
/// # Example
///
/// ```
/// use cliapi::prelude::*;
///
/// #[derive(Default)]
/// struct DemoApi {
///     verbose: bool,
/// }
///
/// impl CliApi for DemoApi {}
///
/// let api = ApiDescriptor::builder::<DemoApi>("demo")
///     .title("Demo API")
///     .property(arg::flag("verbose"), |api, v| api.verbose = v)
///     .method(
///         MethodDescriptor::new("echo")
///             .arg(arg::text("message"))
///             .run(|mut call: Call| {
///                 let message: String = call.take("message")?;
///                 call.output().write_line(&message)?;
///                 Ok(123)
///             }),
///     )
///     .build();
///
/// assert_eq!(api.name(), "demo");
/// assert!(api.method("ECHO").is_some());
/// ```
pub struct ApiBuilder<A> {
    descriptor: ApiDescriptor,
    _api: PhantomData<fn() -> A>,
}

impl<A: CliApi + Default> ApiBuilder<A> {
    /// Short title for help
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.descriptor.title = Some(title.into());
        self
    }

    /// Longer description for help
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = Some(description.into());
        self
    }

    /// Used when the input names no API
    pub fn default_api(mut self) -> Self {
        self.descriptor.is_default = true;
        self
    }

    /// Mark as the help API consulted by the escalation chain
    pub fn designated_help(mut self) -> Self {
        self.descriptor.is_help_api = true;
        self
    }

    /// Declare an API-level property
    pub fn property<T, F>(mut self, slot: Slot<T>, setter: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut A, T) + Send + Sync + 'static,
    {
        let mut set = PropertySet::<A>::new();
        set.add(slot, setter);
        self.descriptor.properties.extend(set.into_slots());
        self
    }

    /// Add a command
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.descriptor.methods.push(Arc::new(method));
        self
    }

    /// Instances handle their own errors
    pub fn error_handler(mut self) -> Self
    where
        A: ApiErrorHandler,
    {
        self.descriptor.error_handler = Some(error_handler_of::<A>);
        self
    }

    /// Instances display their own help
    pub fn help_provider(mut self) -> Self
    where
        A: HelpProvider,
    {
        self.descriptor.help_provider = Some(help_provider_of::<A>);
        self
    }

    /// Finish the declaration
    pub fn build(self) -> ApiDescriptor {
        self.descriptor
    }
}

impl<A: CliApi + Default> From<ApiBuilder<A>> for ApiDescriptor {
    fn from(builder: ApiBuilder<A>) -> Self {
        builder.build()
    }
}
