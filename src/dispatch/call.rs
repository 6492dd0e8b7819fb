//! What a command handler receives

use crate::args::{same_key, CliArguments};
use crate::config::CliConfig;
use crate::metadata::{AnyValue, ApiSet};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Taking a bound parameter failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The method declares no such parameter
    #[error("Unknown parameter \"{name}\"")]
    Unknown {
        /// Requested name
        name: String,
    },

    /// The parameter has no value, or was taken already
    #[error("Parameter \"{name}\" has no value")]
    NoValue {
        /// Requested name
        name: String,
    },

    /// The value has a different type
    #[error("Parameter \"{name}\" is not a {expected}")]
    Type {
        /// Requested name
        name: String,
        /// Requested type
        expected: &'static str,
    },
}

/// Shared, line oriented output channel
#[derive(Clone)]
pub struct Output {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    /// Write to `writer`
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Process stderr
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// In-memory output plus a handle to read it back
    pub fn buffer() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write text as is
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(text.as_bytes())?;
        sink.flush()
    }

    /// Write text followed by a newline
    pub fn write_line(&self, text: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(text.as_bytes())?;
        sink.write_all(b"\n")?;
        sink.flush()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

/// Read side of [`Output::buffer`]
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Drop everything written so far
    pub fn clear(&self) {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Values injected into commands by type
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing one of the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Look a service up by type
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no service is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("len", &self.entries.len()).finish()
    }
}

/// One command invocation: bound parameters in declaration order plus
/// the run's collaborators.
pub struct Call {
    params: Vec<(String, Option<AnyValue>)>,
    cancellation: CancellationToken,
    output: Output,
    apis: ApiSet,
    services: Services,
    config: Arc<CliConfig>,
    arguments: Arc<CliArguments>,
}

impl Call {
    pub(crate) fn new(
        params: Vec<(String, Option<AnyValue>)>,
        cancellation: CancellationToken,
        output: Output,
        apis: ApiSet,
        services: Services,
        config: Arc<CliConfig>,
        arguments: Arc<CliArguments>,
    ) -> Self {
        Self {
            params,
            cancellation,
            output,
            apis,
            services,
            config,
            arguments,
        }
    }

    fn slot(&mut self, name: &str) -> Result<&mut Option<AnyValue>, CallError> {
        self.params
            .iter_mut()
            .find(|(n, _)| same_key(n, name))
            .map(|(_, value)| value)
            .ok_or_else(|| CallError::Unknown { name: name.to_string() })
    }

    /// Move a parameter value out
    pub fn take<T: Any>(&mut self, name: &str) -> Result<T, CallError> {
        self.take_opt(name)?
            .ok_or_else(|| CallError::NoValue { name: name.to_string() })
    }

    /// Move a parameter value out. `None` when nothing was bound.
    pub fn take_opt<T: Any>(&mut self, name: &str) -> Result<Option<T>, CallError> {
        let slot = self.slot(name)?;
        let Some(value) = slot.take() else {
            return Ok(None);
        };
        match value.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(value) => {
                *slot = Some(value);
                Err(CallError::Type {
                    name: name.to_string(),
                    expected: std::any::type_name::<T>(),
                })
            }
        }
    }

    /// Borrow a parameter value
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.params
            .iter()
            .find(|(n, _)| same_key(n, name))
            .and_then(|(_, value)| value.as_ref())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Value of a flag parameter, `false` when absent
    pub fn flag(&self, name: &str) -> bool {
        self.get::<bool>(name).copied().unwrap_or(false)
    }

    /// Parameter names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// The caller's cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The output channel
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// The exported API set
    pub fn apis(&self) -> &ApiSet {
        &self.apis
    }

    /// An injected service
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Active configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// The tokenized chunk
    pub fn arguments(&self) -> &CliArguments {
        &self.arguments
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("params", &self.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
