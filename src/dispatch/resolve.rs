//! API and method selection

use crate::args::CliArguments;
use crate::binder::KeylessCursor;
use crate::error::DispatchError;
use crate::metadata::{ApiDescriptor, ApiSet, MethodDescriptor};
use std::sync::Arc;
use tracing::debug;

/// Select the API. Returns the keyless offset after the API name.
pub(crate) fn select_api(
    apis: &ApiSet,
    arguments: &CliArguments,
) -> Result<(Arc<ApiDescriptor>, usize), DispatchError> {
    if apis.len() == 1 {
        if let Some(api) = apis.first() {
            debug!(api = api.name(), "Only one API is exported");
            return Ok((Arc::clone(api), 0));
        }
    }

    if arguments.keyless().is_empty() {
        return match apis.default_api() {
            Some(api) => {
                debug!(api = api.name(), "Using the default API");
                Ok((Arc::clone(api), 0))
            }
            None => Err(DispatchError::resolution("No default API")),
        };
    }

    if !arguments.is_leading(0) {
        return Err(DispatchError::resolution("API name not given"));
    }
    let name = arguments.keyless_at(0).unwrap_or_default();
    match apis.get(name) {
        Some(api) => {
            debug!(api = api.name(), "Using named API");
            Ok((Arc::clone(api), 1))
        }
        None => Err(DispatchError::resolution(format!("Unknown API \"{name}\""))),
    }
}

/// Select the method. A matched method name token is consumed from the
/// cursor.
pub(crate) fn select_method(
    apis: &ApiSet,
    api: &ApiDescriptor,
    arguments: &CliArguments,
    cursor: &mut KeylessCursor,
) -> Result<Arc<MethodDescriptor>, DispatchError> {
    if apis.len() == 1 && api.methods().len() == 1 {
        if let Some(method) = api.methods().first() {
            debug!(method = method.name(), "Only one API method is exported");
            return Ok(Arc::clone(method));
        }
    }

    let position = cursor.position();
    let named = arguments
        .keyless_at(position)
        .filter(|_| arguments.is_leading(position))
        .and_then(|name| api.method(name));
    if let Some(method) = named {
        cursor.consume(1);
        debug!(method = method.name(), "Using named method");
        return Ok(Arc::clone(method));
    }

    match api.default_method() {
        Some(method) => {
            debug!(method = method.name(), "Using the default method");
            Ok(Arc::clone(method))
        }
        None => Err(DispatchError::resolution(format!(
            "API \"{}\" has no method to run",
            api.name()
        ))),
    }
}
