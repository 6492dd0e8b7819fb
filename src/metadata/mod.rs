//! Metadata model: immutable descriptors for APIs, methods and argument
//! slots.
//!
//! Declarations are explicit registration calls. An API type registers its
//! properties, commands and capabilities through [`ApiDescriptor::builder`];
//! each command declares its parameters as typed [`Slot`]s and attaches one
//! handler adapter. [`ApiSet::new`] validates the declarations and expands
//! argument holders once, so nothing is inspected per call.

mod api;
mod holder;
mod method;
mod registry;
pub(crate) mod slot;
mod value;

pub use api::{ApiBuilder, ApiDescriptor, CliApi};
pub use holder::{ArgumentHolder, HolderDescriptor, PropertySet, PropertySlot, ValidationError};
pub use method::{CommandFuture, MethodDescriptor, Parameter, PlainParameter, StreamUsage};
#[cfg(feature = "discovery")]
pub use registry::ApiExport;
pub use registry::ApiSet;
pub use slot::{ArgumentDescriptor, ArgumentHost, ArgumentKind, Slot};
pub use value::{AnyValue, AsAny, IntoOutcome, Outcome, ValueType};

#[cfg(test)]
pub(crate) use holder::expand;
pub(crate) use slot::Shape;
