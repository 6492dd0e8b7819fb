//! Argument binding.
//!
//! The [`Binder`] walks a list of slots in declaration order and resolves
//! each one against the tokenized arguments of the current chunk. Argument
//! holders are constructed and bound recursively, sharing the same
//! [`KeylessCursor`] so sibling keyless slots never consume a token twice.
//!
//! Resolution per slot follows one fixed precedence: a slot-level parser,
//! then the registry parser for the exact value type, then the registry
//! parser for the generic family, then the built-in strategies (flag,
//! verbatim string, JSON). Lists apply the same order to every element.

mod coerce;
mod parsers;

pub use parsers::{ArgumentParser, ParserRegistry};

use crate::args::CliArguments;
use crate::metadata::{AnyValue, ArgumentDescriptor, ArgumentKind, PropertySlot, Shape};
use std::any::Any;
use thiserror::Error;
use tracing::{debug, trace};

/// A slot could not be bound from the given tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{argument}] {message}")]
pub struct ArgumentError {
    argument: String,
    message: String,
}

impl ArgumentError {
    /// Create an argument error
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Name of the offending argument
    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// What went wrong
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures while binding
#[derive(Debug, Error)]
pub enum BindError {
    /// Input mistake, recoverable through escalation
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Metadata authoring mistake
    #[error("{0}")]
    Configuration(String),
}

impl BindError {
    /// Create a configuration fault
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type for binding
pub type BindResult<T> = Result<T, BindError>;

/// Position of the next keyless token.
///
/// The next token is at `base + consumed`. `consumed` only grows during one
/// binding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeylessCursor {
    base: usize,
    consumed: usize,
}

impl KeylessCursor {
    /// Start at keyless index `base`
    pub fn new(base: usize) -> Self {
        Self { base, consumed: 0 }
    }

    /// Offset the current pass started at
    pub fn base(&self) -> usize {
        self.base
    }

    /// Tokens consumed in the current pass
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Keyless index of the next token
    pub fn position(&self) -> usize {
        self.base + self.consumed
    }

    /// Mark `count` tokens as consumed
    pub fn consume(&mut self, count: usize) {
        self.consumed += count;
    }

    /// Start a new pass after the tokens consumed so far
    pub fn rebase(&mut self) {
        self.base += self.consumed;
        self.consumed = 0;
    }
}

/// Binds slots from one chunk's arguments
#[derive(Clone, Copy)]
pub struct Binder<'a> {
    arguments: &'a CliArguments,
    parsers: &'a ParserRegistry,
}

impl<'a> Binder<'a> {
    /// Create a binder over tokenized arguments
    pub fn new(arguments: &'a CliArguments, parsers: &'a ParserRegistry) -> Self {
        Self { arguments, parsers }
    }

    /// The arguments being bound
    pub fn arguments(&self) -> &'a CliArguments {
        self.arguments
    }

    /// Bind every property slot and assign the values to `target`
    pub fn bind_properties(
        &self,
        target: &mut dyn Any,
        properties: &[PropertySlot],
        cursor: &mut KeylessCursor,
    ) -> BindResult<()> {
        for property in properties {
            let descriptor = property.descriptor();
            let Some(value) = self.bind_slot(descriptor, cursor)? else {
                trace!(argument = descriptor.name(), "Property left at its default");
                continue;
            };
            if !property.assign(target, value) {
                return Err(BindError::configuration(format!(
                    "Property \"{}\" can't be assigned a {} value",
                    descriptor.name(),
                    descriptor.value_type()
                )));
            }
        }
        Ok(())
    }

    /// Bind one slot. `None` means nothing was found for an optional slot
    /// without default.
    pub fn bind_slot(
        &self,
        descriptor: &ArgumentDescriptor,
        cursor: &mut KeylessCursor,
    ) -> BindResult<Option<AnyValue>> {
        if descriptor.is_holder() {
            return self.bind_holder(descriptor, cursor).map(Some);
        }

        let value = match self.resolve(descriptor, cursor)? {
            Some(value) => value,
            None => match self.missing(descriptor)? {
                Some(value) => value,
                None => return Ok(None),
            },
        };

        if let Some(check) = &descriptor.check {
            check(&*value).map_err(|message| {
                ArgumentError::new(
                    descriptor.name(),
                    format!("Parsed argument validation failed: {message}"),
                )
            })?;
        }
        Ok(Some(value))
    }

    fn missing(&self, descriptor: &ArgumentDescriptor) -> BindResult<Option<AnyValue>> {
        if let Some(value) = descriptor.default_value() {
            debug!(argument = descriptor.name(), "Using default value");
            return Ok(Some(value));
        }
        if descriptor.is_required() {
            let message = if descriptor.is_array() {
                "At least one value required"
            } else {
                "Missing required argument"
            };
            return Err(ArgumentError::new(descriptor.name(), message).into());
        }
        if descriptor.kind() == ArgumentKind::Flag {
            return Ok(Some(Box::new(false)));
        }
        if descriptor.is_array() {
            return self.collect(descriptor, Vec::new()).map(Some);
        }
        Ok(None)
    }

    fn bind_holder(&self, descriptor: &ArgumentDescriptor, cursor: &mut KeylessCursor) -> BindResult<AnyValue> {
        let Shape::Holder(holder) = &descriptor.shape else {
            return Err(BindError::configuration(format!(
                "Argument \"{}\" is not an argument holder",
                descriptor.name()
            )));
        };
        let Some(expanded) = holder.expanded() else {
            return Err(BindError::configuration(format!(
                "Argument holder \"{}\" ({}) was bound before the API set was built",
                descriptor.name(),
                descriptor.value_type()
            )));
        };

        debug!(
            argument = descriptor.name(),
            holder = %expanded.value_type(),
            keyless = cursor.position(),
            "Binding argument holder"
        );
        let mut value = expanded.construct();
        self.bind_properties(&mut *value, expanded.properties(), cursor)?;
        expanded.validate(&*value).map_err(|error| {
            let member = error.member.unwrap_or_else(|| descriptor.name().to_string());
            ArgumentError::new(member, error.message)
        })?;
        Ok(value)
    }
}
