//! Argument holders: types whose slots are flattened into the context that
//! embeds them.

use super::slot::{ArgumentDescriptor, ArgumentHost, Shape, Slot};
use super::value::{AnyValue, ValueType};
use crate::error::{CliError, CliResult};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Failed validation of a bound argument holder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Slot the failure is tied to; the holder slot when `None`
    pub member: Option<String>,
    /// What went wrong
    pub message: String,
}

impl ValidationError {
    /// Failure of the holder as a whole
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            member: None,
            message: message.into(),
        }
    }

    /// Failure tied to one of the holder's slots
    pub fn for_member(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            message: message.into(),
        }
    }
}

/// A type whose declared slots are bound as if they were declared by the
/// embedding API or method.
///
/// # Example
///
/// ```
/// use cliapi::arg;
/// use cliapi::metadata::{ArgumentHolder, PropertySet, ValidationError};
///
/// #[derive(Default)]
/// struct EchoArguments {
///     message: String,
/// }
///
/// impl ArgumentHolder for EchoArguments {
///     fn describe(properties: &mut PropertySet<Self>) {
///         properties.add(arg::text("message"), |a, v| a.message = v);
///     }
///
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.message.is_empty() {
///             return Err(ValidationError::for_member("message", "Message must not be empty"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ArgumentHolder: Default + Send + Sync + 'static {
    /// Declare the holder's slots
    fn describe(properties: &mut PropertySet<Self>);

    /// Validation hook, run after every slot was bound
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

pub(crate) type SetterFn = Arc<dyn Fn(&mut dyn Any, AnyValue) -> bool + Send + Sync>;

/// A property slot together with its setter
#[derive(Clone)]
pub struct PropertySlot {
    pub(crate) descriptor: ArgumentDescriptor,
    pub(crate) setter: SetterFn,
}

impl PropertySlot {
    /// The slot's descriptor
    pub fn descriptor(&self) -> &ArgumentDescriptor {
        &self.descriptor
    }

    /// Assign a bound value. `false` when target or value don't match the
    /// declared types.
    pub(crate) fn assign(&self, target: &mut dyn Any, value: AnyValue) -> bool {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.descriptor.fmt(f)
    }
}

/// Property slots of an owner type `O`, in declaration order
pub struct PropertySet<O> {
    slots: Vec<PropertySlot>,
    _owner: PhantomData<fn(&mut O)>,
}

impl<O: Any> PropertySet<O> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Declare a property bound through `setter`
    pub fn add<T, F>(&mut self, slot: Slot<T>, setter: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut O, T) + Send + Sync + 'static,
    {
        let mut descriptor = slot.into_descriptor();
        descriptor.host = ArgumentHost::Property;
        let setter: SetterFn = Arc::new(move |target: &mut dyn Any, value: AnyValue| {
            match (target.downcast_mut::<O>(), value.downcast::<T>()) {
                (Some(target), Ok(value)) => {
                    setter(target, *value);
                    true
                }
                _ => false,
            }
        });
        self.slots.push(PropertySlot { descriptor, setter });
        self
    }

    /// Declared slots
    pub fn slots(&self) -> &[PropertySlot] {
        &self.slots
    }

    pub(crate) fn into_slots(self) -> Vec<PropertySlot> {
        self.slots
    }
}

impl<O: Any> Default for PropertySet<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Slots and hooks of one argument holder type
pub struct HolderDescriptor {
    value_type: ValueType,
    construct: fn() -> AnyValue,
    validate: fn(&dyn Any) -> Result<(), ValidationError>,
    properties: Vec<PropertySlot>,
}

impl HolderDescriptor {
    /// Holder type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Declared slots
    pub fn properties(&self) -> &[PropertySlot] {
        &self.properties
    }

    pub(crate) fn construct(&self) -> AnyValue {
        (self.construct)()
    }

    pub(crate) fn validate(&self, value: &dyn Any) -> Result<(), ValidationError> {
        (self.validate)(value)
    }
}

impl fmt::Debug for HolderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolderDescriptor")
            .field("value_type", &self.value_type)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

fn construct_holder<H: ArgumentHolder>() -> AnyValue {
    Box::new(H::default())
}

fn validate_holder<H: ArgumentHolder>(value: &dyn Any) -> Result<(), ValidationError> {
    match value.downcast_ref::<H>() {
        Some(holder) => holder.validate(),
        None => Ok(()),
    }
}

fn describe_holder<H: ArgumentHolder>() -> HolderDescriptor {
    let mut properties = PropertySet::<H>::new();
    H::describe(&mut properties);
    HolderDescriptor {
        value_type: ValueType::of::<H>(),
        construct: construct_holder::<H>,
        validate: validate_holder::<H>,
        properties: properties.into_slots(),
    }
}

/// Lazy reference to a holder's descriptor. Expanded once when the
/// exported API set is built.
#[derive(Clone)]
pub(crate) struct HolderRef {
    value_type: ValueType,
    describe: fn() -> HolderDescriptor,
    expanded: Option<Arc<HolderDescriptor>>,
}

impl HolderRef {
    pub(crate) fn of<H: ArgumentHolder>() -> Self {
        Self {
            value_type: ValueType::of::<H>(),
            describe: describe_holder::<H>,
            expanded: None,
        }
    }

    pub(crate) fn expanded(&self) -> Option<&Arc<HolderDescriptor>> {
        self.expanded.as_ref()
    }
}

/// Expand every argument holder below `descriptor`.
///
/// `path` holds the holder types currently being expanded. Meeting one of
/// them again means the holder contains itself.
pub(crate) fn expand(descriptor: &mut ArgumentDescriptor, path: &mut Vec<TypeId>) -> CliResult<()> {
    let Shape::Holder(holder) = &mut descriptor.shape else {
        return Ok(());
    };
    if holder.expanded.is_some() {
        return Ok(());
    }
    let id = holder.value_type.id();
    if path.contains(&id) {
        return Err(CliError::configuration(format!(
            "Argument holder {} contains itself (argument \"{}\")",
            holder.value_type, descriptor.name
        )));
    }

    path.push(id);
    let mut expanded = (holder.describe)();
    for property in &mut expanded.properties {
        expand(&mut property.descriptor, path)?;
    }
    path.pop();

    holder.expanded = Some(Arc::new(expanded));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg;

    #[derive(Default)]
    struct Inner {
        name: String,
    }

    impl ArgumentHolder for Inner {
        fn describe(properties: &mut PropertySet<Self>) {
            properties.add(arg::text("name"), |h, v| h.name = v);
        }
    }

    #[derive(Default)]
    struct Outer {
        inner: Inner,
        verbose: bool,
    }

    impl ArgumentHolder for Outer {
        fn describe(properties: &mut PropertySet<Self>) {
            properties
                .add(arg::holder::<Inner>("inner"), |h, v| h.inner = v)
                .add(arg::flag("verbose"), |h, v| h.verbose = v);
        }
    }

    #[derive(Default)]
    struct Looping {
        next: Option<Box<Looping>>,
    }

    impl ArgumentHolder for Looping {
        fn describe(properties: &mut PropertySet<Self>) {
            properties.add(arg::holder::<Looping>("next"), |h, v| h.next = Some(Box::new(v)));
        }
    }

    #[test]
    fn test_expand_nested() {
        let mut descriptor = arg::holder::<Outer>("args").into_descriptor();
        expand(&mut descriptor, &mut Vec::new()).unwrap();

        let names: Vec<&str> = descriptor.flatten().into_iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["name", "verbose"]);
        assert_eq!(descriptor.object_properties().unwrap().len(), 2);
        assert_eq!(descriptor.flatten()[0].host(), ArgumentHost::Property);
    }

    #[test]
    fn test_expand_detects_cycles() {
        let mut descriptor = arg::holder::<Looping>("loop").into_descriptor();
        let error = expand(&mut descriptor, &mut Vec::new()).unwrap_err();
        assert!(error.to_string().contains("contains itself"));
    }

    #[test]
    fn test_setter_checks_types() {
        let mut set = PropertySet::<Inner>::new();
        set.add(arg::text("name"), |h, v| h.name = v);
        let slot = &set.slots()[0];

        let mut inner = Inner::default();
        assert!(slot.assign(&mut inner, Box::new("x".to_string())));
        assert_eq!(inner.name, "x");
        assert!(!slot.assign(&mut inner, Box::new(1u8)));
        assert!(!slot.assign(&mut 0u8, Box::new("y".to_string())));
    }
}
