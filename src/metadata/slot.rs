//! Argument descriptors and typed slot constructors

use super::holder::{ArgumentHolder, HolderRef};
use super::value::{AnyValue, ValueType};
use crate::binder::ArgumentParser;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Argument shape as seen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Boolean key without value
    Flag,
    /// String or string list
    Value,
    /// Anything else: JSON, custom parsed or an argument holder
    Object,
}

/// Where a slot lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentHost {
    /// A property of an API or argument holder
    Property,
    /// A method parameter
    Parameter,
}

pub(crate) type JsonFn = fn(&str) -> Result<AnyValue, serde_json::Error>;
pub(crate) type CollectFn = fn(Vec<AnyValue>) -> Option<AnyValue>;
pub(crate) type CheckFn = Arc<dyn Fn(&dyn Any) -> Result<(), String> + Send + Sync>;
pub(crate) type DefaultFn = Arc<dyn Fn() -> AnyValue + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Shape {
    Flag,
    Text,
    Typed { json: Option<JsonFn> },
    Holder(HolderRef),
}

/// One bindable slot.
///
/// Built through the typed constructors in [`arg`](crate::arg), never
/// directly. For array slots `value_type` is the element type.
#[derive(Clone)]
pub struct ArgumentDescriptor {
    pub(crate) name: String,
    pub(crate) host: ArgumentHost,
    pub(crate) shape: Shape,
    pub(crate) value_type: ValueType,
    pub(crate) is_array: bool,
    pub(crate) collect: CollectFn,
    pub(crate) keyless: Option<usize>,
    pub(crate) required: bool,
    pub(crate) parse_json: bool,
    pub(crate) parser: Option<ArgumentParser>,
    pub(crate) default: Option<DefaultFn>,
    pub(crate) check: Option<CheckFn>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) example: Option<String>,
}

impl ArgumentDescriptor {
    fn new(name: &str, shape: Shape, value_type: ValueType, is_array: bool, collect: CollectFn) -> Self {
        let required = !is_array && !matches!(shape, Shape::Flag | Shape::Holder(_));
        Self {
            name: name.trim_start_matches('-').to_string(),
            host: ArgumentHost::Parameter,
            shape,
            value_type,
            is_array,
            collect,
            keyless: None,
            required,
            parse_json: false,
            parser: None,
            default: None,
            check: None,
            title: None,
            description: None,
            example: None,
        }
    }

    /// Argument name without dash prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as written on the command line, `-name` or `--name`
    pub fn argument_name(&self) -> String {
        match self.kind() {
            ArgumentKind::Flag => format!("-{}", self.name),
            _ => format!("--{}", self.name),
        }
    }

    /// Where the slot lives
    pub fn host(&self) -> ArgumentHost {
        self.host
    }

    /// Argument shape
    pub fn kind(&self) -> ArgumentKind {
        match self.shape {
            Shape::Flag => ArgumentKind::Flag,
            Shape::Text => ArgumentKind::Value,
            Shape::Typed { .. } | Shape::Holder(_) => ArgumentKind::Object,
        }
    }

    /// Value type, or element type for arrays
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether the slot takes a list of values
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Whether the slot is positional
    pub fn is_keyless(&self) -> bool {
        self.keyless.is_some()
    }

    /// Declared keyless offset
    pub fn keyless_offset(&self) -> Option<usize> {
        self.keyless
    }

    /// Whether binding fails when no value is found
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether JSON decoding is enabled and possible for this slot
    pub fn can_json_parse(&self) -> bool {
        self.parse_json && matches!(self.shape, Shape::Typed { json: Some(_) })
    }

    /// Whether the slot carries its own parser
    pub fn has_custom_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// Whether the slot type is an argument holder
    pub fn is_holder(&self) -> bool {
        matches!(self.shape, Shape::Holder(_))
    }

    /// Object typed slots decoded from tokens rather than flattened
    pub fn is_complex(&self) -> bool {
        matches!(self.shape, Shape::Typed { .. })
    }

    /// Nested slots of an argument holder, once the exported set was built
    pub fn object_properties(&self) -> Option<Vec<&ArgumentDescriptor>> {
        match &self.shape {
            Shape::Holder(holder) => holder
                .expanded()
                .map(|h| h.properties().iter().map(|p| p.descriptor()).collect()),
            _ => None,
        }
    }

    /// Short title for help
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Longer description for help
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Example value for usage lines
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    pub(crate) fn default_value(&self) -> Option<AnyValue> {
        self.default.as_ref().map(|f| f())
    }

    /// This slot and, for argument holders, every nested slot below it
    pub fn flatten(&self) -> Vec<&ArgumentDescriptor> {
        match self.object_properties() {
            Some(properties) => properties.into_iter().flat_map(|p| p.flatten()).collect(),
            None => vec![self],
        }
    }
}

impl fmt::Debug for ArgumentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDescriptor")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("kind", &self.kind())
            .field("value_type", &self.value_type)
            .field("is_array", &self.is_array)
            .field("keyless", &self.keyless)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// A typed slot declaration.
///
/// `T` is the type the bound value has: `bool`, `String`, `Vec<String>`,
/// a JSON or custom type, a `Vec` of those, or an argument holder.
pub struct Slot<T> {
    descriptor: ArgumentDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Slot<T> {
    fn from_descriptor(descriptor: ArgumentDescriptor) -> Self {
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    /// Bind positionally. Offsets order keyless slots in usage lines.
    pub fn keyless(mut self, offset: usize) -> Self {
        self.descriptor.keyless = Some(offset);
        self
    }

    /// No value is fine
    pub fn optional(mut self) -> Self {
        self.descriptor.required = false;
        self
    }

    /// A value must be given. For arrays at least one.
    pub fn required(mut self) -> Self {
        self.descriptor.required = true;
        self
    }

    /// Value used when nothing was found. Makes the slot optional.
    pub fn default_value(mut self, value: T) -> Self
    where
        T: Clone,
    {
        self.descriptor.required = false;
        self.descriptor.default = Some(Arc::new(move || Box::new(value.clone()) as AnyValue));
        self
    }

    /// Allow decoding the token(s) as JSON
    pub fn parse_json(mut self) -> Self {
        self.descriptor.parse_json = true;
        self
    }

    /// Slot-level parser. It wins over every registered parser.
    ///
    /// For list slots the parser produces one element per token.
    pub fn parser(mut self, parser: ArgumentParser) -> Self {
        self.descriptor.parser = Some(parser);
        self
    }

    /// Check the bound value. An `Err` becomes an argument error.
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.descriptor.check = Some(Arc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
            Some(value) => f(value),
            None => Err("Unexpected value type".to_string()),
        }));
        self
    }

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

    /// Example value shown in usage lines
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.descriptor.example = Some(example.into());
        self
    }

    /// The descriptor built so far
    pub fn descriptor(&self) -> &ArgumentDescriptor {
        &self.descriptor
    }

    /// Erase the value type
    pub fn into_descriptor(self) -> ArgumentDescriptor {
        self.descriptor
    }
}

fn collect_vec<T: Any + Send + Sync>(items: Vec<AnyValue>) -> Option<AnyValue> {
    let mut values: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        values.push(*item.downcast::<T>().ok()?);
    }
    Some(Box::new(values))
}

fn decode_json<T>(raw: &str) -> Result<AnyValue, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Ok(Box::new(serde_json::from_str::<T>(raw)?))
}

/// Boolean flag, `-name`
pub fn flag(name: &str) -> Slot<bool> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Flag,
        ValueType::of::<bool>(),
        false,
        collect_vec::<bool>,
    ))
}

/// Single string value
pub fn text(name: &str) -> Slot<String> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Text,
        ValueType::of::<String>(),
        false,
        collect_vec::<String>,
    ))
}

/// List of string values
pub fn text_list(name: &str) -> Slot<Vec<String>> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Text,
        ValueType::of::<String>(),
        true,
        collect_vec::<String>,
    ))
}

/// Value decoded as JSON (after [`Slot::parse_json`]) or by a custom parser
pub fn json<T>(name: &str) -> Slot<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Typed {
            json: Some(decode_json::<T>),
        },
        ValueType::of::<T>(),
        false,
        collect_vec::<T>,
    ))
}

/// List of JSON decoded values, one per token
pub fn json_list<T>(name: &str) -> Slot<Vec<T>>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Typed {
            json: Some(decode_json::<T>),
        },
        ValueType::of::<T>(),
        true,
        collect_vec::<T>,
    ))
}

/// Value produced by a custom parser only
pub fn custom<T: Any + Send + Sync>(name: &str) -> Slot<T> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Typed { json: None },
        ValueType::of::<T>(),
        false,
        collect_vec::<T>,
    ))
}

/// List of custom parsed values
pub fn custom_list<T: Any + Send + Sync>(name: &str) -> Slot<Vec<T>> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Typed { json: None },
        ValueType::of::<T>(),
        true,
        collect_vec::<T>,
    ))
}

/// Argument holder whose slots are flattened into the embedding context
pub fn holder<H: ArgumentHolder>(name: &str) -> Slot<H> {
    Slot::from_descriptor(ArgumentDescriptor::new(
        name,
        Shape::Holder(HolderRef::of::<H>()),
        ValueType::of::<H>(),
        false,
        collect_vec::<H>,
    ))
}
