//! Custom argument parsers and their registry

use crate::metadata::{AnyValue, ValueType};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type ParseFn = dyn Fn(&str, &ValueType, &str) -> Result<AnyValue, String> + Send + Sync;

/// Parses one raw token into a value.
///
/// The function receives the argument name, the requested value type and
/// the raw token. An `Err` becomes an argument error naming the argument.
#[derive(Clone)]
pub struct ArgumentParser {
    produces: Option<ValueType>,
    parse: Arc<ParseFn>,
}

impl ArgumentParser {
    /// Create a parser producing `T`
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str, &ValueType, &str) -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            produces: Some(ValueType::of::<T>()),
            parse: Arc::new(move |name, value_type, raw| {
                f(name, value_type, raw).map(|value| Box::new(value) as AnyValue)
            }),
        }
    }

    /// Create a parser whose output type depends on the requested type.
    /// Used for generic families where one parser serves many instances.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, &ValueType, &str) -> Result<AnyValue, String> + Send + Sync + 'static,
    {
        Self {
            produces: None,
            parse: Arc::new(f),
        }
    }

    /// The value type this parser produces, if fixed
    pub fn produces(&self) -> Option<ValueType> {
        self.produces
    }

    /// Parse one token
    pub fn parse(&self, name: &str, value_type: &ValueType, raw: &str) -> Result<AnyValue, String> {
        (self.parse)(name, value_type, raw)
    }
}

impl fmt::Debug for ArgumentParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentParser")
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

/// Parsers keyed by the value type they serve.
///
/// Lookup tries the exact type first, then the generic family path
/// (`std::collections::hash::set::HashSet`), then the bare family name
/// (`HashSet`).
///
/// # Example
///
/// ```
/// use cliapi::binder::ParserRegistry;
/// use cliapi::metadata::ValueType;
///
/// let mut parsers = ParserRegistry::new();
/// parsers.register::<f32, _>(|_, _, raw| raw.parse().map_err(|e| format!("{e}")));
///
/// assert!(parsers.find(&ValueType::of::<f32>()).is_some());
/// assert!(parsers.find(&ValueType::of::<f64>()).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    exact: HashMap<TypeId, ArgumentParser>,
    families: HashMap<String, ArgumentParser>,
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser for `T`, replacing any previous one
    pub fn register<T, F>(&mut self, f: F) -> Option<ArgumentParser>
    where
        T: Any + Send + Sync,
        F: Fn(&str, &ValueType, &str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.exact.insert(TypeId::of::<T>(), ArgumentParser::new(f))
    }

    /// Register a parser for every instance of a generic type family
    pub fn register_family<F>(&mut self, family: impl Into<String>, f: F) -> Option<ArgumentParser>
    where
        F: Fn(&str, &ValueType, &str) -> Result<AnyValue, String> + Send + Sync + 'static,
    {
        self.families.insert(family.into(), ArgumentParser::dynamic(f))
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<T, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str, &ValueType, &str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.register::<T, F>(f);
        self
    }

    /// Find the parser serving a value type
    pub fn find(&self, value_type: &ValueType) -> Option<&ArgumentParser> {
        self.exact
            .get(&value_type.id())
            .or_else(|| self.families.get(value_type.family()))
            .or_else(|| self.families.get(value_type.short_family()))
    }

    /// Whether a parser serves this value type
    pub fn contains(&self, value_type: &ValueType) -> bool {
        self.find(value_type).is_some()
    }

    /// Number of registered parsers
    pub fn len(&self) -> usize {
        self.exact.len() + self.families.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_exact_lookup() {
        let parsers = ParserRegistry::new()
            .with::<f32, _>(|_, _, raw| raw.parse::<f32>().map_err(|e| e.to_string()));
        let vt = ValueType::of::<f32>();
        let parser = parsers.find(&vt).unwrap();
        assert_eq!(parser.produces(), Some(vt));

        let value = parser.parse("number", &vt, "0.5").unwrap();
        assert_eq!(*value.downcast::<f32>().unwrap(), 0.5);
        assert!(parser.parse("number", &vt, "x").is_err());
    }

    #[test]
    fn test_family_lookup() {
        let mut parsers = ParserRegistry::new();
        parsers.register_family("BTreeSet", |_, value_type, raw| {
            if value_type.is::<BTreeSet<String>>() {
                Ok(Box::new(raw.split(',').map(str::to_string).collect::<BTreeSet<_>>()))
            } else {
                Err(format!("unsupported {value_type}"))
            }
        });

        let vt = ValueType::of::<BTreeSet<String>>();
        let parser = parsers.find(&vt).unwrap();
        assert!(parser.produces().is_none());
        let set = parser.parse("tags", &vt, "a,b,a").unwrap();
        assert_eq!(set.downcast::<BTreeSet<String>>().unwrap().len(), 2);

        assert!(parsers.contains(&ValueType::of::<BTreeSet<u8>>()));
        assert!(!parsers.contains(&ValueType::of::<Vec<u8>>()));
        assert_eq!(parsers.len(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let mut parsers = ParserRegistry::new();
        assert!(parsers.register::<u8, _>(|_, _, _| Ok(1)).is_none());
        assert!(parsers.register::<u8, _>(|_, _, _| Ok(2)).is_some());
        assert_eq!(parsers.len(), 1);
    }
}
