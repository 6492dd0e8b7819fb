//! Coercion of raw tokens into slot values

use super::{ArgumentError, BindError, BindResult, Binder, KeylessCursor};
use crate::metadata::{AnyValue, ArgumentDescriptor, Shape};
use tracing::trace;

impl Binder<'_> {
    /// Resolve a non-holder slot. `None` means no token was found.
    pub(super) fn resolve(
        &self,
        descriptor: &ArgumentDescriptor,
        cursor: &mut KeylessCursor,
    ) -> BindResult<Option<AnyValue>> {
        if descriptor.is_keyless() {
            self.resolve_keyless(descriptor, cursor)
        } else {
            self.resolve_named(descriptor)
        }
    }

    fn resolve_keyless(
        &self,
        descriptor: &ArgumentDescriptor,
        cursor: &mut KeylessCursor,
    ) -> BindResult<Option<AnyValue>> {
        if matches!(descriptor.shape, Shape::Flag) {
            return Err(BindError::configuration(format!(
                "Flag \"{}\" can't be keyless",
                descriptor.name()
            )));
        }

        let position = cursor.position();
        let remaining = self.arguments.keyless().get(position..).unwrap_or_default();
        if remaining.is_empty() {
            trace!(argument = descriptor.name(), position, "No keyless token left");
            return Ok(None);
        }

        if descriptor.is_array() {
            cursor.consume(remaining.len());
            trace!(
                argument = descriptor.name(),
                position,
                count = remaining.len(),
                "Consumed remaining keyless tokens"
            );
            let items = self.convert_all(descriptor, descriptor.name(), remaining)?;
            return self.collect(descriptor, items).map(Some);
        }

        cursor.consume(1);
        trace!(argument = descriptor.name(), position, "Consumed keyless token");
        self.convert(descriptor, descriptor.name(), &remaining[0]).map(Some)
    }

    fn resolve_named(&self, descriptor: &ArgumentDescriptor) -> BindResult<Option<AnyValue>> {
        let Some(key) = self.arguments.existing_key(descriptor.name()) else {
            return Ok(None);
        };
        let is_flag = self.arguments.is_flag(key);

        if matches!(descriptor.shape, Shape::Flag) {
            if !is_flag {
                return Err(ArgumentError::new(descriptor.name(), "Argument is a flag (without value)").into());
            }
            return Ok(Some(Box::new(true)));
        }
        if is_flag {
            return Err(ArgumentError::new(descriptor.name(), "Argument is not a flag (value required)").into());
        }

        let values = self.arguments.values(key);
        if descriptor.is_array() {
            let items = self.convert_all(descriptor, key, values)?;
            return self.collect(descriptor, items).map(Some);
        }
        if values.len() != 1 {
            return Err(ArgumentError::new(
                descriptor.name(),
                format!("Only a single value is allowed ({} value(s) given)", values.len()),
            )
            .into());
        }
        self.convert(descriptor, key, &values[0]).map(Some)
    }

    fn convert_all(
        &self,
        descriptor: &ArgumentDescriptor,
        name: &str,
        raw: &[String],
    ) -> BindResult<Vec<AnyValue>> {
        raw.iter()
            .enumerate()
            .map(|(index, token)| self.convert(descriptor, &format!("{name}[{index}]"), token))
            .collect()
    }

    /// Convert one token into a value of the slot's (element) type
    fn convert(&self, descriptor: &ArgumentDescriptor, name: &str, raw: &str) -> BindResult<AnyValue> {
        let value_type = descriptor.value_type();
        let parser = descriptor
            .parser
            .as_ref()
            .or_else(|| self.parsers.find(&value_type));

        if let Some(parser) = parser {
            let value = parser
                .parse(name, &value_type, raw)
                .map_err(|message| ArgumentError::new(name, message))?;
            if (*value).type_id() != value_type.id() {
                return Err(BindError::configuration(format!(
                    "Parser for argument \"{name}\" didn't produce a {value_type}"
                )));
            }
            return Ok(value);
        }

        match &descriptor.shape {
            Shape::Text => Ok(Box::new(raw.to_string())),
            Shape::Typed { json } => {
                if !descriptor.parse_json {
                    return Err(BindError::configuration(format!(
                        "JSON parsing needs to be enabled for argument \"{name}\""
                    )));
                }
                let Some(decode) = json else {
                    return Err(BindError::configuration(format!(
                        "No parser for {value_type} (argument \"{name}\")"
                    )));
                };
                decode(raw).map_err(|e| ArgumentError::new(name, format!("Invalid JSON: {e}")).into())
            }
            Shape::Flag | Shape::Holder(_) => Err(BindError::configuration(format!(
                "Argument \"{name}\" can't be parsed from a token"
            ))),
        }
    }

    pub(super) fn collect(&self, descriptor: &ArgumentDescriptor, items: Vec<AnyValue>) -> BindResult<AnyValue> {
        (descriptor.collect)(items).ok_or_else(|| {
            BindError::configuration(format!(
                "Values of argument \"{}\" don't match {}",
                descriptor.name(),
                descriptor.value_type()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::arg;
    use crate::args::{CliArguments, DefaultTokenizer, Tokenizer};
    use crate::binder::{ArgumentParser, BindError, Binder, KeylessCursor, ParserRegistry};
    use crate::metadata::{AnyValue, ArgumentDescriptor};
    use serde::Deserialize;

    fn tokenize(raw: &[&str]) -> CliArguments {
        let raw: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
        DefaultTokenizer.tokenize(&raw).unwrap()
    }

    fn bind(raw: &[&str], parsers: &ParserRegistry, descriptor: &ArgumentDescriptor) -> Result<AnyValue, BindError> {
        let args = tokenize(raw);
        let binder = Binder::new(&args, parsers);
        binder
            .bind_slot(descriptor, &mut KeylessCursor::default())
            .map(|value| value.unwrap_or_else(|| Box::new(())))
    }

    fn message(error: BindError) -> String {
        match error {
            BindError::Argument(error) => error.message().to_string(),
            BindError::Configuration(message) => format!("configuration: {message}"),
        }
    }

    #[test]
    fn test_flag_shape_mismatch() {
        let parsers = ParserRegistry::new();
        let flag = arg::flag("verbose").into_descriptor();
        let text = arg::text("message").into_descriptor();

        assert!(*bind(&["-verbose"], &parsers, &flag).unwrap().downcast::<bool>().unwrap());
        assert_eq!(
            message(bind(&["--verbose", "yes"], &parsers, &flag).unwrap_err()),
            "Argument is a flag (without value)"
        );
        assert_eq!(
            message(bind(&["-message"], &parsers, &text).unwrap_err()),
            "Argument is not a flag (value required)"
        );
    }

    #[test]
    fn test_single_value_only() {
        let parsers = ParserRegistry::new();
        let text = arg::text("message").into_descriptor();
        assert_eq!(
            message(bind(&["--message", "a", "b"], &parsers, &text).unwrap_err()),
            "Only a single value is allowed (2 value(s) given)"
        );
        let value = bind(&["--MESSAGE", "a"], &parsers, &text).unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "a");
    }

    #[test]
    fn test_keyless_array_consumes_rest() {
        let args = tokenize(&["demo", "sum", "1", "2", "3"]);
        let parsers = ParserRegistry::new();
        let binder = Binder::new(&args, &parsers);
        let descriptor = arg::text_list("values").keyless(0).into_descriptor();

        let mut cursor = KeylessCursor::new(2);
        let value = binder.bind_slot(&descriptor, &mut cursor).unwrap().unwrap();
        assert_eq!(*value.downcast::<Vec<String>>().unwrap(), vec!["1", "2", "3"]);
        assert_eq!(cursor.position(), args.keyless().len());

        let value = binder.bind_slot(&descriptor, &mut cursor).unwrap().unwrap();
        assert!(value.downcast::<Vec<String>>().unwrap().is_empty());
    }

    #[test]
    fn test_json_list() {
        let parsers = ParserRegistry::new();
        let descriptor = arg::json_list::<i32>("integers").parse_json().into_descriptor();
        let value = bind(&["--integers", "1", "2", "3"], &parsers, &descriptor).unwrap();
        assert_eq!(*value.downcast::<Vec<i32>>().unwrap(), vec![1, 2, 3]);

        let error = bind(&["--integers", "1", "x"], &parsers, &descriptor).unwrap_err();
        match error {
            BindError::Argument(error) => {
                assert_eq!(error.argument(), "integers[1]");
                assert!(error.message().starts_with("Invalid JSON"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_json_round_trip() {
        let parsers = ParserRegistry::new();
        let descriptor = arg::json::<Point>("point").parse_json().into_descriptor();
        let raw = serde_json::json!({ "x": 1, "y": -2 }).to_string();
        let value = bind(&["--point", &raw], &parsers, &descriptor).unwrap();
        assert_eq!(*value.downcast::<Point>().unwrap(), Point { x: 1, y: -2 });
    }

    #[test]
    fn test_json_not_enabled_is_configuration_fault() {
        let parsers = ParserRegistry::new();
        let descriptor = arg::json::<Point>("point").into_descriptor();
        let error = bind(&["--point", "{}"], &parsers, &descriptor).unwrap_err();
        assert_eq!(
            message(error),
            "configuration: JSON parsing needs to be enabled for argument \"point\""
        );
    }

    #[test]
    fn test_parser_precedence() {
        let parsers = ParserRegistry::new().with::<f32, _>(|_, _, raw| raw.parse::<f32>().map_err(|e| e.to_string()));

        let registered = arg::custom::<f32>("number").into_descriptor();
        let value = bind(&["--number", "0.123"], &parsers, &registered).unwrap();
        assert_eq!(*value.downcast::<f32>().unwrap(), 0.123);

        let overridden = arg::custom::<f32>("number")
            .parser(ArgumentParser::new::<f32, _>(|_, _, _| Ok(42.0)))
            .into_descriptor();
        let value = bind(&["--number", "0.123"], &parsers, &overridden).unwrap();
        assert_eq!(*value.downcast::<f32>().unwrap(), 42.0);

        let error = bind(&["--number", "abc"], &parsers, &registered).unwrap_err();
        assert!(matches!(error, BindError::Argument(_)));
    }

    #[test]
    fn test_parser_applies_to_list_elements() {
        let parsers = ParserRegistry::new().with::<u8, _>(|name, _, raw| {
            raw.parse::<u8>().map_err(|e| format!("{name}: {e}"))
        });
        let descriptor = arg::custom_list::<u8>("bytes").keyless(0).into_descriptor();
        let value = bind(&["1", "2"], &parsers, &descriptor).unwrap();
        assert_eq!(*value.downcast::<Vec<u8>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_parser_produces_wrong_type() {
        let parsers = ParserRegistry::new();
        let descriptor = arg::custom::<u16>("port")
            .parser(ArgumentParser::dynamic(|_, _, _| Ok(Box::new("nope".to_string()))))
            .into_descriptor();
        let error = bind(&["--port", "1"], &parsers, &descriptor).unwrap_err();
        assert!(matches!(error, BindError::Configuration(_)));
    }
}
