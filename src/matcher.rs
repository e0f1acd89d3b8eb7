//! Binding one candidate to one operation.

use crate::command::Operation;
use crate::error::ConversionError;
use crate::lexer::Word;
use crate::parser::Candidate;
use crate::registry::ConversionService;
use crate::types::{Value, ValueType};

/// Converts the candidate's words into the operation's arguments.
///
/// Returns `None` when the arity does not fit or any word fails to convert. Failures are
/// not errors here: they only mean this reading of the command does not apply.
pub fn bind<T>(candidate: &Candidate, operation: &Operation<T>, service: &dyn ConversionService) -> Option<Vec<Value>> {
    let words = &candidate.arguments;
    let fixed = operation.fixed_parameters();

    if words.len() < fixed.len() || (!operation.is_variadic() && words.len() != fixed.len()) {
        tracing::trace!(
            operation = %operation.signature(),
            arguments = words.len(),
            "arity does not match"
        );
        return None;
    }

    let (head, tail) = words.split_at(fixed.len());
    let converted = convert_all(head, fixed.iter(), service).and_then(|mut values| {
        if let Some(element) = operation.variadic_element() {
            let items = convert_all(tail, std::iter::repeat(element), service)?;
            values.push(Value::array(element, items));
        }
        Ok(values)
    });

    match converted {
        Ok(values) => Some(values),
        Err(e) => {
            tracing::trace!(operation = %operation.signature(), "{}", e);
            None
        }
    }
}

fn convert_all<'a>(
    words: &[Word],
    types: impl Iterator<Item = &'a ValueType>,
    service: &dyn ConversionService,
) -> Result<Vec<Value>, ConversionError> {
    words
        .iter()
        .zip(types)
        .map(|(word, ty)| service.value_of(word, ty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_into_words;
    use crate::registry::ConverterRegistry;

    struct Target;

    fn candidate(name: &str, arguments: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            arguments: split_into_words(arguments).unwrap(),
        }
    }

    fn string() -> ValueType {
        ValueType::of::<String>()
    }

    fn mixed() -> Operation<Target> {
        Operation::variadic("mixed", [string()], string(), |_: &mut Target, _| Ok(None))
    }

    #[test]
    fn test_exact_arity() {
        let registry = ConverterRegistry::with_defaults();
        let op = Operation::new("two", [string(), ValueType::primitive::<i32>()], |_: &mut Target, _| Ok(None));
        assert!(bind(&candidate("two", "a 1"), &op, &registry).is_some());
        assert!(bind(&candidate("two", "a"), &op, &registry).is_none());
        assert!(bind(&candidate("two", "a 1 2"), &op, &registry).is_none());
    }

    #[test]
    fn test_conversion_failure_voids_binding() {
        let registry = ConverterRegistry::with_defaults();
        let op = Operation::new("n", [ValueType::primitive::<i32>()], |_: &mut Target, _| Ok(None));
        assert!(bind(&candidate("n", "x"), &op, &registry).is_none());
        assert!(bind(&candidate("n", r"\0"), &op, &registry).is_none());
    }

    #[test]
    fn test_variadic_tail_is_collected() {
        let registry = ConverterRegistry::with_defaults();
        let values = bind(&candidate("mixed", "zero one two three"), &mixed(), &registry).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].downcast_ref::<String>().map(String::as_str), Some("zero"));
        assert_eq!(format!("{:?}", values[1]), r#"["one", "two", "three"]"#);
    }

    #[test]
    fn test_variadic_tail_may_be_empty() {
        let registry = ConverterRegistry::with_defaults();
        let values = bind(&candidate("mixed", "zero"), &mixed(), &registry).unwrap();
        assert_eq!(values[1].items().map(<[Value]>::len), Some(0));
        assert!(bind(&candidate("mixed", ""), &mixed(), &registry).is_none());
    }

    #[test]
    fn test_variadic_element_failure_voids_binding() {
        let registry = ConverterRegistry::with_defaults();
        let op = Operation::variadic("sum", [], ValueType::primitive::<i64>(), |_: &mut Target, _| Ok(None));
        assert!(bind(&candidate("sum", "1 2 3"), &op, &registry).is_some());
        assert!(bind(&candidate("sum", "1 x 3"), &op, &registry).is_none());
    }

    #[test]
    fn test_no_parameters() {
        let registry = ConverterRegistry::with_defaults();
        let op = Operation::new("ping", [], |_: &mut Target, _| Ok(None));
        assert_eq!(bind(&candidate("ping", ""), &op, &registry).map(|v| v.len()), Some(0));
        assert!(bind(&candidate("ping", "now"), &op, &registry).is_none());
    }
}
