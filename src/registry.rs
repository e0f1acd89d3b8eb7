//! The converter registry: turns words into typed values.
//!
//! Converters are keyed by the type they produce. A lookup for a type without an exact
//! converter falls back to converters of its subtypes and then of its supertypes, so a
//! single converter registered for [`ValueType::enumeration`] serves every enum.

use crate::builtin;
use crate::error::{ConversionError, RegistryError};
use crate::lexer::Word;
use crate::types::{Value, ValueType};
use std::sync::{Arc, Mutex, PoisonError};

/// Converts source text into values of one target type.
pub trait Converter: Send + Sync {
    /// The type this converter is registered for. `None` makes it unregistrable.
    fn target_type(&self) -> Option<ValueType>;

    /// Converts `source` into a value assignable to `target`.
    ///
    /// `target` is the type that was asked for, which may be a subtype of
    /// [`Converter::target_type`]. `service` can be used to delegate to other converters.
    fn value_of(
        &self,
        source: &str,
        target: &ValueType,
        service: &dyn ConversionService,
    ) -> Result<Value, ConversionError>;
}

/// Access to the full conversion search, handed to converters that delegate.
pub trait ConversionService {
    fn value_of(&self, word: &Word, target: &ValueType) -> Result<Value, ConversionError>;
}

type Entry = (ValueType, Arc<dyn Converter>);

/// A thread-safe set of converters with hierarchy-aware lookup.
///
/// The lock is only held while the set of converters is read or changed; converters
/// always run on a snapshot, so they may call back into the registry.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: Mutex<Vec<Entry>>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in converters.
    pub fn with_defaults() -> Self {
        let converters = builtin::default_converters();
        tracing::debug!(count = converters.len(), "registered built-in converters");
        Self {
            converters: Mutex::new(converters),
        }
    }

    /// Adds `converter`, replacing any converter registered for the same type.
    ///
    /// The replacement keeps the old converter's position. Its type must have the same
    /// supertype chain as the registered one.
    pub fn register(&self, converter: Arc<dyn Converter>) -> Result<(), RegistryError> {
        let ty = converter.target_type().ok_or(RegistryError::MissingTargetType)?;
        let mut converters = self.lock();
        match converters.iter_mut().find(|(existing, _)| *existing == ty) {
            Some((existing, _)) if !existing.supertypes().eq(ty.supertypes()) => {
                return Err(RegistryError::ConflictingHierarchy {
                    ty: ty.name().to_string(),
                });
            }
            Some(entry) => entry.1 = converter,
            None => converters.push((ty.clone(), converter)),
        }
        tracing::debug!(target_type = %ty, "registered converter");
        Ok(())
    }

    /// Removes the converter for `ty` and returns it. Unknown types are ignored.
    pub fn unregister(&self, ty: &ValueType) -> Option<Arc<dyn Converter>> {
        let mut converters = self.lock();
        let index = converters.iter().position(|(existing, _)| existing == ty)?;
        tracing::debug!(target_type = %ty, "unregistered converter");
        Some(converters.remove(index).1)
    }

    /// The converter registered for exactly `ty`.
    pub fn converter_for(&self, ty: &ValueType) -> Option<Arc<dyn Converter>> {
        self.lock()
            .iter()
            .find(|(existing, _)| existing == ty)
            .map(|(_, converter)| Arc::clone(converter))
    }

    /// Registered target types, in registration order.
    pub fn supported_types(&self) -> Vec<ValueType> {
        self.lock().iter().map(|(ty, _)| ty.clone()).collect()
    }

    /// Converts `word` into a value of `target`.
    ///
    /// Search order: the null word, the exact converter, converters of strict subtypes in
    /// registration order, then converters along the supertype chain. A converter that
    /// rejects the value itself ends the search.
    ///
    /// # Arguments
    /// * `word` - The word to convert, possibly the null word.
    /// * `target` - The type the value must be assignable to.
    ///
    /// # Returns
    /// `Result<Value, ConversionError>`: The converted value, `InvalidSourceValue` when a
    /// converter rejected the text, or `Unsupported` when no converter could handle `target`.
    pub fn convert(&self, word: &Word, target: &ValueType) -> Result<Value, ConversionError> {
        let source = match word {
            Word::Null if target.is_nullable() => return Ok(Value::Null),
            Word::Null => return Err(ConversionError::invalid(None, target)),
            Word::Text(text) => text.as_str(),
        };

        let snapshot = self.lock().clone();
        let lookup = |ty: &ValueType| {
            snapshot
                .iter()
                .find(|(existing, _)| existing == ty)
                .map(|(_, c)| c)
        };

        if let Some(converter) = lookup(target) {
            match self.convert_using(converter.as_ref(), source, target) {
                Err(e) if !e.is_invalid_source_value() => {}
                result => return result,
            }
        }

        for (ty, converter) in &snapshot {
            if !ty.is_strict_subtype_of(target) {
                continue;
            }
            match self.convert_using(converter.as_ref(), source, target) {
                Err(e) if !e.is_invalid_source_value() => {}
                result => return result,
            }
        }

        for ty in target.supertypes() {
            let Some(converter) = lookup(ty) else {
                continue;
            };
            match self.convert_using(converter.as_ref(), source, target) {
                Err(e) if !e.is_invalid_source_value() => {}
                result => return result,
            }
        }

        Err(ConversionError::unsupported(Some(source), target))
    }

    fn convert_using(
        &self,
        converter: &dyn Converter,
        source: &str,
        target: &ValueType,
    ) -> Result<Value, ConversionError> {
        let value = converter.value_of(source, target, self)?;
        if value.is_assignable_to(target) {
            Ok(value)
        } else {
            tracing::trace!(?value, %target, "converter produced a value of the wrong type");
            Err(ConversionError::unsupported(Some(source), target))
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        self.converters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConversionService for ConverterRegistry {
    fn value_of(&self, word: &Word, target: &ValueType) -> Result<Value, ConversionError> {
        self.convert(word, target)
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("supported_types", &self.supported_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubling;

    impl Converter for Doubling {
        fn target_type(&self) -> Option<ValueType> {
            Some(ValueType::of::<i32>())
        }

        fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            let n: i32 = source.parse().map_err(|_| ConversionError::invalid(Some(source), target))?;
            Ok(Value::of(n * 2))
        }
    }

    /// Always answers with a string, whatever was asked.
    struct Stubborn(ValueType);

    impl Converter for Stubborn {
        fn target_type(&self) -> Option<ValueType> {
            Some(self.0.clone())
        }

        fn value_of(&self, source: &str, _: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            Ok(Value::of(source.to_string()))
        }
    }

    /// Produces values of its own type.
    struct Producing(ValueType);

    impl Converter for Producing {
        fn target_type(&self) -> Option<ValueType> {
            Some(self.0.clone())
        }

        fn value_of(&self, source: &str, _: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            Ok(Value::new(&self.0, source.to_string()))
        }
    }

    /// Produces values of whatever type was asked for.
    struct Echoing(ValueType);

    impl Converter for Echoing {
        fn target_type(&self) -> Option<ValueType> {
            Some(self.0.clone())
        }

        fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            Ok(Value::new(target, source.to_string()))
        }
    }

    /// Rejects every value.
    struct Rejecting(ValueType);

    impl Converter for Rejecting {
        fn target_type(&self) -> Option<ValueType> {
            Some(self.0.clone())
        }

        fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            Err(ConversionError::invalid(Some(source), target))
        }
    }

    struct Untyped;

    impl Converter for Untyped {
        fn target_type(&self) -> Option<ValueType> {
            None
        }

        fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
            Err(ConversionError::unsupported(Some(source), target))
        }
    }

    fn text(s: &str) -> Word {
        Word::text(s)
    }

    #[test]
    fn test_null_word() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.convert(&Word::Null, &ValueType::of::<String>()).unwrap().is_null());
        let err = registry.convert(&Word::Null, &ValueType::primitive::<i32>()).unwrap_err();
        assert!(err.is_invalid_source_value());
    }

    #[test]
    fn test_exact_converter_overrides_fallback() {
        let registry = ConverterRegistry::with_defaults();
        let value = registry.convert(&text("3"), &ValueType::of::<i32>()).unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&3));

        registry.register(Arc::new(Doubling)).unwrap();
        let value = registry.convert(&text("3"), &ValueType::of::<i32>()).unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&6));

        // primitives delegate to the wrapper, so they see the override too
        let value = registry.convert(&text("3"), &ValueType::primitive::<i32>()).unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&6));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Stubborn(ValueType::any()))).unwrap();
        registry.register(Arc::new(Doubling)).unwrap();
        registry.register(Arc::new(Stubborn(ValueType::any()))).unwrap();
        assert_eq!(
            registry.supported_types(),
            vec![ValueType::any(), ValueType::of::<i32>()]
        );
    }

    #[test]
    fn test_register_requires_target_type() {
        let registry = ConverterRegistry::new();
        assert_eq!(registry.register(Arc::new(Untyped)).unwrap_err(), RegistryError::MissingTargetType);
        assert!(registry.supported_types().is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Doubling)).unwrap();
        assert!(registry.converter_for(&ValueType::of::<i32>()).is_some());
        assert!(registry.unregister(&ValueType::of::<i32>()).is_some());
        assert!(registry.unregister(&ValueType::of::<i32>()).is_none());
        assert!(registry.converter_for(&ValueType::of::<i32>()).is_none());
    }

    #[test]
    fn test_invalid_source_value_stops_the_search() {
        let registry = ConverterRegistry::with_defaults();
        registry.register(Arc::new(Doubling)).unwrap();
        // the fallback could not parse it either, but it must not even be asked
        let err = registry.convert(&text("x"), &ValueType::of::<i32>()).unwrap_err();
        assert_eq!(err, ConversionError::invalid(Some("x"), &ValueType::of::<i32>()));
    }

    #[test]
    fn test_result_must_be_assignable() {
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Stubborn(ValueType::of::<i32>()))).unwrap();
        let err = registry.convert(&text("1"), &ValueType::of::<i32>()).unwrap_err();
        assert!(!err.is_invalid_source_value());
    }

    #[test]
    fn test_subtype_converter_is_used() {
        let shape = ValueType::opaque::<u8>();
        let circle = ValueType::opaque::<u16>().extends(&shape);
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Producing(circle.clone()))).unwrap();

        let value = registry.convert(&text("c"), &shape).unwrap();
        assert_eq!(value.value_type(), Some(&circle));

        // the other way around would need a supertype value to pass as a circle
        registry.unregister(&circle);
        registry.register(Arc::new(Producing(shape.clone()))).unwrap();
        assert!(registry.convert(&text("c"), &circle).is_err());
    }

    #[test]
    fn test_invalid_subtype_value_skips_siblings() {
        let shape = ValueType::opaque::<u8>();
        let circle = ValueType::opaque::<u16>().extends(&shape);
        let square = ValueType::opaque::<u32>().extends(&shape);
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Rejecting(circle))).unwrap();
        registry.register(Arc::new(Producing(square.clone()))).unwrap();

        let err = registry.convert(&text("x"), &shape).unwrap_err();
        assert_eq!(err, ConversionError::invalid(Some("x"), &shape));

        // on its own the sibling converts fine
        registry.unregister(&ValueType::opaque::<u16>());
        let value = registry.convert(&text("x"), &shape).unwrap();
        assert_eq!(value.value_type(), Some(&square));
    }

    #[test]
    fn test_supertype_search_skips_levels_without_converters() {
        let top = ValueType::opaque::<u32>();
        let middle = ValueType::opaque::<u16>().extends(&top);
        let leaf = ValueType::opaque::<u8>().extends(&middle);
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Stubborn(ValueType::any()))).unwrap();
        registry.register(Arc::new(Echoing(top))).unwrap();

        let value = registry.convert(&text("t"), &leaf).unwrap();
        assert_eq!(value.value_type(), Some(&leaf));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("t"));
    }

    #[test]
    fn test_register_keeps_the_hierarchy() {
        let shape = ValueType::opaque::<u8>();
        let circle = ValueType::opaque::<u16>().extends(&shape);
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Producing(circle.clone()))).unwrap();

        let err = registry.register(Arc::new(Producing(ValueType::opaque::<u16>()))).unwrap_err();
        assert_eq!(
            err,
            RegistryError::ConflictingHierarchy {
                ty: "Option<u16>".to_string()
            }
        );
        assert!(registry.convert(&text("c"), &shape).is_ok());

        registry.register(Arc::new(Echoing(circle))).unwrap();
        assert_eq!(registry.supported_types().len(), 1);
    }

    #[test]
    fn test_defaults() {
        let registry = ConverterRegistry::with_defaults();
        let types = registry.supported_types();
        assert_eq!(types.len(), 20);
        assert_eq!(types[0], ValueType::any());
        assert!(registry.converter_for(&ValueType::primitive::<u64>()).is_some());
    }

    #[test]
    fn test_supertype_converter_is_used() {
        let registry = ConverterRegistry::with_defaults();
        let value = registry.convert(&text("hello"), &ValueType::of::<String>()).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_unsupported_without_converters() {
        let registry = ConverterRegistry::new();
        let err = registry.convert(&text("1"), &ValueType::of::<i32>()).unwrap_err();
        assert_eq!(err, ConversionError::unsupported(Some("1"), &ValueType::of::<i32>()));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let registry = ConverterRegistry::with_defaults();
        registry.register(Arc::new(Doubling)).unwrap();
        let targets = [
            ValueType::of::<i32>(),
            ValueType::primitive::<f64>(),
            ValueType::primitive::<bool>(),
            ValueType::any(),
        ];
        for target in &targets {
            for source in ["1", "yes", "true", "2.5"] {
                let first = registry.convert(&text(source), target);
                let second = registry.convert(&text(source), target);
                match (first, second) {
                    (Ok(a), Ok(b)) => assert_eq!(format!("{:?}", a), format!("{:?}", b)),
                    (Err(a), Err(b)) => assert_eq!(a, b),
                    _ => panic!("different outcomes for {:?} as {}", source, target),
                }
            }
        }
    }
}
