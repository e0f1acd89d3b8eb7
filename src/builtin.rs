//! Converters every registry starts with.
//!
//! See [`default_converters`] for the set and its order.

use crate::error::{ConversionError, RegistryError};
use crate::lexer::Word;
use crate::registry::{ConversionService, Converter};
use crate::types::{Value, ValueType};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Builds values through the requested type's string constructor.
///
/// Registered for [`ValueType::any`], so it is the last resort for every reference type.
#[derive(Debug, Default)]
pub struct FromStrConverter;

impl Converter for FromStrConverter {
    fn target_type(&self) -> Option<ValueType> {
        Some(ValueType::any())
    }

    fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
        match target.construct(source) {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => {
                tracing::trace!(source, %target, %reason, "string constructor rejected value");
                Err(ConversionError::invalid(Some(source), target))
            }
            None => Err(ConversionError::unsupported(Some(source), target)),
        }
    }
}

/// Answers requests for one type by converting to another, unrelated type.
///
/// Used to map primitive types onto their wrappers, so that a converter registered for
/// `Option<i32>` also serves `i32` parameters.
#[derive(Debug)]
pub struct DelegatingConverter {
    from: ValueType,
    to: ValueType,
}

impl DelegatingConverter {
    /// Fails when one type is a subtype of the other; delegation would loop.
    pub fn new(from: ValueType, to: ValueType) -> Result<Self, RegistryError> {
        if from.is_assignable_to(&to) || to.is_assignable_to(&from) {
            return Err(RegistryError::RelatedTypes {
                from: from.name().to_string(),
                to: to.name().to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// Delegates a primitive type to its wrapper.
    pub fn unboxing(primitive: ValueType) -> Result<Self, RegistryError> {
        let wrapper = primitive.wrapper().cloned().ok_or_else(|| RegistryError::NotPrimitive {
            ty: primitive.name().to_string(),
        })?;
        Self::new(primitive, wrapper)
    }

    fn primitive<T>() -> Self
    where
        T: FromStr + fmt::Debug + 'static,
        T::Err: fmt::Display,
    {
        Self {
            from: ValueType::primitive::<T>(),
            to: ValueType::of::<T>(),
        }
    }
}

impl Converter for DelegatingConverter {
    fn target_type(&self) -> Option<ValueType> {
        Some(self.from.clone())
    }

    fn value_of(&self, source: &str, _: &ValueType, service: &dyn ConversionService) -> Result<Value, ConversionError> {
        service.value_of(&Word::text(source), &self.to)
    }
}

/// Accepts exactly `true` and `false`.
#[derive(Debug, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn target_type(&self) -> Option<ValueType> {
        Some(ValueType::of::<bool>())
    }

    fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
        match source {
            "true" => Ok(Value::of(true)),
            "false" => Ok(Value::of(false)),
            _ => Err(ConversionError::invalid(Some(source), target)),
        }
    }
}

/// Accepts words of exactly one character.
#[derive(Debug, Default)]
pub struct CharConverter;

impl Converter for CharConverter {
    fn target_type(&self) -> Option<ValueType> {
        Some(ValueType::of::<char>())
    }

    fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
        let mut chars = source.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::of(c)),
            _ => Err(ConversionError::invalid(Some(source), target)),
        }
    }
}

/// Looks up enum constants by their exact name.
#[derive(Debug, Default)]
pub struct EnumConverter;

impl Converter for EnumConverter {
    fn target_type(&self) -> Option<ValueType> {
        Some(ValueType::enumeration())
    }

    fn value_of(&self, source: &str, target: &ValueType, _: &dyn ConversionService) -> Result<Value, ConversionError> {
        match target.constant(source) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(ConversionError::invalid(Some(source), target)),
            None => Err(ConversionError::unsupported(Some(source), target)),
        }
    }
}

type Entry = (ValueType, Arc<dyn Converter>);

fn entry(ty: ValueType, converter: impl Converter + 'static) -> Entry {
    let converter: Arc<dyn Converter> = Arc::new(converter);
    (ty, converter)
}

fn unboxed<T>() -> Entry
where
    T: FromStr + fmt::Debug + 'static,
    T::Err: fmt::Display,
{
    let converter = DelegatingConverter::primitive::<T>();
    entry(converter.from.clone(), converter)
}

/// The built-in converters with their target types, in registration order.
pub(crate) fn default_converters() -> Vec<Entry> {
    vec![
        entry(ValueType::any(), FromStrConverter),
        unboxed::<bool>(),
        unboxed::<char>(),
        unboxed::<i8>(),
        unboxed::<i16>(),
        unboxed::<i32>(),
        unboxed::<i64>(),
        unboxed::<i128>(),
        unboxed::<isize>(),
        unboxed::<u8>(),
        unboxed::<u16>(),
        unboxed::<u32>(),
        unboxed::<u64>(),
        unboxed::<u128>(),
        unboxed::<usize>(),
        unboxed::<f32>(),
        unboxed::<f64>(),
        entry(ValueType::of::<bool>(), BooleanConverter),
        entry(ValueType::of::<char>(), CharConverter),
        entry(ValueType::enumeration(), EnumConverter),
    ]
}
