//! Runtime type descriptors and type-erased values.
//!
//! The dispatcher never sees Rust types directly. Operations declare their parameters as
//! [`ValueType`]s, converters produce [`Value`]s, and the invoker downcasts them back.
//!
//! Two flavours of types exist, mirroring the difference between `T` and `Option<T>`:
//! - *primitive* types (`ValueType::primitive::<i32>()`, shown as `i32`) never accept null;
//! - *reference* types (`ValueType::of::<i32>()`, shown as `Option<i32>`) accept the
//!   null word and form a hierarchy rooted at [`ValueType::any`].
//!
//! Every primitive type has a wrapper: the reference type over the same Rust type.

use regex::Regex;
use std::any::{Any, TypeId};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Builds a value of the given type from a string, or explains why it cannot.
type ParseFn = fn(&ValueType, &str) -> Result<Value, String>;

/// Looks up an enum constant by its exact name.
type ConstantFn = fn(&ValueType, &str) -> Option<Value>;

type DebugFn = fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result;

/// Whether a type accepts the null word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Primitive,
    Reference,
}

/// Enum types that can be converted from the name of one of their constants.
///
/// ```
/// use console_dispatch::types::Constants;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Color { Red, Green }
///
/// impl Constants for Color {
///     const CONSTANTS: &'static [(&'static str, Self)] = &[("Red", Color::Red), ("Green", Color::Green)];
/// }
/// ```
pub trait Constants: Clone + fmt::Debug + 'static {
    const CONSTANTS: &'static [(&'static str, Self)];
}

struct EnumRoot;

#[derive(Clone)]
struct TypeInfo {
    id: TypeId,
    name: String,
    kind: Kind,
    parent: Option<ValueType>,
    wrapper: Option<ValueType>,
    parse: Option<ParseFn>,
    constants: Option<ConstantFn>,
}

/// A cheaply clonable runtime type descriptor.
///
/// Two descriptors are equal when they describe the same Rust type with the same
/// nullability, regardless of how they were built.
#[derive(Clone)]
pub struct ValueType(Arc<TypeInfo>);

impl ValueType {
    /// The root of the reference type hierarchy.
    pub fn any() -> Self {
        Self(Arc::new(TypeInfo {
            id: TypeId::of::<dyn Any>(),
            name: "Any".to_string(),
            kind: Kind::Reference,
            parent: None,
            wrapper: None,
            parse: None,
            constants: None,
        }))
    }

    /// The common supertype of every enum type.
    pub fn enumeration() -> Self {
        Self(Arc::new(TypeInfo {
            id: TypeId::of::<EnumRoot>(),
            name: "Enum".to_string(),
            kind: Kind::Reference,
            parent: Some(Self::any()),
            wrapper: None,
            parse: None,
            constants: None,
        }))
    }

    /// A nullable type whose values are built with [`FromStr`].
    pub fn of<T>() -> Self
    where
        T: FromStr + fmt::Debug + 'static,
        T::Err: fmt::Display,
    {
        let mut info = Self::reference_info::<T>();
        info.parse = Some(parse_as::<T>);
        Self(Arc::new(info))
    }

    /// A nullable type with no string constructor; it needs a registered converter.
    pub fn opaque<T: 'static>() -> Self {
        Self(Arc::new(Self::reference_info::<T>()))
    }

    /// A non-nullable type. Its wrapper is `ValueType::of::<T>()`.
    pub fn primitive<T>() -> Self
    where
        T: FromStr + fmt::Debug + 'static,
        T::Err: fmt::Display,
    {
        Self(Arc::new(TypeInfo {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
            kind: Kind::Primitive,
            parent: None,
            wrapper: Some(Self::of::<T>()),
            parse: None,
            constants: None,
        }))
    }

    /// A nullable enum type converted from constant names.
    pub fn enum_of<E: Constants>() -> Self {
        let mut info = Self::reference_info::<E>();
        info.parent = Some(Self::enumeration());
        info.constants = Some(constant_named::<E>);
        Self(Arc::new(info))
    }

    /// Declares `parent` as the direct supertype of this type.
    ///
    /// Equality only looks at the Rust type, so a re-parented descriptor still equals the
    /// original one. [`ConverterRegistry::register`](crate::ConverterRegistry::register)
    /// refuses to replace a converter whose type was registered with another parent.
    pub fn extends(mut self, parent: &ValueType) -> Self {
        Arc::make_mut(&mut self.0).parent = Some(parent.clone());
        self
    }

    fn reference_info<T: 'static>() -> TypeInfo {
        TypeInfo {
            id: TypeId::of::<Option<T>>(),
            name: format!("Option<{}>", short_type_name::<T>()),
            kind: Kind::Reference,
            parent: Some(Self::any()),
            wrapper: None,
            parse: None,
            constants: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> Kind {
        self.0.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.0.kind == Kind::Reference
    }

    /// The direct supertype, if any.
    pub fn parent(&self) -> Option<&ValueType> {
        self.0.parent.as_ref()
    }

    /// The reference type a primitive type boxes into.
    pub fn wrapper(&self) -> Option<&ValueType> {
        self.0.wrapper.as_ref()
    }

    /// All supertypes, nearest first.
    pub fn supertypes(&self) -> impl Iterator<Item = &ValueType> {
        std::iter::successors(self.parent(), |&ty| ty.parent())
    }

    /// True when `other` appears on this type's supertype chain.
    pub fn is_strict_subtype_of(&self, other: &ValueType) -> bool {
        self.supertypes().any(|ty| ty == other)
    }

    /// True when a value of this type can be passed where `other` is expected.
    pub fn is_assignable_to(&self, other: &ValueType) -> bool {
        self == other || self.is_strict_subtype_of(other)
    }

    /// Runs the type's string constructor, if it has one.
    pub fn construct(&self, source: &str) -> Option<Result<Value, String>> {
        self.0.parse.map(|parse| parse(self, source))
    }

    /// Looks up an enum constant by name. `None` for non-enum types.
    pub fn constant(&self, name: &str) -> Option<Option<Value>> {
        self.0.constants.map(|lookup| lookup(self, name))
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ValueType {}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_as<T>(ty: &ValueType, source: &str) -> Result<Value, String>
where
    T: FromStr + fmt::Debug + 'static,
    T::Err: fmt::Display,
{
    source
        .parse::<T>()
        .map(|v| Value::new(ty, v))
        .map_err(|e| e.to_string())
}

fn constant_named<E: Constants>(ty: &ValueType, name: &str) -> Option<Value> {
    E::CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, value)| Value::new(ty, value.clone()))
}

static MODULE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:\w+::)+").unwrap());

/// `std::any::type_name` without module paths: `alloc::string::String` becomes `String`.
pub fn short_type_name<T: ?Sized>() -> String {
    MODULE_PATH
        .replace_all(std::any::type_name::<T>(), "")
        .into_owned()
}

/// A converted argument or an operation result.
pub enum Value {
    /// The null word converted to a reference type.
    Null,
    /// A single typed value.
    Object {
        ty: ValueType,
        data: Box<dyn Any>,
        debug: DebugFn,
    },
    /// The collected tail of a variadic operation.
    Array { element: ValueType, items: Vec<Value> },
}

impl Value {
    pub fn new<T: fmt::Debug + 'static>(ty: &ValueType, data: T) -> Self {
        Value::Object {
            ty: ty.clone(),
            data: Box::new(data),
            debug: debug_as::<T>,
        }
    }

    /// A value of the reference type `ValueType::of::<T>()`.
    pub fn of<T>(data: T) -> Self
    where
        T: FromStr + fmt::Debug + 'static,
        T::Err: fmt::Display,
    {
        Self::new(&ValueType::of::<T>(), data)
    }

    pub fn array(element: &ValueType, items: Vec<Value>) -> Self {
        Value::Array {
            element: element.clone(),
            items,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The declared type of an object value.
    pub fn value_type(&self) -> Option<&ValueType> {
        match self {
            Value::Object { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Object { data, .. } => data.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Takes the payload out of an object value. Returns the value back on a type mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, Value> {
        match self {
            Value::Object { ty, data, debug } => match data.downcast::<T>() {
                Ok(v) => Ok(*v),
                Err(data) => Err(Value::Object { ty, data, debug }),
            },
            other => Err(other),
        }
    }

    /// The items of an array value.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Whether this value may be passed where `target` is expected.
    ///
    /// Besides ordinary assignability, a wrapper value is accepted for its primitive.
    pub fn is_assignable_to(&self, target: &ValueType) -> bool {
        match self {
            Value::Null => target.is_nullable(),
            Value::Object { ty, .. } => {
                ty.is_assignable_to(target) || target.wrapper().is_some_and(|w| w == ty)
            }
            Value::Array { .. } => false,
        }
    }
}

fn debug_as<T: fmt::Debug + 'static>(data: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match data.downcast_ref::<T>() {
        Some(v) => v.fmt(f),
        None => f.write_str("<?>"),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Object { data, debug, .. } => debug(&**data, f),
            Value::Array { items, .. } => f.debug_list().entries(items).finish(),
        }
    }
}
