use crate::error::ArgumentError;
use crate::interpreter::Signature;
use crate::types::{Value, ValueType};
use std::any::Any;
use std::sync::Arc;

/// Result of running an operation: `None` for operations without a return value.
pub type OperationResult = anyhow::Result<Option<Value>>;

/// Type-erased body of an operation.
///
/// Invokers receive the target and the converted arguments in declaration order. Errors
/// returned here are reported as invocation errors, except [`ArgumentError`], which means
/// the invoker does not agree with its own declaration.
pub type Invoker<T> = Arc<dyn Fn(&mut T, Arguments) -> OperationResult + Send + Sync>;

/// One invocable operation of a target: a name, typed parameters and a body.
pub struct Operation<T> {
    name: String,
    parameters: Vec<ValueType>,
    variadic: bool,
    invoker: Invoker<T>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            variadic: self.variadic,
            invoker: Arc::clone(&self.invoker),
        }
    }
}

impl<T> Operation<T> {
    /// An operation taking exactly `parameters`.
    pub fn new<F>(name: impl Into<String>, parameters: impl IntoIterator<Item = ValueType>, body: F) -> Self
    where
        F: Fn(&mut T, Arguments) -> OperationResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().collect(),
            variadic: false,
            invoker: Arc::new(body),
        }
    }

    /// An operation taking `fixed` parameters followed by any number of `element`s.
    ///
    /// The tail arrives as a single array argument after the fixed ones.
    pub fn variadic<F>(
        name: impl Into<String>,
        fixed: impl IntoIterator<Item = ValueType>,
        element: ValueType,
        body: F,
    ) -> Self
    where
        F: Fn(&mut T, Arguments) -> OperationResult + Send + Sync + 'static,
    {
        let mut parameters: Vec<ValueType> = fixed.into_iter().collect();
        parameters.push(element);
        Self {
            name: name.into(),
            parameters,
            variadic: true,
            invoker: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters; for variadic operations the last one is the element type.
    pub fn parameters(&self) -> &[ValueType] {
        &self.parameters
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Parameters that need exactly one word each.
    pub fn fixed_parameters(&self) -> &[ValueType] {
        if self.variadic {
            &self.parameters[..self.parameters.len() - 1]
        } else {
            &self.parameters
        }
    }

    /// Element type of the variadic tail.
    pub fn variadic_element(&self) -> Option<&ValueType> {
        if self.variadic {
            self.parameters.last()
        } else {
            None
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::new(
            &self.name,
            self.parameters.iter().map(|p| p.name().to_string()).collect(),
            self.variadic,
        )
    }

    pub(crate) fn invoker(&self) -> Invoker<T> {
        Arc::clone(&self.invoker)
    }
}

/// The operations a target exposes to the console.
pub struct Catalog<T> {
    operations: Vec<Operation<T>>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
        }
    }
}

impl<T> Clone for Catalog<T> {
    fn clone(&self) -> Self {
        Self {
            operations: self.operations.clone(),
        }
    }
}

impl<T> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Catalog::add`].
    pub fn with(mut self, operation: Operation<T>) -> Self {
        self.add(operation);
        self
    }

    pub fn add(&mut self, operation: Operation<T>) {
        self.operations.push(operation);
    }

    /// Overloads sharing `name`, in catalog order.
    pub fn operations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Operation<T>> + 'a {
        self.operations.iter().filter(move |op| op.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation<T>> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A type that exposes operations to the console.
///
/// The catalog is built once, when an [`Interpreter`](crate::Interpreter) is created.
pub trait CommandTarget: Sized + 'static {
    fn catalog() -> Catalog<Self>;
}

/// Converted arguments handed to an invoker, consumed front to back.
pub struct Arguments {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn take(&mut self) -> Result<(usize, Value), ArgumentError> {
        let position = self.position;
        self.position += 1;
        self.values
            .next()
            .map(|v| (position, v))
            .ok_or(ArgumentError::Missing { position })
    }

    /// Next argument; null is an error.
    pub fn next<A: Any>(&mut self) -> Result<A, ArgumentError> {
        let (position, value) = self.take()?;
        payload(position, value)?.ok_or(ArgumentError::Null { position })
    }

    /// Next argument of a nullable parameter.
    pub fn next_opt<A: Any>(&mut self) -> Result<Option<A>, ArgumentError> {
        let (position, value) = self.take()?;
        payload(position, value)
    }

    /// The variadic tail; a null element is an error.
    pub fn rest<A: Any>(&mut self) -> Result<Vec<A>, ArgumentError> {
        let (position, items) = self.take_array()?;
        items
            .into_iter()
            .map(|item| payload(position, item)?.ok_or(ArgumentError::Null { position }))
            .collect()
    }

    /// The variadic tail of a nullable element type.
    pub fn rest_opt<A: Any>(&mut self) -> Result<Vec<Option<A>>, ArgumentError> {
        let (position, items) = self.take_array()?;
        items.into_iter().map(|item| payload(position, item)).collect()
    }

    fn take_array(&mut self) -> Result<(usize, Vec<Value>), ArgumentError> {
        match self.take()? {
            (position, Value::Array { items, .. }) => Ok((position, items)),
            (position, _) => Err(ArgumentError::NotAnArray { position }),
        }
    }
}

fn payload<A: Any>(position: usize, value: Value) -> Result<Option<A>, ArgumentError> {
    match value {
        Value::Null => Ok(None),
        other => other.downcast::<A>().map(Some).map_err(|_| ArgumentError::TypeMismatch {
            position,
            expected: std::any::type_name::<A>(),
        }),
    }
}
