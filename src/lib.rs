//! A small engine for shell-like command consoles.
//!
//! A command line such as `set value 3` is split into words, every way of reading it as
//! an operation name followed by arguments is tried against a catalog of operations, the
//! argument words are converted to the declared parameter types, and the single best
//! match is invoked on the target.
//!
//! The main entry point is [`Interpreter`]. Targets describe their operations with a
//! [`Catalog`] (usually through [`CommandTarget`]), and string-to-value conversion is
//! pluggable through the [`ConverterRegistry`].

mod builtin;
pub mod command;
pub mod error;
mod interpreter;
pub mod lexer;
mod matcher;
pub mod parser;
pub mod registry;
pub mod types;

pub use builtin::{BooleanConverter, CharConverter, DelegatingConverter, EnumConverter, FromStrConverter};
pub use command::{Arguments, Catalog, CommandTarget, Operation};
pub use error::CommandError;
/// The command runner and its resolution outcomes.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, Match, Resolution, Signature};
pub use parser::NamingConvention;
pub use registry::{ConversionService, Converter, ConverterRegistry};
pub use types::{Constants, Value, ValueType};
