//! Error types produced while resolving and executing a command line.

use crate::interpreter::Signature;
use thiserror::Error;

/// Reasons the lexer can reject a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A double quote was opened but never closed.
    #[error("double quote expected")]
    DoubleQuoteExpected,
    /// A backslash was followed by an unknown character or by the end of input.
    #[error("escape sequence expected")]
    EscapeSequenceExpected,
    /// `\0` appeared after other characters of the same word.
    #[error("null not allowed here")]
    NullNotAllowedHere,
}

/// A positioned syntax error in a command line.
///
/// The position is a character offset into `command`. The `Display` form is the reason
/// and the command on one line, followed by a caret pointing at the offending character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.command, .reason, .position))]
pub struct SyntaxError {
    /// The command line as it was given to the lexer.
    pub command: String,
    /// What went wrong.
    pub reason: LexingError,
    /// Character offset of the offending character, or the command length at end of input.
    pub position: usize,
}

impl SyntaxError {
    pub(crate) fn new(command: impl Into<String>, reason: LexingError, position: usize) -> Self {
        Self {
            command: command.into(),
            reason,
            position,
        }
    }
}

fn render(command: &str, reason: &LexingError, position: &usize) -> String {
    let reason = reason.to_string();
    let padding = reason.chars().count() + 2 + position;
    format!("{}: {}\n{}^", reason, command, " ".repeat(padding))
}

/// Failure to turn a source word into a value of the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The converter understands the type but rejects this particular value.
    ///
    /// This is definitive: the registry stops searching as soon as it sees it.
    #[error("cannot convert {source_value:?} to {target}")]
    InvalidSourceValue {
        source_value: Option<String>,
        target: String,
    },
    /// No registered converter could produce a value of the requested type.
    #[error("no converter for {target} (source {source_value:?})")]
    TargetTypeNotSupported {
        source_value: Option<String>,
        target: String,
    },
}

impl ConversionError {
    pub(crate) fn invalid(source_value: Option<&str>, target: &crate::types::ValueType) -> Self {
        Self::InvalidSourceValue {
            source_value: source_value.map(str::to_owned),
            target: target.name().to_owned(),
        }
    }

    pub(crate) fn unsupported(source_value: Option<&str>, target: &crate::types::ValueType) -> Self {
        Self::TargetTypeNotSupported {
            source_value: source_value.map(str::to_owned),
            target: target.name().to_owned(),
        }
    }

    /// Whether the error should stop the converter search.
    pub fn is_invalid_source_value(&self) -> bool {
        matches!(self, Self::InvalidSourceValue { .. })
    }
}

/// Misuse of the converter registry API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("converter does not declare a supported target type")]
    MissingTargetType,
    #[error("cannot delegate between related types {from} and {to}")]
    RelatedTypes { from: String, to: String },
    #[error("{ty} has no wrapper type")]
    NotPrimitive { ty: String },
    #[error("{ty} is already registered with a different supertype chain")]
    ConflictingHierarchy { ty: String },
}

/// An operation body asked for an argument the matcher did not bind that way.
///
/// Seeing one of these means the catalog entry disagrees with its own invoker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("argument {position} is missing")]
    Missing { position: usize },
    #[error("argument {position} is null")]
    Null { position: usize },
    #[error("argument {position} is not a {expected}")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
    },
    #[error("argument {position} is not a variadic array")]
    NotAnArray { position: usize },
}

/// The single failure family returned by [`Interpreter::execute`](crate::Interpreter::execute).
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command line could not be tokenized.
    #[error(transparent)]
    Malformed(#[from] SyntaxError),

    /// No operation accepted the command.
    #[error("command not found: {command}")]
    NotFound { command: String },

    /// Several operations accepted the command equally well.
    #[error("{}", ambiguous_message(.command, .signatures))]
    Ambiguous {
        command: String,
        signatures: Vec<Signature>,
    },

    /// The operation ran and reported an error of its own.
    #[error("operation failed: {error:#}")]
    Invocation {
        command: String,
        error: anyhow::Error,
    },

    /// Something went wrong inside the dispatcher or the catalog itself.
    #[error("command failed: {command}\n    because of: {reason}")]
    Execution { command: String, reason: String },
}

impl CommandError {
    /// The command line that failed.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Malformed(e) => &e.command,
            CommandError::NotFound { command }
            | CommandError::Ambiguous { command, .. }
            | CommandError::Invocation { command, .. }
            | CommandError::Execution { command, .. } => command,
        }
    }
}

fn ambiguous_message(command: &str, signatures: &[Signature]) -> String {
    let mut message = format!("ambiguous command: {}", command);
    for (i, signature) in signatures.iter().enumerate() {
        let label = if i == 0 { "      candidates: " } else { "                  " };
        message.push('\n');
        message.push_str(label);
        message.push_str(&signature.to_string());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_points_at_position() {
        let err = SyntaxError::new("foo aa\\0aa", LexingError::NullNotAllowedHere, 7);
        let expected = format!("null not allowed here: foo aa\\0aa\n{}^", " ".repeat(30));
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_command_error_keeps_command_text() {
        let err = CommandError::NotFound {
            command: "bar".to_string(),
        };
        assert_eq!(err.command(), "bar");
        assert_eq!(err.to_string(), "command not found: bar");

        let err: CommandError =
            SyntaxError::new("foo \"x", LexingError::DoubleQuoteExpected, 6).into();
        assert_eq!(err.command(), "foo \"x");
    }

    #[test]
    fn test_invocation_error_shows_cause_chain() {
        let cause = anyhow::anyhow!("disk full").context("saving notes");
        let err = CommandError::Invocation {
            command: "save".to_string(),
            error: cause,
        };
        assert_eq!(err.to_string(), "operation failed: saving notes: disk full");
    }
}
