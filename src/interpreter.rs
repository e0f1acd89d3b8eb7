use crate::command::{Arguments, Catalog, CommandTarget, Operation};
use crate::error::{ArgumentError, CommandError, RegistryError, SyntaxError};
use crate::lexer;
use crate::matcher;
use crate::parser::{self, NamingConvention};
use crate::registry::{Converter, ConverterRegistry};
use crate::types::{Value, ValueType};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// The printable shape of an operation: `name(i32, Option<String>...)`.
///
/// Signatures order by name, then by parameter type names pairwise, with a shorter
/// parameter list before any longer list it is a prefix of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Signature {
    name: String,
    parameters: Vec<String>,
    variadic: bool,
}

impl Signature {
    pub fn new(name: &str, parameters: Vec<String>, variadic: bool) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            variadic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name, self.parameters.join(", "))?;
        if self.variadic {
            f.write_str("...")?;
        }
        f.write_str(")")
    }
}

/// An operation together with the arguments converted for it.
pub struct Match<T> {
    operation: Operation<T>,
    arguments: Vec<Value>,
}

impl<T> Match<T> {
    pub fn operation(&self) -> &Operation<T> {
        &self.operation
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

impl<T> fmt::Debug for Match<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("operation", &self.operation.signature().to_string())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// What a command line resolves to, before anything is invoked.
pub enum Resolution<T> {
    /// The command was blank.
    Blank,
    Unique(Match<T>),
    NotFound,
    /// Tied matches, sorted by signature.
    Ambiguous(Vec<Signature>),
}

impl<T> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Blank => f.write_str("Blank"),
            Resolution::Unique(m) => f.debug_tuple("Unique").field(m).finish(),
            Resolution::NotFound => f.write_str("NotFound"),
            Resolution::Ambiguous(signatures) => f.debug_tuple("Ambiguous").field(signatures).finish(),
        }
    }
}

/// Resolves command lines against the operations of a target and runs them.
///
/// Example
/// ```
/// use console_dispatch::{Catalog, Interpreter, Operation, Value, ValueType};
///
/// struct Greeter;
///
/// let catalog = Catalog::new().with(Operation::new(
///     "greet",
///     [ValueType::of::<String>()],
///     |_: &mut Greeter, mut args| Ok(Some(Value::of(format!("hello {}", args.next::<String>()?)))),
/// ));
/// let mut console = Interpreter::with_catalog(Greeter, catalog);
/// let result = console.execute("greet world").unwrap().unwrap();
/// assert_eq!(result.downcast::<String>().ok().as_deref(), Some("hello world"));
/// ```
pub struct Interpreter<T> {
    target: T,
    catalog: Catalog<T>,
    registry: Arc<ConverterRegistry>,
    naming: NamingConvention,
}

impl<T: CommandTarget> Interpreter<T> {
    /// An interpreter over the target's own catalog, with the built-in converters.
    pub fn new(target: T) -> Self {
        Self::with_catalog(target, T::catalog())
    }
}

impl<T> Interpreter<T> {
    pub fn with_catalog(target: T, catalog: Catalog<T>) -> Self {
        Self {
            target,
            catalog,
            registry: Arc::new(ConverterRegistry::with_defaults()),
            naming: NamingConvention::default(),
        }
    }

    /// Uses `registry` instead of a private one, e.g. to share converters between consoles.
    pub fn with_registry(mut self, registry: Arc<ConverterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn add_converter(&self, converter: Arc<dyn Converter>) -> Result<(), RegistryError> {
        self.registry.register(converter)
    }

    pub fn remove_converter(&self, ty: &ValueType) -> Option<Arc<dyn Converter>> {
        self.registry.unregister(ty)
    }

    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog<T> {
        &self.catalog
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Finds the operation a command line refers to without running it.
    ///
    /// Every (candidate, operation) pairing is tried. When several bind, the first wins
    /// only if its name is strictly longer than the second's; otherwise they are all
    /// reported as ambiguous.
    pub fn resolve(&self, command: &str) -> Result<Resolution<T>, SyntaxError> {
        let words = lexer::split_into_words(command)?;
        if words.is_empty() {
            return Ok(Resolution::Blank);
        }

        let mut matches = Vec::new();
        for candidate in parser::candidates_for(&words, self.naming) {
            for operation in self.catalog.operations_named(&candidate.name) {
                if let Some(arguments) = matcher::bind(&candidate, operation, self.registry.as_ref()) {
                    matches.push(Match {
                        operation: operation.clone(),
                        arguments,
                    });
                }
            }
        }

        let resolution = pick(matches);
        match &resolution {
            Resolution::Unique(m) => tracing::debug!(command, operation = %m.operation.signature(), "resolved"),
            Resolution::Ambiguous(signatures) => tracing::debug!(command, ?signatures, "ambiguous"),
            _ => tracing::debug!(command, "no matching operation"),
        }
        Ok(resolution)
    }

    /// Resolves and runs a command line.
    ///
    /// A panic in a converter or in the operation is caught and reported as
    /// [`CommandError::Execution`]; the interpreter stays usable afterwards.
    ///
    /// # Arguments
    /// * `command` - The command line, e.g. `set value 3`.
    ///
    /// # Returns
    /// `Result<Option<Value>, CommandError>`: The operation's result, `None` for blank input
    /// and for operations without a result, or the reason nothing was run or the run failed.
    pub fn execute(&mut self, command: &str) -> Result<Option<Value>, CommandError> {
        let resolution = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(command)))
            .map_err(|payload| crashed(command, payload))??;
        match resolution {
            Resolution::Blank => Ok(None),
            Resolution::NotFound => Err(CommandError::NotFound {
                command: command.to_string(),
            }),
            Resolution::Ambiguous(signatures) => Err(CommandError::Ambiguous {
                command: command.to_string(),
                signatures,
            }),
            Resolution::Unique(m) => self.invoke(command, m),
        }
    }

    fn invoke(&mut self, command: &str, m: Match<T>) -> Result<Option<Value>, CommandError> {
        let invoker = m.operation.invoker();
        let target = &mut self.target;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| invoker(target, Arguments::new(m.arguments))))
            .map_err(|payload| crashed(command, payload))?;
        outcome.map_err(|error| {
            if error.is::<ArgumentError>() {
                tracing::warn!(command, operation = %m.operation.signature(), "operation disagrees with its declaration: {}", error);
                CommandError::Execution {
                    command: command.to_string(),
                    reason: error.to_string(),
                }
            } else {
                tracing::warn!(command, "operation failed: {:#}", error);
                CommandError::Invocation {
                    command: command.to_string(),
                    error,
                }
            }
        })
    }

    /// Reads commands from the terminal until Ctrl-C or Ctrl-D, printing each outcome.
    pub fn repl(&mut self, prompt: &str) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    match self.execute(&line) {
                        Ok(Some(value)) => println!("{:?}", value),
                        Ok(None) => {}
                        Err(err) => eprintln!("{}", err),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

fn crashed(command: &str, payload: Box<dyn Any + Send>) -> CommandError {
    let reason = match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "panicked".to_string(), |message| message.to_string()),
    };
    tracing::error!(command, "panic while running command: {}", reason);
    CommandError::Execution {
        command: command.to_string(),
        reason,
    }
}

fn pick<T>(mut matches: Vec<Match<T>>) -> Resolution<T> {
    if matches.len() > 1 {
        let first = matches[0].operation.name().chars().count();
        let second = matches[1].operation.name().chars().count();
        // longer names are more specific
        if first > second {
            matches.truncate(1);
        }
    }

    match matches.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Unique(matches.remove(0)),
        _ => {
            let mut signatures: Vec<Signature> = matches.iter().map(|m| m.operation.signature()).collect();
            signatures.sort();
            Resolution::Ambiguous(signatures)
        }
    }
}
