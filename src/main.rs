use anyhow::Context;
use argh::FromArgs;
use console_dispatch::{Catalog, Constants, Interpreter, NamingConvention, Operation, Value, ValueType};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// An interactive console over a small workbench of operations.
/// Type `help` at the prompt to list them.
struct Options {
    #[argh(option, default = "String::from(\"> \")")]
    /// prompt shown before every line.
    prompt: String,

    #[argh(option)]
    /// how multi-word commands map to operation names: camel (default) or snake.
    naming: Option<NamingConvention>,

    #[argh(option)]
    /// log filter directives, e.g. `console_dispatch=trace`. Defaults to $RUST_LOG.
    log: Option<String>,

    #[argh(option, short = 'c')]
    /// run this command and exit instead of starting the interactive console; may be repeated.
    command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    Red,
    Green,
    Blue,
}

impl Constants for Color {
    const CONSTANTS: &'static [(&'static str, Self)] = &[("RED", Color::Red), ("GREEN", Color::Green), ("BLUE", Color::Blue)];
}

#[derive(Debug, Default)]
struct Workbench {
    value: i32,
    paint: Option<Color>,
}

fn workbench_catalog(naming: NamingConvention) -> Catalog<Workbench> {
    let int = ValueType::primitive::<i64>();
    let text = ValueType::of::<String>();
    let color = ValueType::enum_of::<Color>();

    let catalog = Catalog::new()
        .with(Operation::variadic("echo", [], text, |_: &mut Workbench, mut args| {
            let words: Vec<String> = args
                .rest_opt::<String>()?
                .into_iter()
                .map(|w| w.unwrap_or_else(|| "null".to_string()))
                .collect();
            println!("{}", words.join(" "));
            Ok(None)
        }))
        .with(Operation::new("add", [int.clone(), int.clone()], |_: &mut Workbench, mut args| {
            let (a, b): (i64, i64) = (args.next()?, args.next()?);
            Ok(Some(Value::of(a.checked_add(b).context("overflow")?)))
        }))
        .with(Operation::variadic(naming.name_of(&["add", "all"]), [], int.clone(), |_: &mut Workbench, mut args| {
            let sum = args
                .rest::<i64>()?
                .into_iter()
                .try_fold(0_i64, |acc, n| acc.checked_add(n))
                .context("overflow")?;
            Ok(Some(Value::of(sum)))
        }))
        .with(Operation::new("divide", [int.clone(), int], |_: &mut Workbench, mut args| {
            let (a, b): (i64, i64) = (args.next()?, args.next()?);
            Ok(Some(Value::of(a.checked_div(b).context("division by zero")?)))
        }))
        .with(Operation::new(
            naming.name_of(&["set", "value"]),
            [ValueType::primitive::<i32>()],
            |bench: &mut Workbench, mut args| {
                bench.value = args.next()?;
                Ok(None)
            },
        ))
        .with(Operation::new("value", [], |bench: &mut Workbench, _| Ok(Some(Value::of(bench.value)))))
        .with(Operation::new("paint", [color.clone()], |bench: &mut Workbench, mut args| {
            bench.paint = args.next_opt()?;
            Ok(None)
        }))
        .with(Operation::new("color", [], move |bench: &mut Workbench, _| {
            Ok(bench.paint.map(|c| Value::new(&color, c)))
        }));

    let listing: Vec<String> = catalog.iter().map(|op| op.signature().to_string()).collect();
    catalog.with(Operation::new("help", [], move |_: &mut Workbench, _| {
        for line in &listing {
            println!("  {}", line);
        }
        Ok(None)
    }))
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();

    let filter = match &options.log {
        Some(directives) => EnvFilter::try_new(directives).context("invalid --log directives")?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let naming = options.naming.unwrap_or_default();
    let catalog = workbench_catalog(naming);
    tracing::debug!(operations = catalog.len(), ?naming, "workbench ready");
    let mut console = Interpreter::with_catalog(Workbench::default(), catalog).with_naming(naming);

    if !options.command.is_empty() {
        for command in &options.command {
            match console.execute(command) {
                Ok(Some(value)) => println!("{:?}", value),
                Ok(None) => {}
                Err(e) => anyhow::bail!("{}", e),
            }
        }
        return Ok(());
    }

    console.repl(&options.prompt).context("terminal error")?;
    Ok(())
}
