use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use slif::{gen_parser, ActionRegistry, ParseOptions, Value};

const GRAMMAR: &str = r"
    lexeme default = latm => 1
    :discard ~ ws

    expr ::= num action => num
           | '(' expr ')' assoc => group action => parens
           | name '(' expr ')' assoc => group action => call
          || expr '^' expr assoc => right action => pow
          || '-' expr action => neg
          || expr '*' expr action => mul
           | expr '/' expr action => div
           | expr '%' expr action => rem
          || expr '+' expr action => add
           | expr '-' expr action => sub

    num ~ digits | digits '.' digits
    digits ~ [0-9]+
    name ~ [a-z_]+
    ws ~ [\s]+
";

#[derive(ClapParser, Debug)]
#[command(version, about = "Calculator driven by a SLIF grammar", long_about = None)]
struct Args {
    /// Log lexemes accepted, rejected and discarded
    #[arg(long)]
    trace_terminals: bool,

    /// Log the value computed for each rule
    #[arg(long)]
    trace_values: bool,

    /// Give up on inputs that need more Earley items than this
    #[arg(long)]
    max_items: Option<usize>,

    /// Expression to evaluate, a REPL is started when missing
    expr: Vec<String>,
}

fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

fn actions<'a>() -> ActionRegistry<'a, Value> {
    ActionRegistry::<'a, Value>::new()
        .bind("num", |_, args| Value::from(num(&args[0])))
        .bind("parens", |_, mut args| args.remove(1))
        .bind("call", |_, args| {
            let x = num(&args[2]);
            match args[0].as_str() {
                Some("sqrt") => Value::from(x.sqrt()),
                Some("sin") => Value::from(x.sin()),
                Some("cos") => Value::from(x.cos()),
                Some("exp") => Value::from(x.exp()),
                Some("ln") => Value::from(x.ln()),
                Some("abs") => Value::from(x.abs()),
                _ => Value::Undef,
            }
        })
        .bind("pow", |_, args| Value::from(num(&args[0]).powf(num(&args[2]))))
        .bind("neg", |_, args| Value::from(-num(&args[1])))
        .bind("mul", |_, args| Value::from(num(&args[0]) * num(&args[2])))
        .bind("div", |_, args| Value::from(num(&args[0]) / num(&args[2])))
        .bind("rem", |_, args| Value::from(num(&args[0]) % num(&args[2])))
        .bind("add", |_, args| Value::from(num(&args[0]) + num(&args[2])))
        .bind("sub", |_, args| Value::from(num(&args[0]) - num(&args[2])))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.trace_terminals || args.trace_values {
        logger.filter_module("slif::trace", log::LevelFilter::Trace);
    }
    logger.init();

    let mut options = ParseOptions::default()
        .with_trace_terminals(args.trace_terminals)
        .with_trace_values(args.trace_values);
    if let Some(max_items) = args.max_items {
        options = options.with_max_items(max_items);
    }
    let parser = gen_parser(GRAMMAR, "slifcalc", actions(), options)?;

    if !args.expr.is_empty() {
        let input = args.expr.join(" ");
        match parser(&input) {
            Err(e) => println!("Parse err: {}", e),
            Ok(value) => println!("{}", value),
        }
        return Ok(());
    }

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        match rl.readline("~> ") {
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match parser(&line) {
                    Err(e) => println!("Parse err: {}", e),
                    Ok(value) => println!("{}", value),
                }
            }
        }
    }
}
