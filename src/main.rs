use clap::{Parser as ClapParser, Subcommand};
use sorrel::cli::{self, CliError, EvalOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "sorrel")]
#[command(about = "Sorrel - a small expression language over JSON-like values")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a set of variables
    Eval {
        /// The expression to evaluate
        expression: String,

        /// Variables as a JSON object (reads from stdin if not provided)
        #[arg(short, long)]
        vars: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Also print the variable environment after assignments
        #[arg(long)]
        show_vars: bool,
    },

    /// Validate an expression's syntax
    Check {
        /// The expression to check
        expression: String,
    },

    /// Print an expression's canonical form
    Fmt {
        /// The expression to format
        expression: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            expression,
            vars,
            pretty,
            show_vars,
        } => run_eval(expression, vars, pretty, show_vars),
        Commands::Check { expression } => match cli::execute_check(&expression) {
            Ok(()) => {
                println!("Syntax is valid");
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Fmt { expression } => match cli::execute_fmt(&expression) {
            Ok(code) => {
                println!("{}", code);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_eval(
    expression: String,
    vars: Option<String>,
    pretty: bool,
    show_vars: bool,
) -> Result<(), CliError> {
    let vars = match vars {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            if buffer.trim().is_empty() {
                None
            } else {
                Some(buffer)
            }
        }
        None => None,
    };

    let options = EvalOptions { expression, vars };
    let outcome = cli::execute_eval(&options)?;

    let to_text = |v: &serde_json::Value| {
        if pretty {
            serde_json::to_string_pretty(v)
        } else {
            serde_json::to_string(v)
        }
    };

    println!("{}", to_text(&outcome.result)?);
    if show_vars {
        println!("{}", to_text(&outcome.variables)?);
    }
    Ok(())
}
