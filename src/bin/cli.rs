use cqlc::{
    config::{ConfigError, Dialect},
    lang::{tokens::Token, CompileError, Compiler, ErrorKind},
    Node,
};

use clap::{Args, Parser, Subcommand};
use colored::*;
use human_panic::setup_panic;
use serde::Serialize;

use std::{error::Error, path::PathBuf, process::exit};

#[derive(Parser, Debug)]
#[command(about, version)]
struct Arguments {
    #[command(subcommand)]
    command: Command,

    /// Print intermediate data structures
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to dialect description file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read CQL text from file instead of the command line
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks that text is a valid filter
    Check(Source),

    /// Prints the parsed tree
    Parse {
        #[command(flatten)]
        source: Source,

        /// Parse a value expression instead of a filter
        #[arg(short, long)]
        expression: bool,

        /// Print the tree as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Prints text in canonical form
    Format {
        #[command(flatten)]
        source: Source,

        /// Parse a value expression instead of a filter
        #[arg(short, long)]
        expression: bool,
    },
}

#[derive(Args, Debug)]
struct Source {
    /// CQL text
    cql: Option<String>,
}

enum Parsed {
    Filter(cqlc::Filter),
    Expression(cqlc::Expression),
}

impl Parsed {
    fn node(&self) -> Node<'_> {
        match self {
            Parsed::Filter(filter) => filter.into(),
            Parsed::Expression(expression) => expression.into(),
        }
    }
}

fn init_logger(debug: bool) {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", if debug { "debug" } else { "info" });
    }
    pretty_env_logger::init();
}

fn main() {
    setup_panic!();

    let args = Arguments::parse();
    init_logger(args.debug);

    let mut eprint = ErrorPrinter::new();

    let dialect = match &args.config {
        Some(path) => match Dialect::load(path) {
            Ok(dialect) => dialect,
            Err(err) => {
                eprint.config_error(&err);
                exit(1);
            },
        },
        None => Dialect::default(),
    };
    let compiler = Compiler::new(&dialect);

    match &args.command {
        Command::Check(source) => {
            let src = read_source(&mut eprint, source, &args);
            parse(&mut eprint, &compiler, &src, false, args.debug);
            println!("{}", "Filter is valid".bold().green());
        },
        Command::Parse { source, expression, json } => {
            let src = read_source(&mut eprint, source, &args);
            let parsed = parse(&mut eprint, &compiler, &src, *expression, args.debug);

            if *json {
                let text = match &parsed {
                    Parsed::Filter(filter) => to_json(filter),
                    Parsed::Expression(expression) => to_json(expression),
                };
                match text {
                    Ok(text) => println!("{}", text),
                    Err(err) => {
                        eprint.error(&err.to_string());
                        exit(1);
                    },
                }
            } else {
                match &parsed {
                    Parsed::Filter(filter) => println!("{:#?}", filter),
                    Parsed::Expression(expression) => println!("{:#?}", expression),
                }
            }
        },
        Command::Format { source, expression } => {
            let src = read_source(&mut eprint, source, &args);
            let parsed = parse(&mut eprint, &compiler, &src, *expression, args.debug);
            println!("{}", compiler.write(parsed.node()));
        },
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn read_source(eprint: &mut ErrorPrinter, source: &Source, args: &Arguments) -> String {
    match (&source.cql, &args.file) {
        (Some(cql), None) => cql.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(src) => src,
            Err(err) => {
                eprint.error(&format!("unable to read {}: {}", path.display(), err));
                exit(1);
            },
        },
        (Some(_), Some(_)) => {
            eprint.error("CQL text and --file cannot be used together");
            exit(1);
        },
        (None, None) => {
            eprint.error("no CQL text given, pass it as an argument or with --file");
            exit(1);
        },
    }
}

fn parse(eprint: &mut ErrorPrinter, compiler: &Compiler, src: &str, expression: bool, debug: bool) -> Parsed {
    eprint.set_src(src);

    if debug {
        match compiler.tokenize(src) {
            Ok(tokens) => print_tokens(&tokens),
            Err(err) => {
                eprint.compile_error(&err);
                exit(1);
            },
        }
    }

    let parsed = if expression {
        compiler.parse_expression(src).map(Parsed::Expression)
    } else {
        compiler.parse_filter(src).map(Parsed::Filter)
    };

    match parsed {
        Ok(parsed) => parsed,
        Err(err) => {
            eprint.compile_error(&err);
            exit(1);
        },
    }
}

fn print_tokens(tokens: &[Token]) {
    println!("{}", "Tokens:".bold());
    tokens.iter().for_each(|t| println!("{:?}", t));
    println!();
}

struct ErrorPrinter {
    src: Option<String>,
}

impl ErrorPrinter {
    fn new() -> ErrorPrinter {
        ErrorPrinter { src: None }
    }

    fn set_src(&mut self, src: &str) {
        self.src = Some(src.to_string());
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}{}", "error: ".bold().red(), msg.bold());
    }

    fn caused_by(&mut self, mut source: Option<&(dyn Error + 'static)>) {
        while let Some(err) = source {
            eprintln!("{}{}", "caused by: ".bold().dimmed(), err);
            source = err.source();
        }
    }

    fn error_pos(&mut self, msg: &str, line: usize, column: usize) {
        if let Some(src_line) = self.src.as_ref().and_then(|src| src.lines().nth(line - 1)) {
            let line_str = line.to_string();
            let line_prefix = format!(
                "{}{}{}",
                "line ".bold().dimmed(),
                line_str.bold().dimmed(),
                ":  ".bold().dimmed(),
            );

            eprintln!("{}{}", &line_prefix, src_line.trim());

            let diff = src_line.chars().count() - src_line.trim_start().chars().count();
            let pos_offset = (column - 1).saturating_sub(diff) + line_str.len() + 5 + 3;
            eprintln!("{}{}", " ".repeat(pos_offset), "^".yellow());
        }

        self.error(msg);
    }

    fn compile_error(&mut self, error: &CompileError) {
        let kind = match error.kind() {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Internal => "internal",
        };
        let msg = format!("{} error: {}", kind, error.message());

        match error.position() {
            Some(pos) => self.error_pos(&msg, pos.line, pos.column),
            None => self.error(&msg),
        }

        self.caused_by(error.source());
    }

    fn config_error(&mut self, error: &ConfigError) {
        self.error(&error.to_string());
        self.caused_by(error.source());
    }
}
