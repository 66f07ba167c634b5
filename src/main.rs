use clap::{Parser as ClapParser, Subcommand};
use clove_nested::cli::{self, CheckOptions, CheckResult, CliError, MappingSource};
use clove_nested::output::to_json_string;
use clove_nested::context::{DEFAULT_MAX_CLAUSE_DEPTH, DEFAULT_MAX_NESTED_DEPTH};
use clove_nested::{CompileOptions, Resolution};
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "clove-nested")]
#[command(about = "clove-nested - compile nested document-search queries against a mapping")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
#[group(required = false, multiple = false)]
struct MappingArgs {
    /// Mapping JSON
    #[arg(short, long)]
    mapping: Option<String>,

    /// File containing the mapping JSON
    #[arg(long)]
    mapping_file: Option<PathBuf>,
}

impl MappingArgs {
    fn source(self) -> Option<MappingSource> {
        match (self.mapping, self.mapping_file) {
            (Some(inline), _) => Some(MappingSource::Inline(inline)),
            (None, Some(path)) => Some(MappingSource::File(path)),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print the compiled plan
    Check {
        /// The query JSON (reads from stdin if not provided)
        query: Option<String>,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Resolve content that precedes its path only when it is first needed
        #[arg(long)]
        lazy: bool,

        /// Deepest allowed chain of nested clauses
        #[arg(long, default_value_t = DEFAULT_MAX_NESTED_DEPTH)]
        max_depth: usize,

        /// Deepest allowed chain of query objects
        #[arg(long, default_value_t = DEFAULT_MAX_CLAUSE_DEPTH)]
        max_clause_depth: usize,

        /// Only validate JSON structure, don't compile
        #[arg(long)]
        syntax_only: bool,
    },

    /// List the nested collection paths of a mapping
    Paths {
        #[command(flatten)]
        mapping: MappingArgs,
    },
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            query,
            mapping,
            pretty,
            lazy,
            max_depth,
            max_clause_depth,
            syntax_only,
        } => {
            let compile = CompileOptions {
                resolution: if lazy {
                    Resolution::Lazy
                } else {
                    Resolution::Eager
                },
                max_nested_depth: max_depth,
                max_clause_depth,
            };
            run_check(query, mapping.source(), compile, pretty, syntax_only)
        }
        Commands::Paths { mapping } => {
            cli::list_nested_paths(mapping.source().as_ref()).map(|paths| {
                for path in paths {
                    println!("{}", path);
                }
            })
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    query: Option<String>,
    mapping: Option<MappingSource>,
    compile: CompileOptions,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let query = match query {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        query,
        mapping,
        compile,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Compiled(query) => println!("{}", to_json_string(&query, pretty)),
    }
    Ok(())
}
