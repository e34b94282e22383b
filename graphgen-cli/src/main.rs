//! # graphgen CLI
//!
//! Plot graphs from plain-language questions.
//!
//! Usage:
//!   graphgen <QUESTION>...
//!   graphgen search <QUESTION>... --x-unit s --y-unit m -o graph.svg
//!   graphgen clear-cache
//!   graphgen interactive
//!
//! Examples:
//!   graphgen "points (1, 2), (2, 4), (3, 8)"
//!   graphgen search "y = 3x^2 - 2" --x-unit s --y-unit m
//!   graphgen search "second equation of motion" -p u=0 -p a=9.81
//!   graphgen --provider gemini interactive
//!
//! A bare question whose first word is a subcommand name is read as that
//! subcommand. Put `--` in front to force a question:
//!   graphgen -- interactive plot of x

use clap::{Args, Parser, Subcommand};
use graphgen_core::{AnyProvider, Bindings, ProviderType, ResultCache};
use graphgen_error::{Error, Result};
use graphgen_session::{AppConfig, SearchRequest, Session, CACHE_CLEARED};
use inquire::error::InquireError;
use inquire::{Select, Text};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "graphgen")]
#[command(author, version, about = "graphgen - plot graphs from plain-language questions")]
#[command(after_help = "A question starting with a subcommand name needs a leading `--`:\n  graphgen -- search for a parabola")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to plot (when not using subcommands)
    #[command(flatten)]
    search: SearchArgs,

    /// Config file (default: ./graphgen.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Oracle to use: openai, anthropic, gemini or local
    #[arg(long, global = true)]
    provider: Option<ProviderType>,

    /// Model name, overriding the provider default
    #[arg(long, global = true)]
    model: Option<String>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors and results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot a question and explain it
    Search(SearchArgs),
    /// Remove memoised explanations
    ClearCache,
    /// Fill in the question form repeatedly
    Interactive,
}

#[derive(Args, Default)]
struct SearchArgs {
    /// The question, e.g. "points (1,2), (3,4)" or "y = x^2"
    question: Vec<String>,

    /// Unit shown on the X axis
    #[arg(long, default_value = "units")]
    x_unit: String,

    /// Unit shown on the Y axis
    #[arg(long, default_value = "units")]
    y_unit: String,

    /// Where to write the SVG (default from config: graph.svg)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Value for a symbol other than x, e.g. -p a=9.81
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, f64)>,
}

impl SearchArgs {
    fn request(&self) -> SearchRequest {
        let bindings: Bindings = self.params.iter().cloned().collect();
        SearchRequest::new(self.question.join(" "))
            .with_units(&self.x_unit, &self.y_unit)
            .with_bindings(bindings)
    }
}

fn parse_param(text: &str) -> std::result::Result<(String, f64), String> {
    Bindings::parse_assignment(text).map_err(|e| e.message().to_string())
}

fn init_logging(log_file: &Path, verbose: bool, quiet: bool) {
    let term_level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Error, Config::default(), file)),
        Err(e) => eprintln!("Warning: cannot open log file {}: {}", log_file.display(), e),
    }

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: logger already initialised");
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::discover(cli.config.as_deref())?;
    if let Some(kind) = cli.provider {
        config.provider.kind = kind;
    }
    if let Some(model) = &cli.model {
        config.provider.model = Some(model.clone());
    }
    Ok(config)
}

fn open_session(config: &AppConfig) -> Result<Session<AnyProvider>> {
    let provider_config = config.provider_config()?;
    let provider_name = provider_config.provider_type.to_string();
    let provider = AnyProvider::from_config(provider_config)
        .map_err(|e| graphgen_core::error::provider_failed(&provider_name, e))?;
    Session::from_app_config(provider, config)
}

/// Run one search and report it. Returns false when nothing was shown.
async fn run_search(
    session: &mut Session<AnyProvider>,
    request: &SearchRequest,
    output: &Path,
    config: &AppConfig,
    quiet: bool,
) -> bool {
    let outcome = match session.search(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e.user_report());
            return false;
        }
    };

    if !quiet {
        if let Some(shape) = &outcome.shape {
            println!("Understood as: {}", shape);
        }
    }

    let mut shown = false;
    match outcome.plot {
        Ok(figure) if figure.is_empty() => {
            if !quiet {
                println!("Nothing to plot.");
            }
        }
        Ok(figure) => {
            let figure = figure.with_size(config.output.width, config.output.height);
            match figure.save_svg(output) {
                Ok(()) => {
                    println!("Graph saved to {}", output.display());
                    shown = true;
                }
                Err(e) => {
                    log::error!("Saving graph failed: {}", e);
                    eprintln!("Error: {}", e.user_report());
                }
            }
        }
        Err(e) => eprintln!("Error: {}", e.user_report()),
    }

    match outcome.explanation {
        Ok(text) => {
            if !quiet {
                println!("\n--- Explanation ---\n");
            }
            println!("{}", text);
            shown = true;
        }
        Err(e) => eprintln!("Error: {}", e.user_report()),
    }

    shown
}

fn clear_cache(config: &AppConfig) -> Result<()> {
    if let Some(dir) = &config.cache.dir {
        ResultCache::file(dir)?.clear()?;
    }
    println!("{}", CACHE_CLEARED);
    Ok(())
}

#[derive(Clone, Copy)]
enum Action {
    Search,
    ClearCache,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search => write!(f, "Search"),
            Action::ClearCache => write!(f, "Clear Cache"),
            Action::Quit => write!(f, "Quit"),
        }
    }
}

fn is_cancel(err: &InquireError) -> bool {
    matches!(
        err,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// The question form. `None` when the user backs out.
fn ask_request(last_units: &(String, String)) -> std::result::Result<Option<SearchRequest>, InquireError> {
    let ask = |prompt: std::result::Result<String, InquireError>| match prompt {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_cancel(&e) => Ok(None),
        Err(e) => Err(e),
    };

    let Some(question) = ask(
        Text::new("Question:")
            .with_help_message("e.g. points (1,2), (3,4) or y = 2x + 3")
            .prompt(),
    )?
    else {
        return Ok(None);
    };
    let Some(x_unit) = ask(Text::new("X-axis unit:").with_default(&last_units.0).prompt())? else {
        return Ok(None);
    };
    let Some(y_unit) = ask(Text::new("Y-axis unit:").with_default(&last_units.1).prompt())? else {
        return Ok(None);
    };

    Ok(Some(SearchRequest::new(question).with_units(&x_unit, &y_unit)))
}

async fn run_interactive(session: &mut Session<AnyProvider>, output: &Path, config: &AppConfig, quiet: bool) {
    let mut last_units = ("units".to_string(), "units".to_string());

    loop {
        let action = match Select::new(
            "What next?",
            vec![Action::Search, Action::ClearCache, Action::Quit],
        )
        .prompt()
        {
            Ok(action) => action,
            Err(e) if is_cancel(&e) => break,
            Err(e) => {
                log::error!("Prompt failed: {}", e);
                break;
            }
        };

        match action {
            Action::Search => match ask_request(&last_units) {
                Ok(Some(request)) => {
                    last_units = (request.units.x.clone(), request.units.y.clone());
                    run_search(session, &request, output, config, quiet).await;
                    println!();
                }
                Ok(None) => continue,
                Err(e) => {
                    log::error!("Prompt failed: {}", e);
                    break;
                }
            },
            Action::ClearCache => match session.clear_cache() {
                Ok(()) => println!("{}", CACHE_CLEARED),
                Err(e) => eprintln!("Error: {}", e.user_report()),
            },
            Action::Quit => break,
        }
    }
}

fn fail(err: &Error) -> ! {
    log::error!("{}", err);
    eprintln!("Error: {}", err.user_report());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&AppConfig::default().log.file, cli.verbose, cli.quiet);
            fail(&e);
        }
    };
    init_logging(&config.log.file, cli.verbose, cli.quiet);

    let search = match cli.command {
        Some(Commands::ClearCache) => {
            if let Err(e) = clear_cache(&config) {
                fail(&e);
            }
            return;
        }
        Some(Commands::Interactive) => {
            let mut session = open_session(&config).unwrap_or_else(|e| fail(&e));
            if !cli.quiet {
                println!("graphgen - plot graphs from plain-language questions\n");
            }
            run_interactive(&mut session, &config.output.path, &config, cli.quiet).await;
            return;
        }
        Some(Commands::Search(args)) => args,
        None => {
            if cli.search.question.is_empty() {
                eprintln!("Error: No question provided.");
                eprintln!("Usage: graphgen [OPTIONS] <QUESTION>...");
                eprintln!("       graphgen search <QUESTION>... [--x-unit U] [--y-unit U] [-o FILE]");
                eprintln!("       graphgen clear-cache");
                eprintln!("       graphgen interactive");
                eprintln!("\nExamples:");
                eprintln!("  graphgen \"points (1,2), (3,4)\"");
                eprintln!("  graphgen search \"y = x^2\" --x-unit s --y-unit m");
                eprintln!("  graphgen --help");
                std::process::exit(1);
            }
            cli.search
        }
    };

    let mut session = open_session(&config).unwrap_or_else(|e| fail(&e));
    let output = search.output.clone().unwrap_or_else(|| config.output.path.clone());
    if !run_search(&mut session, &search.request(), &output, &config, cli.quiet).await {
        std::process::exit(1);
    }

    if cli.verbose {
        let usage = session.usage();
        log::debug!(
            "{} oracle call(s), {} tokens",
            usage.total_calls,
            usage.total_tokens()
        );
    }
}
