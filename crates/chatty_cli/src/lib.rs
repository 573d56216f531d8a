mod command;
pub mod config;
pub mod error;
mod printer;
mod repl;
mod session;
mod store;

use std::{
    env,
    io::{self, IsTerminal as _},
    path::PathBuf,
    process::ExitCode,
};

use chatty_client::Client;
use clap::{
    ArgAction, Parser,
    builder::{BoolValueParser, TypedValueParser as _},
};
use config::Config;
use error::Result;
use session::Session;
use store::Store;
use tokio::io::BufReader;
use tracing::{debug, error, trace};

/// Chat with OpenAI-compatible models from the terminal.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten, next_help_heading = "Global Options")]
    globals: Globals,

    #[command(flatten, next_help_heading = "Chat Options")]
    options: ChatOptions,

    /// Send a single prompt and exit.
    ///
    /// Starts an interactive session when omitted.
    #[arg(value_name = "PROMPT")]
    prompt: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct Globals {
    /// Path to the configuration file.
    ///
    /// Defaults to `config.toml` in the user configuration directory.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase verbosity of logging.
    ///
    /// Can be specified multiple times to increase verbosity.
    ///
    /// Defaults to printing "error" messages. For each increase in verbosity,
    /// the log level is set to "warn", "info", "debug", and "trace"
    /// respectively.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging, and errors.
    #[arg(short, long)]
    quiet: bool,

    #[arg(
        long = "no-color",
        alias = "no-colors",
        default_value_t = false,
        value_parser = BoolValueParser::new().map(|v| !v),
        help = "Disable color in the output.",
    )]
    colors: bool,
}

#[derive(Debug, clap::Args)]
pub struct ChatOptions {
    /// The model to chat with.
    #[arg(short, long)]
    model: Option<String>,

    #[arg(
        long = "no-stream",
        default_value_t = false,
        value_parser = BoolValueParser::new().map(|v| !v),
        help = "Wait for the complete reply instead of streaming it."
    )]
    stream: bool,

    #[arg(
        long = "no-markdown",
        default_value_t = false,
        value_parser = BoolValueParser::new().map(|v| !v),
        help = "Disable the markdown re-render of replies."
    )]
    markdown: bool,
}

impl Globals {
    /// Whether errors and logs written to stderr are styled.
    fn stderr_colors(&self, is_terminal: bool) -> bool {
        self.colors && is_terminal
    }
}

impl Cli {
    /// Apply command-line overrides to the [`Config`].
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.options.model {
            config.model.name.clone_from(model);
        }

        config.model.stream &= self.options.stream;
        config.ui.markdown &= self.options.markdown;
        config.ui.colors &= self.globals.colors;
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let quiet = cli.globals.quiet;
    let colors = cli.globals.stderr_colors(io::stderr().is_terminal());

    configure_logging(cli.globals.verbose, quiet, colors);
    trace!(arguments = ?cli, "Starting CLI run.");

    match run_inner(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if !quiet {
                _ = repl::report(&mut io::stderr(), &error, colors);
            }

            ExitCode::FAILURE
        }
    }
}

async fn run_inner(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if !io::stdout().is_terminal() {
        debug!("Output is not a terminal. Disabling colors.");
        config.ui.colors = false;
    }

    let client = Client::new(&config.api.key, &config.api.url)?;
    let mut session = Session::new(client, &config);
    if let Some(store) = open_store(&config) {
        session = session.with_store(store);
    }
    let mut stdout = io::stdout();

    if cli.prompt.is_empty() {
        return repl::run(
            &mut session,
            BufReader::new(tokio::io::stdin()),
            &mut stdout,
            &mut io::stderr(),
            config.ui.colors,
        )
        .await;
    }

    session.send(&cli.prompt.join(" "), &mut stdout).await?;

    Ok(())
}

/// Open the session store, or `None` if conversations are not saved.
fn open_store(config: &Config) -> Option<Store> {
    let Some(path) = config.storage.database_path() else {
        debug!("Persistence disabled.");
        return None;
    };

    match Store::open(&path) {
        Ok(store) => Some(store),
        Err(error) => {
            error!(
                %error,
                db = %path.display(),
                "Failed to open session store. Conversations will not be saved."
            );
            None
        }
    }
}

/// Load the configuration, with environment and command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.globals.config.as_deref())?;
    config.apply_env(|key| env::var(key).ok());
    cli.apply(&mut config);
    config.validate()?;

    Ok(config)
}

fn configure_logging(verbose: u8, quiet: bool, ansi: bool) {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::fmt;

    let mut level = match verbose {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    if quiet {
        level = LevelFilter::OFF;
    }

    let mut filter = vec!["off".to_owned()];
    for krate in ["cli", "client", "md", "stream"] {
        filter.push(format!("chatty_{krate}={level}"));
    }

    let format = fmt::format().with_target(false).compact();

    if level < LevelFilter::DEBUG {
        tracing_subscriber::fmt()
            .event_format(format)
            .without_time()
            .with_ansi(ansi)
            .with_writer(io::stderr)
            .with_env_filter(filter.join(","))
            .init();
    } else {
        tracing_subscriber::fmt()
            .event_format(format)
            .with_ansi(ansi)
            .with_writer(io::stderr)
            .with_env_filter(filter.join(","))
            .init();
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
