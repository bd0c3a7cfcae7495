mod check_commands;
mod dump_commands;
mod run_commands;

use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chattext", about = "chattext: stream text files into Twitch chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery of ./chattext.toml and friends).
    #[arg(long, global = true, env = "CHATTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Connect to Twitch and serve chat commands (default).
    Run,
    /// Preview a dump on stdout using the configured limits.
    Dump {
        /// Text file to stream.
        file: PathBuf,
        /// Seed for supplemental line draws, for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Cancel `token` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                token.cancel();
            },
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chattext starting");

    match cli.command {
        Some(Commands::Check { verbose }) => check_commands::check(cli.config.as_deref(), verbose),
        Some(Commands::Dump { ref file, seed }) => {
            let config = chattext_config::load_or_discover(cli.config.as_deref())?;
            dump_commands::dump_to_console(&config, file, seed).await
        },
        None | Some(Commands::Run) => {
            let config = chattext_config::load_or_discover(cli.config.as_deref())?;
            run_commands::run(&config).await
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["chattext"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn parses_dump_with_seed_and_globals() {
        let cli = Cli::try_parse_from([
            "chattext",
            "dump",
            "book.txt",
            "--seed",
            "7",
            "--config",
            "bot.toml",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Dump {
                file: PathBuf::from("book.txt"),
                seed: Some(7),
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));
        assert!(cli.json_logs);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
