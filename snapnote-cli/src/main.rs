use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::CommandFactory;
use is_terminal::IsTerminal;
use snapnote::{BroadcastNotifier, LogNotifier, Notifier, StoreConfig};
use snapnote_cli::cli::{Cli, Commands};
use snapnote_cli::context::CliContext;
use snapnote_cli::error::{handle_cli_result, CliResult};
use snapnote_cli::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use snapnote_cli::{export, logging, note, report, serve, settings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Fast path for help
    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Failed to print help: {}", e);
            process::exit(EXIT_ERROR);
        }
        process::exit(EXIT_SUCCESS);
    };

    let is_serve = matches!(command, Commands::Serve);
    let piped_serve = is_serve && !std::io::stdin().is_terminal();
    let level = logging::log_level(cli.quiet, cli.debug, cli.verbose, piped_serve);

    if piped_serve {
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| StoreConfig::new().data_dir);
        logging::init_logging(level, Some(&logging::log_file_path(&data_dir)));
    } else {
        logging::init_logging(level, None);
    }

    let exit_code = handle_cli_result(run(command, cli.data_dir).await);
    process::exit(exit_code);
}

async fn run(command: Commands, data_dir: Option<PathBuf>) -> CliResult<()> {
    match command {
        Commands::Serve => {
            tracing::info!("Starting router on stdin/stdout");
            let notifier = BroadcastNotifier::default();
            let context = CliContext::new(data_dir, Arc::new(notifier.clone())).await?;
            serve::run_serve(context, notifier).await
        }
        Commands::Note { subcommand } => {
            note::handle_note_command(subcommand, &open(data_dir).await?).await
        }
        Commands::Domains { format } => report::run_domains(&open(data_dir).await?, format).await,
        Commands::Stats { rebuild, format } => {
            report::run_stats(&open(data_dir).await?, rebuild, format).await
        }
        Commands::Export { output } => export::run_export(&open(data_dir).await?, output).await,
        Commands::Settings { subcommand } => {
            settings::handle_settings_command(subcommand, &open(data_dir).await?).await
        }
        Commands::Actions { format } => report::run_actions(&open(data_dir).await?, format),
    }
}

/// Store for one-shot commands; notifications only reach the log
async fn open(data_dir: Option<PathBuf>) -> CliResult<CliContext> {
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    CliContext::new(data_dir, notifier).await
}
