//! memscan - process memory indicator scanner
//!
//! Main entry point: initializes logging, resolves configuration, and
//! dispatches subcommands.

use clap::Parser;
use tracing::{debug, error, Level};

use memscan::cli::{Args, Commands, LogLevel};
use memscan::commands::{command_check, command_scan, command_validate};
use memscan::config::{resolve_config, show_config, validate_effective_config};
use memscan::startup_checks;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    setup_logging(&args);

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    // Configure parallel processing
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }

    match args.command {
        Some(Commands::Scan {
            params,
            only_found,
            format,
        }) => {
            if let Err(e) = startup_checks::validate_requirements() {
                error!("Startup validation failed: {e}");
                return Err(e.into());
            }
            command_scan(params, only_found, format, &config)
        }
        Some(Commands::Validate { params }) => command_validate(params),
        Some(Commands::Check) => command_check(&config),
        None => {
            eprintln!("No command given; see --help");
            std::process::exit(2);
        }
    }
}
