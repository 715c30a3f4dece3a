use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use ampt::config::Settings;
use ampt::listing::{list, ListOptions};
use ampt::{run, AppResult, Command};
use clap::{Parser, Subcommand};

/// Manage a profile's preset library while keeping Presets.db in step.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presets and folders
    Ls {
        #[arg(short, long)]
        recursive: bool,
        /// Print absolute paths instead of names
        #[arg(short = 'f', long = "fullpath")]
        full_path: bool,
        #[arg(long)]
        json: bool,
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Copy presets, giving every copy a new identity
    Cp {
        #[arg(short, long)]
        recursive: bool,
        source: PathBuf,
        target: PathBuf,
    },
    /// Move or rename presets and folders
    Mv { source: PathBuf, target: PathBuf },
    /// Delete presets and folders
    Rm {
        #[arg(short, long)]
        recursive: bool,
        target: PathBuf,
    },
    /// Create a preset folder
    Mkdir { path: PathBuf },
    /// Copy every preset of one profile into an Import folder of another
    Import { source: PathBuf, target: PathBuf },
    /// Repoint the index of a relocated profile at its current folder
    Reindex { profile: PathBuf },
}

fn execute(command: Commands, out: &mut dyn Write) -> AppResult<()> {
    let command = match command {
        Commands::Ls {
            recursive,
            full_path,
            json,
            path,
        } => {
            let options = ListOptions {
                recursive,
                full_path,
                json,
            };
            list(&path, options, out)?;
            return Ok(());
        }
        Commands::Cp {
            recursive,
            source,
            target,
        } => Command::Copy {
            source,
            target,
            recursive,
        },
        Commands::Mv { source, target } => Command::Move { source, target },
        Commands::Rm { recursive, target } => Command::Delete { target, recursive },
        Commands::Mkdir { path } => Command::MakeFolder { path },
        Commands::Import { source, target } => Command::Import { source, target },
        Commands::Reindex { profile } => Command::Reindex { profile },
    };

    let affected = run(&command, out)?;
    log::info!("{} affected {affected} preset(s)", command.name());
    Ok(())
}

fn main() {
    let settings = Settings::from_env();
    let mut logger = env_logger::Builder::new();
    logger.parse_filters(&settings.log_filter);
    if settings.perf_log {
        logger.filter_module("perf", log::LevelFilter::Info);
    }
    logger.init();
    log::debug!("perf logging: {}", settings.perf_log);

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(e) = execute(cli.command, &mut out) {
        let _ = out.flush();
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
