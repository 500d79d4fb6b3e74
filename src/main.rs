use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ptinstall::commands;
use ptinstall::commands::install::InstallOptions;
use ptinstall::utils::logging;

#[derive(Parser)]
#[clap(name = "ptinstall")]
#[clap(about = "Android SDK Platform Tools installer")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[clap(short, long, global = true)]
    verbose: bool,
    /// Append log records to this file instead of stderr
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install the platform tools
    Install {
        /// Installation directory
        #[clap(short, long)]
        dest: Option<PathBuf>,
        /// Add the installation directory to the search path
        #[clap(long)]
        add_to_path: bool,
        /// Create a desktop shortcut
        #[clap(long)]
        create_shortcut: bool,
        /// Modify the current user's search path instead of the machine-wide one
        #[clap(long)]
        user: bool,
        /// Download from this URL instead of the configured one
        #[clap(long)]
        url: Option<String>,
        /// Ask for the destination and options
        #[clap(short, long)]
        interactive: bool,
    },
    /// Check whether the platform tools archive can be fetched
    CheckUpdate {
        /// URL to probe instead of the configured one
        #[clap(long)]
        url: Option<String>,
        /// Print the result as JSON
        #[clap(long)]
        json: bool,
    },
    /// Check an existing installation
    Doctor {
        /// Installation directory to check
        #[clap(short, long)]
        dest: Option<PathBuf>,
        /// Check the current user's search path
        #[clap(long)]
        user: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Warning: {e}");
    }

    let result = match cli.command {
        Commands::Install {
            dest,
            add_to_path,
            create_shortcut,
            user,
            url,
            interactive,
        } => commands::install::install(InstallOptions {
            destination: dest,
            url,
            add_to_path,
            create_shortcut,
            user_scope: user,
            interactive,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e)),
        Commands::CheckUpdate { url, json } => commands::check_update::check_for_update(url, json)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Doctor { dest, user } => {
            commands::doctor::check_environment(dest, user).map_err(|e| anyhow::anyhow!(e))
        }
    };

    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
