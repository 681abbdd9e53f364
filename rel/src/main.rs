use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod context;
mod format;
mod logging;

/// Rel - Referrer Explorer
///
/// Discover the signatures, SBOMs and other artifacts that refer to a
/// container image in a registry or an OCI image layout.
#[derive(Parser, Debug)]
#[command(name = "rel")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the configuration file
    #[arg(long, global = true, env = "REL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover artifacts referring to a subject
    Discover(commands::discover::DiscoverArgs),
    /// Display version information
    Version,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbosity = context::VerbosityLevel::from_count(cli.verbose);
    logging::init(verbosity);

    let code = match cli.command {
        Commands::Discover(args) => {
            commands::discover::handle_discover(cli.config.as_deref(), verbosity, &args).await
        }
        Commands::Version => {
            commands::version::print_version();
            0
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            0
        }
    };
    std::process::exit(code);
}
