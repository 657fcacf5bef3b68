use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use shelfpics_cli::OutputFormat;
use shelfpics_cli::commands::{self, run::RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelfpics")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Download product pictures from the vendor portal for a spreadsheet catalog",
    long_about = "shelfpics signs into the vendor portal in Chrome, looks up every item of a \
                  spreadsheet catalog, downloads the picture archive of each match and unpacks \
                  the archives into one folder of numbered pictures per item."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the INI configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "SHELFPICS_CONFIG",
        default_value = "config.ini"
    )]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and unpack pictures for every item of a spreadsheet
    Run {
        /// Catalog spreadsheet (item code, trademark, product type)
        #[arg(value_name = "SPREADSHEET")]
        spreadsheet: PathBuf,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Pick the spreadsheet in a file dialog, then run
    Gui {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Unpack already downloaded archives without opening the portal
    Extract {
        /// Directory holding the archives (defaults to BASE_DIR)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Inspect the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Manage Chrome profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct BrowserArgs {
    /// Path to the Chrome executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Named Chrome profile; keeps the portal session between runs
    #[arg(long, value_name = "NAME", conflicts_with = "temp")]
    profile: Option<String>,

    /// Use a throwaway Chrome profile
    #[arg(long)]
    temp: bool,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate the configuration and print it with the password hidden
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List all available profiles
    List,

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,

        /// Delete without asking for confirmation
        #[arg(long)]
        force: bool,
    },
}

impl BrowserArgs {
    fn into_options(self, config: PathBuf) -> RunOptions {
        RunOptions {
            config,
            chrome_path: self.chrome_path,
            profile: self.profile,
            temp: self.temp,
            headless: self.headless,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            spreadsheet,
            browser,
        } => commands::run::execute(&spreadsheet, &browser.into_options(cli.config)),
        Commands::Gui { browser } => commands::gui::execute(&browser.into_options(cli.config)),
        Commands::Extract { dir } => commands::extract::execute(&cli.config, dir),
        Commands::Config(ConfigCommands::Check { format }) => {
            commands::config::check(&cli.config, format)
        }
        Commands::Profile(ProfileCommands::List) => commands::profile::list(),
        Commands::Profile(ProfileCommands::Delete { name, force }) => {
            commands::profile::delete(&name, force)
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            commands::completion::execute(shell, &mut cmd)
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("shelfpics=debug,shelfpics_core=debug,shelfpics_browser=debug")
    } else {
        EnvFilter::new("shelfpics=info,shelfpics_core=info,shelfpics_browser=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
