use anyhow::Result;
use clap::Parser;
use dog::commands;
use dog::config::DatadogSite;

/// dog - Datadog CLI
///
/// Command-line client for the Datadog API.
///
/// Credentials are read from ~/.dogrc or from the DD_API_KEY and DD_APP_KEY
/// environment variables; DD_SITE selects the regional API domain
/// (default datadoghq.com).
#[derive(Parser, Debug)]
#[command(name = "dog", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Datadog API URL (overrides the site-derived default)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate API credentials
    Validate,

    /// Launch interactive TUI mode
    Ui,

    /// Show or update the stored configuration
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration with masked keys
    Show,

    /// Persist configuration values to ~/.dogrc
    Set {
        /// Datadog API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Datadog application key
        #[arg(long, value_name = "KEY")]
        app_key: Option<String>,

        /// Datadog site domain (e.g. datadoghq.com, datadoghq.eu)
        #[arg(long, value_name = "DOMAIN")]
        site: Option<DatadogSite>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => {
            if !commands::validate::run(cli.api_url).await? {
                std::process::exit(1);
            }
        }
        Commands::Ui => commands::ui::run()?,
        Commands::Config(args) => match args.action {
            ConfigAction::Show => commands::config::show()?,
            ConfigAction::Set {
                api_key,
                app_key,
                site,
            } => commands::config::set(api_key, app_key, site)?,
        },
    }
    Ok(())
}
