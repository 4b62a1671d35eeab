//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use dermascan_core::api::ApiConfig;
use dermascan_core::config;
use dermascan_core::logging;
use dermascan_core::session::SessionStore;
use dermascan_core::store::Store;

mod commands;

#[derive(Parser)]
#[command(name = "dermascan")]
#[command(version)]
#[command(about = "Skin-lesion diagnostic client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides DERMASCAN_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    #[command(flatten)]
    Session(SessionCommands),
}

/// Commands that run against the API with the saved session.
#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Sign in and save the session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(long, env = "DERMASCAN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the saved token
    Logout,
    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "DERMASCAN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Defaults to --password when that is given
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Show the API URL and whether a session is saved
    Status,

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Submit a skin image for analysis
    Diagnose {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Patient birth date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        birth_date: String,
        /// Path to a JPEG, PNG, GIF or WebP image
        #[arg(long, value_name = "PATH")]
        image: String,
    },

    /// Browse and edit past diagnostics
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show the signed-in profile
    Show,
    /// Change profile fields; omitted fields keep their current value
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Image file to upload as the new avatar
        #[arg(long, value_name = "PATH")]
        avatar: Option<String>,
    },
    /// Change the account password (prompts on stdin for omitted values)
    Password {
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        new: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum HistoryCommands {
    /// List all diagnostics, newest first
    List,
    /// Show one diagnostic
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Edit the patient fields of a diagnostic
    Update {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, value_name = "DATE")]
        birth_date: Option<String>,
    },
    /// Delete a diagnostic
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Save the API base URL to the config file
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

/// Everything a command needs once the store is open.
pub struct App {
    pub store: Store,
    pub json: bool,
}

impl App {
    fn open(cfg: &config::Config, api_url: Option<&str>, json: bool) -> Result<Self> {
        let api_config = ApiConfig {
            base_url: cfg.effective_base_url(api_url)?,
            timeout: cfg.timeout(),
        };
        let store = Store::open(
            api_config,
            SessionStore::default(),
            cfg.placeholder_confidence(),
        )?;
        Ok(Self { store, json })
    }
}

async fn dispatch(cli: Cli, cfg: config::Config) -> Result<()> {
    let Cli {
        command,
        api_url,
        json,
    } = cli;

    let command = match command {
        // config commands never touch the session
        Commands::Config { command } => return config_command(command),
        Commands::Session(command) => command,
    };

    let mut app = App::open(&cfg, api_url.as_deref(), json)?;

    match command {
        SessionCommands::Login { username, password } => {
            commands::auth::login(&mut app, &username, password).await
        }
        SessionCommands::Logout => commands::auth::logout(&mut app),
        SessionCommands::Register {
            username,
            email,
            password,
            confirm,
        } => commands::auth::register(&mut app, &username, &email, password, confirm).await,
        SessionCommands::Status => {
            commands::auth::status(&app);
            Ok(())
        }

        SessionCommands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&mut app).await,
            ProfileCommands::Update {
                username,
                email,
                first_name,
                last_name,
                avatar,
            } => {
                commands::profile::update(
                    &mut app,
                    commands::profile::ProfileEdits {
                        username,
                        email,
                        first_name,
                        last_name,
                        avatar,
                    },
                )
                .await
            }
            ProfileCommands::Password {
                current,
                new,
                confirm,
            } => commands::profile::password(&mut app, current, new, confirm).await,
        },

        SessionCommands::Diagnose {
            first_name,
            last_name,
            birth_date,
            image,
        } => {
            commands::diagnose::run(&mut app, &first_name, &last_name, &birth_date, &image).await
        }

        SessionCommands::History { command } => match command {
            HistoryCommands::List => commands::history::list(&mut app).await,
            HistoryCommands::Show { id } => commands::history::show(&mut app, &id).await,
            HistoryCommands::Update {
                id,
                first_name,
                last_name,
                birth_date,
            } => {
                commands::history::update(
                    &mut app,
                    &id,
                    commands::history::PatientEdits {
                        first_name,
                        last_name,
                        birth_date,
                    },
                )
                .await
            }
            HistoryCommands::Delete { id } => commands::history::delete(&mut app, &id).await,
        },
    }
}

fn config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
        ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
    }
}
