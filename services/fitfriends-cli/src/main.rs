//! FitFriends command-line client
//!
//! Lifecycle:
//! 1. Parse flags, load config (file → env → `--server`)
//! 2. Open the token file and build the API client around it
//! 3. Start-up check: when an access token is stored, ask `/auth/check` once
//! 4. Run the subcommand; user-facing output goes to stdout, logs to stderr

mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Secret;
use fitfriends_auth::TokenStore;
use fitfriends_client::{
    ApiClient, AppRoute, AuthDispatcher, AvatarFile, Navigator, RegisterForm, register_user,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "fitfriends")]
#[command(about = "Command-line client for the FitFriends API")]
#[command(version)]
struct Cli {
    /// Config file (default: $FITFRIENDS_CONFIG or ./fitfriends.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding config and environment
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the token pair
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FITFRIENDS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account, optionally uploading an avatar
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// YYYY-MM-DD
        #[arg(long)]
        birth_date: String,
        /// Metro station, e.g. "Спортивная" or "sportivnaya"
        #[arg(long)]
        location: String,
        /// мужской | женский | неважно (or male | female | any)
        #[arg(long)]
        gender: String,
        /// тренер | пользователь (or trainer | client)
        #[arg(long)]
        role: String,
        #[arg(long, env = "FITFRIENDS_PASSWORD", hide_env_values = true)]
        password: String,
        /// Accept the user agreement
        #[arg(long)]
        accept_terms: bool,
        /// jpg/png image, at most 1 MB
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Show the signed-in user
    Whoami,
    /// Sign out and forget the stored tokens
    Logout,
    /// Authenticated GET of an API path, printing the body
    Get { path: String },
}

/// Prints the route the registration flow continues to.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: AppRoute) {
        println!("next: {route}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?
        .with_server(cli.server)
        .context("invalid --server")?;
    info!(server = %config.server.url, config = %config_path.display(), "config loaded");

    let token_file = config.token_file();
    let store = TokenStore::load(token_file.clone())
        .await
        .with_context(|| format!("failed to open token file {}", token_file.display()))?;
    let client = ApiClient::connect(config.client_config(), Arc::new(store))
        .context("failed to build API client")?;
    let dispatcher = AuthDispatcher::new(Arc::new(client));

    let restored = dispatcher.restore_session().await;
    if let Err(e) = &restored {
        warn!(error = %e, "stored session could not be confirmed");
    }

    match cli.command {
        Command::Login { email, password } => {
            let user = dispatcher
                .login(&email, Secret::new(password))
                .await
                .context("login failed")?;
            print_json(&user)?;
        }
        Command::Register {
            name,
            email,
            birth_date,
            location,
            gender,
            role,
            password,
            accept_terms,
            avatar,
        } => {
            let form = RegisterForm {
                name,
                email,
                birth_date,
                location,
                password,
                gender,
                role,
                terms: accept_terms,
            };
            let avatar = match avatar {
                Some(path) => Some(
                    AvatarFile::read(&path)
                        .await
                        .with_context(|| format!("failed to read avatar {}", path.display()))?,
                ),
                None => None,
            };
            let today = chrono::Local::now().date_naive();
            let user = register_user(&dispatcher, &PrintNavigator, &form, avatar.as_ref(), today)
                .await?;
            print_json(&user)?;
        }
        Command::Whoami => match restored {
            Ok(Some(user)) => print_json(&user)?,
            Ok(None) => return Err(error::Error::NotSignedIn.into()),
            Err(e) if e.is_unauthorized() => return Err(error::Error::SessionRejected.into()),
            Err(e) => return Err(e).context("session check failed"),
        },
        Command::Logout => {
            dispatcher.logout().await.context("logout failed")?;
            println!("signed out");
        }
        Command::Get { path } => {
            let body = dispatcher
                .client()
                .get_text(&path)
                .await
                .with_context(|| format!("GET {path} failed"))?;
            println!("{body}");
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
