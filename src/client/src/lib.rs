// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod error;
pub mod media;
pub mod session;
pub mod token_store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use api::ApiClient;
pub use error::ApiError;
pub use session::{MountGuard, SessionContext, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};

use types::LogLevel;

#[derive(Parser)]
#[command(name = "console")]
#[command(version = "0.1.0")]
#[command(about = "Command line client for the bot console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:3001", env = "CONSOLE_URL", help = "Console gateway URL")]
    url: String,

    #[arg(short, long, default_value_t = 30, help = "Request timeout in seconds")]
    timeout: u64,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Log in to the console")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    #[command(about = "Log out and forget the cached session")]
    Logout,
    #[command(about = "Show the signed-in user")]
    Whoami,
    #[command(about = "Request a new console account")]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    #[command(about = "Manage console users")]
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    #[command(about = "Manage bot phrases")]
    Frases {
        #[command(subcommand)]
        command: FraseCommands,
    },
    #[command(about = "Manage uploaded media")]
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },
    #[command(about = "Manage calendar events")]
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    #[command(about = "Manage keyword triggers")]
    Triggers {
        #[command(subcommand)]
        command: EditCommands,
    },
    #[command(about = "Show recent logs")]
    Logs {
        #[arg(long, help = "Maximum number of entries")]
        limit: Option<u32>,
        #[arg(long, help = "Only entries from this source")]
        source: Option<String>,
    },
    #[command(about = "Show or replace the bot persona")]
    Persona {
        #[command(subcommand)]
        command: PersonaCommands,
    },
    #[command(about = "Manage scheduled posts")]
    Schedules {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    #[command(about = "Inspect or refresh group context")]
    Context {
        #[command(subcommand)]
        command: ContextCommands,
    },
    #[command(about = "Send an anonymous confession")]
    Confess {
        message: String,
    },
    #[command(about = "Ship a log line to the console")]
    Log {
        #[arg(long, value_enum, default_value_t = LogLevel::Info)]
        level: LogLevel,
        message: String,
        #[arg(long, help = "JSON metadata")]
        meta: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    #[command(about = "List all users")]
    List,
    #[command(about = "Approve a pending user")]
    Approve { id: String },
    #[command(about = "Block a user")]
    Block { id: String },
}

#[derive(Subcommand, Debug)]
enum FraseCommands {
    #[command(about = "List phrases")]
    List,
    #[command(about = "Add a phrase")]
    Add { frase: String },
    #[command(about = "Delete a phrase by position")]
    Delete { index: usize },
}

#[derive(Subcommand, Debug)]
enum MediaCommands {
    #[command(about = "List media")]
    List,
    #[command(about = "Upload an image or video")]
    Upload { path: PathBuf },
    #[command(about = "Delete a media file")]
    Delete {
        #[arg(help = "image or video")]
        kind: String,
        filename: String,
    },
}

#[derive(Subcommand, Debug)]
enum EventCommands {
    #[command(about = "List events")]
    List,
    #[command(about = "Create an event")]
    Create {
        name: String,
        #[arg(help = "Event date, e.g. 2025-03-01")]
        date: String,
    },
    #[command(about = "Delete an event")]
    Delete { id: String },
}

/// Shared by resources edited as free-form JSON.
#[derive(Subcommand, Debug)]
enum EditCommands {
    #[command(about = "List entries")]
    List,
    #[command(about = "Create an entry from JSON")]
    Create { json: String },
    #[command(about = "Replace an entry with JSON")]
    Update { id: String, json: String },
    #[command(about = "Delete an entry")]
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ScheduleCommands {
    #[command(flatten)]
    Edit(EditCommands),
    #[command(about = "Re-sync schedules with the bot")]
    Resync,
}

#[derive(Subcommand, Debug)]
enum PersonaCommands {
    #[command(about = "Show the persona")]
    Show,
    #[command(about = "Replace the persona with JSON")]
    Set { json: String },
}

#[derive(Subcommand, Debug)]
enum ContextCommands {
    #[command(about = "Show context for a group")]
    Show { group_id: String },
    #[command(about = "Rebuild group context")]
    Refresh {
        #[arg(help = "Optional JSON body")]
        json: Option<String>,
    },
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Not valid JSON: {raw}"))
}

fn print_json(value: &Value) -> Result<()> {
    match value {
        Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "console_client=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!("Console URL: {}", cli.url);

    let tokens = FileTokenStore::default_location(&cli.url).context("Failed to locate session file")?;
    tracing::debug!("Session file: {:?}", tokens.path());

    let api = ApiClient::new(&cli.url, Duration::from_secs(cli.timeout), Arc::new(tokens))
        .context("Failed to initialize API client")?;
    let session = SessionContext::new(Arc::new(api));
    let api = session.api().clone();

    let value = match cli.command {
        Commands::Login { email, password } => {
            let res = session.login(&email, &password).await?;
            match res.user {
                Some(user) => println!("Logged in as {}", user.display_name()),
                None => println!("Logged in"),
            }
            if res.token.is_none() {
                eprintln!("Warning: no session token returned; requests rely on the cookie only");
            }
            return Ok(());
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out");
            return Ok(());
        }
        Commands::Whoami => {
            session.mount().resolved().await;
            match session.state().await {
                SessionState::Authenticated(user) => {
                    match user.email() {
                        Some(email) => println!("{} <{}>", user.display_name(), email),
                        None => println!("{}", user.display_name()),
                    }
                    if let Some(role) = user.role() {
                        println!("Role: {role}");
                    }
                }
                _ => println!("Not logged in. Run 'console login' first"),
            }
            return Ok(());
        }
        Commands::Register { email, password, name } => {
            api.register(&email, &password, name.as_deref()).await?
        }
        Commands::Users { command } => match command {
            UserCommands::List => api.list_users().await?,
            UserCommands::Approve { id } => api.approve_user(&id).await?,
            UserCommands::Block { id } => api.block_user(&id).await?,
        },
        Commands::Frases { command } => match command {
            FraseCommands::List => api.get_frases().await?,
            FraseCommands::Add { frase } => api.add_frase(&frase).await?,
            FraseCommands::Delete { index } => api.delete_frase_by_index(index).await?,
        },
        Commands::Media { command } => match command {
            MediaCommands::List => api.get_media().await?,
            MediaCommands::Upload { path } => api.upload_media(&path).await?,
            MediaCommands::Delete { kind, filename } => api.delete_media(&kind, &filename).await?,
        },
        Commands::Events { command } => match command {
            EventCommands::List => api.get_events().await?,
            EventCommands::Create { name, date } => api.create_event(&name, &date).await?,
            EventCommands::Delete { id } => api.delete_event(&id).await?,
        },
        Commands::Triggers { command } => match command {
            EditCommands::List => api.get_triggers().await?,
            EditCommands::Create { json } => api.create_trigger(&parse_json(&json)?).await?,
            EditCommands::Update { id, json } => api.update_trigger(&id, &parse_json(&json)?).await?,
            EditCommands::Delete { id } => api.delete_trigger(&id).await?,
        },
        Commands::Logs { limit, source } => api.get_logs(limit, source.as_deref()).await?,
        Commands::Persona { command } => match command {
            PersonaCommands::Show => api.get_persona().await?,
            PersonaCommands::Set { json } => api.update_persona(&parse_json(&json)?).await?,
        },
        Commands::Schedules { command } => match command {
            ScheduleCommands::Edit(EditCommands::List) => api.get_schedules().await?,
            ScheduleCommands::Edit(EditCommands::Create { json }) => {
                api.create_schedule(&parse_json(&json)?).await?
            }
            ScheduleCommands::Edit(EditCommands::Update { id, json }) => {
                api.update_schedule(&id, &parse_json(&json)?).await?
            }
            ScheduleCommands::Edit(EditCommands::Delete { id }) => api.delete_schedule(&id).await?,
            ScheduleCommands::Resync => api.resync_schedules().await?,
        },
        Commands::Context { command } => match command {
            ContextCommands::Show { group_id } => api.get_group_context(&group_id).await?,
            ContextCommands::Refresh { json } => {
                let payload = json.as_deref().map(parse_json).transpose()?;
                api.refresh_group_context(payload.as_ref()).await?
            }
        },
        Commands::Confess { message } => api.send_confession(&message).await?,
        Commands::Log { level, message, meta } => {
            let meta = meta.as_deref().map(parse_json).transpose()?;
            api.log_event(level, &message, meta.as_ref()).await;
            return Ok(());
        }
    };

    print_json(&value)
}
