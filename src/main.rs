use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use storyconnect::auth::SecretHasher;
use storyconnect::config::ServerConfig;
use storyconnect::server::{AppState, create_router};
use storyconnect::store::{SqliteStore, Store};
use storyconnect::types::{Profile, Role};

#[derive(Parser)]
#[command(name = "storyconnect")]
#[command(about = "The StoryConnect reading-platform server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and first admin account)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Admin email; prompted for when omitted
        #[arg(long)]
        email: Option<String>,

        /// Skip interactive prompts; generates the admin password
        #[arg(long)]
        non_interactive: bool,
    },
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

fn run_init(data_dir: String, email: Option<String>, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let store = SqliteStore::new(data_path.join("storyconnect.db"))?;
    store.initialize()?;

    if store.any_admin_exists()? {
        bail!("Server already initialized: an admin account exists.");
    }

    let (email, password, generated) = if non_interactive {
        let email = match email {
            Some(email) => email,
            None => bail!("--email is required with --non-interactive"),
        };
        (email, generate_password(), true)
    } else {
        let email = match email {
            Some(email) => email,
            None => inquire::Text::new("Admin email:")
                .with_validator(|input: &str| {
                    if input.contains('@') {
                        Ok(inquire::validator::Validation::Valid)
                    } else {
                        Err("Enter a valid email address".into())
                    }
                })
                .prompt()?,
        };
        let password = inquire::Password::new("Admin password:")
            .with_display_mode(inquire::PasswordDisplayMode::Masked)
            .prompt()?;
        if password.len() < 8 {
            bail!("Password must be at least 8 characters");
        }
        (email, password, false)
    };

    if !email.contains('@') {
        bail!("Invalid admin email: {email}");
    }

    let hasher = SecretHasher::new();
    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        display_name: "Administrator".to_string(),
        bio: None,
        password_hash: hasher.hash(&password)?,
        created_at: now,
        updated_at: now,
    };

    store.create_profile(&profile)?;
    store.assign_role(&profile.id, Role::Admin)?;

    println!();
    println!("========================================");
    println!("Admin account created: {email}");
    if generated {
        println!();
        println!("Generated password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
    }
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("storyconnect=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                non_interactive,
            } => {
                run_init(data_dir, email, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            if !config.db_path().exists() {
                bail!(
                    "Server not initialized. Run 'storyconnect admin init' first to create the database and admin account."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.any_admin_exists()? {
                bail!(
                    "Server not initialized. Run 'storyconnect admin init' first to create the database and admin account."
                );
            }

            let state = Arc::new(AppState::new(Arc::new(store)));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
