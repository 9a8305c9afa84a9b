use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use fluxreader::api::MinifluxClient;
use fluxreader::config::Config;
use fluxreader::preferences::{FeedOrderMap, PreferenceStore};
use fluxreader::render::Renderer;
use fluxreader::storage::{Database, DatabaseError, FeedOrder};
use fluxreader::sync::{apply_feed_order, FetchOutcome, SyncState};

/// Get the config directory path (~/.config/fluxreader/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("fluxreader"))
}

#[derive(Parser, Debug)]
#[command(name = "fluxreader", about = "Miniflux feed reader")]
struct Args {
    /// Database file (default: ~/.config/fluxreader/fluxreader.db)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/fluxreader/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the Miniflux server URL
    SetUrl { url: String },
    /// Authenticate and store the API token (password from FLUXREADER_PASSWORD or stdin)
    Login {
        #[arg(long)]
        username: Option<String>,
    },
    /// Forget the token, server URL and feed order
    Logout,
    /// List feeds in display order
    Feeds {
        /// Also write the feeds to the local entry cache
        #[arg(long)]
        save: bool,
    },
    /// List categories
    Categories,
    /// List the feeds of one category
    Category { id: i64 },
    /// List entries published today
    Today,
    /// Show one entry
    Entry { id: i64 },
    /// List entries from the local cache
    Cached,
    /// Change the feed display order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand, Debug)]
enum OrderAction {
    /// Put a feed at a position
    Set { feed_id: i64, index: i64 },
    /// Drop the position of one feed
    Remove { feed_id: i64 },
    /// Drop all positions
    Reset,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // The directory holds the token database: user-only access
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config_dir.join("fluxreader.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of fluxreader appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let prefs = PreferenceStore::load(db.clone())
        .await
        .context("Failed to load preferences")?;
    let renderer = Renderer::new(config.display_variant);

    // Commands that need no server connection
    match &args.command {
        Command::SetUrl { url } => {
            MinifluxClient::new(reqwest::Client::new(), url, config.request_timeout())
                .context("Rejected server URL")?;
            prefs.set_base_url(url).await?;
            println!("Server URL set to {}", url);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Logout => {
            prefs.clear_all().await?;
            db.delete_all_feed_orders().await?;
            println!("Logged out.");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Cached => {
            let order: FeedOrderMap = db
                .get_all_feed_orders()
                .await?
                .into_iter()
                .map(|o| (o.feed_id, o.order_index))
                .collect();
            let entries = apply_feed_order(db.get_all_entries().await?, &order);
            if entries.is_empty() {
                println!("The local cache is empty.");
            } else {
                renderer.entry_list(&mut std::io::stdout().lock(), &entries)?;
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Order { action } => {
            update_order(&db, &prefs, action).await?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let Some(base_url) = prefs.resolved_base_url(&config) else {
        eprintln!("No server configured. Run `fluxreader set-url <URL>` first.");
        std::process::exit(1);
    };
    let api = MinifluxClient::new(reqwest::Client::new(), &base_url, config.request_timeout())
        .context("Invalid server URL")?;
    let state = SyncState::new(api, prefs.clone());
    let mut out = std::io::stdout().lock();

    let code = match args.command {
        Command::Login { username } => {
            let username = match username.or_else(|| config.username.clone()) {
                Some(u) => u,
                None => prompt("Username: ")?.trim().to_string(),
            };
            let password = match std::env::var("FLUXREADER_PASSWORD") {
                Ok(p) => SecretString::from(p),
                Err(_) => SecretString::from(prompt("Password: ")?),
            };
            let outcome = state.login(&username, &password).await;
            match outcome.failure() {
                None => writeln!(out, "Logged in as {}.", username)?,
                Some(kind) => eprintln!("Login failed: {}.", kind),
            }
            exit_code(&outcome)
        }
        Command::Feeds { save } => {
            let outcome = state.fetch_feeds(None).await;
            if let FetchOutcome::Success(feeds) = &outcome {
                let order = prefs.feed_order().await?;
                let feeds = apply_feed_order(feeds.clone(), &order);
                renderer.entry_list(&mut out, &feeds)?;
                if save {
                    db.insert_all(&feeds).await?;
                    let rows: Vec<FeedOrder> = order
                        .iter()
                        .map(|(&feed_id, &order_index)| FeedOrder {
                            feed_id,
                            order_index,
                        })
                        .collect();
                    db.insert_all_feed_orders(&rows).await?;
                    writeln!(out, "Saved {} feeds to the local cache.", feeds.len())?;
                }
            }
            report(&renderer, &outcome, "feeds")
        }
        Command::Categories => {
            let outcome = state.fetch_categories().await;
            renderer.category_list(&mut out, outcome.items())?;
            report(&renderer, &outcome, "categories")
        }
        Command::Category { id } => {
            let outcome = state.fetch_category_feeds(id).await;
            renderer.entry_list(&mut out, outcome.items())?;
            report(&renderer, &outcome, "feeds in this category")
        }
        Command::Today => {
            let outcome = state.fetch_today_entries().await;
            renderer.entry_list(&mut out, outcome.items())?;
            report(&renderer, &outcome, "entries published today")
        }
        Command::Entry { id } => {
            let outcome = state.load_entry_by_id(id).await;
            if let Some(entry) = outcome.data() {
                renderer.entry_detail(&mut out, entry)?;
            }
            report(&renderer, &outcome, "entry")
        }
        Command::SetUrl { .. } | Command::Logout | Command::Cached | Command::Order { .. } => {
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

async fn update_order(db: &Database, prefs: &PreferenceStore, action: &OrderAction) -> Result<()> {
    let mut order = prefs.feed_order().await?;
    match *action {
        OrderAction::Set { feed_id, index } => {
            order.insert(feed_id, index);
            db.insert_feed_order(FeedOrder {
                feed_id,
                order_index: index,
            })
            .await?;
        }
        OrderAction::Remove { feed_id } => {
            order.remove(&feed_id);
            db.delete_feed_order(feed_id).await?;
        }
        OrderAction::Reset => {
            order.clear();
            db.delete_all_feed_orders().await?;
        }
    }
    prefs.set_feed_order(&order).await?;
    tracing::info!(ordered_feeds = order.len(), "Feed order updated");
    Ok(())
}

/// Print the status line for `outcome`, if any, and pick the exit code.
fn report<T>(renderer: &Renderer, outcome: &FetchOutcome<T>, noun: &str) -> ExitCode {
    if let Some(message) = renderer.status(outcome, noun) {
        eprintln!("{}", message);
    }
    exit_code(outcome)
}

/// Non-zero only for failures; an empty result is still a success.
fn exit_code<T>(outcome: &FetchOutcome<T>) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

fn exit_status<T>(outcome: &FetchOutcome<T>) -> u8 {
    match outcome.failure() {
        Some(_) => 1,
        None => 0,
    }
}

/// Read one line from stdin after printing `label` to stderr. Only the line
/// ending is removed.
fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(strip_line_ending(&line).to_string())
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
