use anyhow::Result;
use clap::{Parser, Subcommand};
use clipr::config::{Config, DatabaseBackend};
use clipr::events::NullEventSink;
use clipr::models::NewLink;
use clipr::registry::RegistryService;
use clipr::storage::open_storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "clipr-admin")]
#[command(about = "Clipr link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all links with click counts
    List,
    /// Show a link and its click history
    Show {
        /// Short code
        code: String,
    },
    /// Create a short link
    Create {
        /// Destination URL (http or https)
        url: String,
        /// Validity in minutes
        #[arg(long)]
        validity: Option<i64>,
        /// Custom short code
        #[arg(long)]
        code: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.database.backend == DatabaseBackend::Memory {
        eprintln!("⚠ DATABASE_BACKEND is 'memory'; changes made here are not visible to the server");
    }

    let storage = open_storage(&config.database).await?;
    let registry = RegistryService::new(Arc::clone(&storage), config.registry.clone())
        .with_events(Arc::new(NullEventSink));

    let outcome = run(&registry, cli.command).await;
    storage.close().await;
    outcome
}

async fn run(registry: &RegistryService, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let stats = registry.list_statistics().await?;
            if stats.is_empty() {
                println!("No links found.");
                return Ok(());
            }

            println!(
                "{:<12} {:<8} {:>7} {:<25} {}",
                "Code", "Status", "Clicks", "Expires", "URL"
            );
            println!("{}", "-".repeat(90));
            for link in stats {
                println!(
                    "{:<12} {:<8} {:>7} {:<25} {}",
                    link.short_code,
                    format!("{:?}", link.status).to_lowercase(),
                    link.clicks.len(),
                    link.expiry.to_rfc3339(),
                    link.original_url
                );
            }
        }
        Commands::Show { code } => {
            let link = registry.link_statistics(&code).await?;
            println!("Code:     {}", link.short_code);
            println!("URL:      {}", link.original_url);
            println!("Created:  {}", link.created_at.to_rfc3339());
            println!("Expires:  {}", link.expiry.to_rfc3339());
            println!("Status:   {:?}", link.status);
            println!("Clicks:   {}", link.clicks.len());
            for click in link.clicks {
                println!(
                    "  {}  {:<40} {}",
                    click.timestamp.to_rfc3339(),
                    click.source,
                    click.location
                );
            }
        }
        Commands::Create {
            url,
            validity,
            code,
        } => {
            let short_id = registry
                .create_link(NewLink {
                    original_url: url.clone(),
                    validity_minutes: validity,
                    custom_code: code,
                })
                .await?;
            println!("✓ Created '{}' -> {}", short_id, url);
        }
    }

    Ok(())
}
