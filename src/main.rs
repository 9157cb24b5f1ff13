use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use toxfilter::config::{self, FilterConfig};
use toxfilter::language;
use toxfilter::output::terminal;
use toxfilter::ToxicityFilter;

/// toxfilter: decide whether text should be allowed, warned, flagged or blocked.
///
/// Scores text with an external toxicity provider (OpenAI moderation,
/// Google Perspective, or the offline keyword mock) and applies
/// language-aware thresholds to the score.
#[derive(Parser)]
#[command(name = "toxfilter", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the decision database
    Init,

    /// Analyze a piece of content and show the recommended action
    Analyze {
        /// The text to analyze
        content: String,

        /// Provider to use instead of the configured default
        #[arg(long)]
        provider: Option<String>,
    },

    /// Show language detection and Arabic normalization for a piece of text
    Detect {
        content: String,
    },

    /// List available providers and the current default
    Providers,

    /// Show recently recorded decisions
    History {
        /// Number of decisions to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("toxfilter=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = config::load()?;
            init_database(&config).await?;
        }

        Commands::Analyze { content, provider } => {
            let config = config::load()?;
            let filter = build_filter(config).await;

            if filter.available_providers().is_empty() {
                anyhow::bail!(
                    "No toxicity provider is configured.\n\
                     Set OPENAI_API_KEY or PERSPECTIVE_API_KEY in your .env file,\n\
                     or configure the offline `mock` provider in TOXFILTER_CONFIG."
                );
            }

            let decision = filter.decide(&content, provider.as_deref()).await?;
            terminal::display_decision(&content, &decision);

            println!("\n{}", "Raw result JSON:".dimmed());
            println!("{}", decision.outcome.to_json()?);
        }

        Commands::Detect { content } => {
            terminal::display_language_report(
                language::detect_language(&content),
                language::primary_language(&content),
                language::is_multilingual(&content),
                &language::normalize_arabic_text(&content),
            );
        }

        Commands::Providers => {
            let config = config::load()?;
            let filter = ToxicityFilter::new(config);
            let default = filter.default_provider();
            let available = filter.available_providers();

            if available.is_empty() {
                println!("No providers configured.");
            }
            for name in &available {
                let marker = if *name == default { " (default)" } else { "" };
                println!("  {}{}", name.bold(), marker.dimmed());
            }
            if !available.contains(&default) {
                println!(
                    "{}",
                    format!("Default provider '{default}' is not available.").yellow()
                );
            }
        }

        Commands::History { limit } => {
            history(limit).await?;
        }
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn init_database(config: &FilterConfig) -> Result<()> {
    info!("Initializing toxfilter database...");
    let conn = toxfilter::db::initialize(&config.db_path)?;
    let db = toxfilter::db::SqliteDatabase::new(conn);
    let table_count = db.table_count().await?;
    println!("Database initialized at: {}", config.db_path);
    println!("Tables created: {table_count}");
    println!("\nNext step: set OPENAI_API_KEY or PERSPECTIVE_API_KEY in your .env file");
    println!("Then run: toxfilter analyze \"some text\"");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn init_database(_config: &FilterConfig) -> Result<()> {
    anyhow::bail!("toxfilter was built without the `sqlite` feature")
}

#[cfg(feature = "sqlite")]
async fn build_filter(config: FilterConfig) -> ToxicityFilter {
    toxfilter::db::filter_with_storage(config).await
}

#[cfg(not(feature = "sqlite"))]
async fn build_filter(config: FilterConfig) -> ToxicityFilter {
    ToxicityFilter::new(config)
}

#[cfg(feature = "sqlite")]
async fn history(limit: u32) -> Result<()> {
    let config = config::load()?;
    let conn = toxfilter::db::open(&config.db_path)?;
    let db = toxfilter::db::SqliteDatabase::new(conn);

    let records = db.recent_detections(limit).await?;
    terminal::display_history(&records);

    let counts = db.action_counts().await?;
    if !counts.is_empty() {
        let summary: Vec<String> = counts
            .iter()
            .map(|(action, count)| format!("{action}: {count}"))
            .collect();
        println!("  {}", format!("All time: {}", summary.join(", ")).dimmed());
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn history(_limit: u32) -> Result<()> {
    anyhow::bail!("toxfilter was built without the `sqlite` feature")
}
