use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use qarag_cli::{
    display_banner, format_sources, handle_input_with_history, load_corpus, print_help,
    print_history, ConversationSession, SessionConfig,
};
use qarag_core::{IndexSchema, LLMProvider, SearchBackend, SearchBackendKind, Settings};
use qarag_openai::{OpenAIClient, OpenAIConfig};
use qarag_rag::{
    ConnectionManager, CorpusIndexer, ElasticsearchConnector, LocalConnector, RetrievalEngine,
};

#[derive(Parser)]
#[command(name = "qarag")]
#[command(about = "Question answering grounded in an indexed FAQ corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index if needed and upsert a corpus file (JSON array or JSON lines)
    Index {
        file: PathBuf,
    },
    /// Answer a single question
    Ask {
        question: String,
    },
    /// Interactive question answering
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Index { file } => run_index(&settings, &file).await,
        Commands::Ask { question } => {
            let mut session = open_session(&settings).await?;
            ask(&mut session, &question).await
        }
        Commands::Chat => run_chat(&settings).await,
    }
}

async fn connect(settings: &Settings) -> Result<Arc<dyn SearchBackend>> {
    let backend: Arc<dyn SearchBackend> = match settings.search.backend {
        SearchBackendKind::Elasticsearch => {
            let connector =
                ElasticsearchConnector::new(settings.search.clone(), settings.request_timeout);
            ConnectionManager::new(connector, settings.retry.clone())
                .connect()
                .await? as Arc<dyn SearchBackend>
        }
        SearchBackendKind::Local => {
            let connector = LocalConnector::new(settings.search.index_dir.as_deref());
            ConnectionManager::new(connector, settings.retry.clone())
                .connect()
                .await? as Arc<dyn SearchBackend>
        }
    };
    Ok(backend)
}

async fn run_index(settings: &Settings, file: &Path) -> Result<()> {
    let documents = load_corpus(file)
        .with_context(|| format!("failed to load corpus from {}", file.display()))?;
    println!("{} Loaded {} documents", "📄".blue(), documents.len());

    let backend = connect(settings).await?;
    let indexer = CorpusIndexer::new(backend);
    indexer
        .ensure_index(&settings.index_name, &IndexSchema::qa_corpus())
        .await?;

    let report = indexer.upsert(&settings.index_name, &documents).await?;
    println!(
        "{} Indexed {} documents into '{}'",
        "✅".green(),
        report.documents_indexed,
        settings.index_name
    );

    if !report.is_complete() {
        println!("{} {} documents failed:", "❌".red(), report.documents_failed);
        for failure in &report.failures {
            println!("  {} {}: {}", "•".red(), failure.id, failure.cause);
        }
        bail!("{} of {} documents failed to index", report.failures.len(), documents.len());
    }
    Ok(())
}

async fn open_session(settings: &Settings) -> Result<ConversationSession> {
    let backend = connect(settings).await?;
    let retrieval = RetrievalEngine::new(backend).with_timeout(settings.request_timeout);

    let config = OpenAIConfig::from_env()?
        .with_model(settings.model_id.clone())
        .with_timeout(settings.request_timeout);
    let generator: Arc<dyn LLMProvider> = Arc::new(OpenAIClient::new(config)?);

    Ok(ConversationSession::new(
        Arc::new(retrieval),
        generator,
        SessionConfig::from(settings),
    ))
}

async fn ask(session: &mut ConversationSession, question: &str) -> Result<()> {
    let answer = session.submit(question).await?;
    println!("{}", answer);
    if !session.last_sources().is_empty() {
        println!(
            "{} {}",
            "Sources:".dimmed(),
            format_sources(session.last_sources()).dimmed()
        );
    }
    Ok(())
}

async fn run_chat(settings: &Settings) -> Result<()> {
    let mut session = open_session(settings).await?;
    display_banner(&settings.index_name, &settings.model_id);

    let mut input_history = Vec::new();

    while let Some(input) = handle_input_with_history(&mut input_history)? {
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "help" => {
                print_help();
                continue;
            }
            "history" => {
                print_history(session.history());
                continue;
            }
            _ => {}
        }

        println!("{} Searching...", "🔎".blue());
        if let Err(e) = ask(&mut session, &input).await {
            println!("{} {}", "❌".red(), e);
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
