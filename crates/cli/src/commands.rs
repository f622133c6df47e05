use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use docload_core::Config;
use docload_ingest::{
    create_embedder, ContextEnricher, EnrichConfig, FileReport, FileStatus, IngestAction, Ingestor,
    Pipeline, PipelineConfig,
};
use docload_llm::{LlmSummarizer, Summarizer, ThrottledSummarizer};
use docload_storage::{CollectionStore, MemoryStore, PgVectorStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::scan::document_files;

pub async fn run(args: CliArgs, config: &Config, cancel: CancellationToken) -> Result<()> {
    if args.command == Command::CheckDb {
        return check_db(config, args.in_memory).await;
    }

    let store = open_store(config, args.in_memory).await?;
    let ingestor = build_ingestor(config, store)?.with_cancellation(cancel);

    match args.command {
        Command::BatchLoad {
            collection,
            dir,
            recursive,
        } => {
            let paths = scan(&dir, recursive)?;
            let report = ingestor.ingest_new_collection(&collection, &paths).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Command::Add {
            collection,
            dir,
            recursive,
        } => {
            let paths = scan(&dir, recursive)?;
            let files = ingestor.ingest_into_existing(&collection, &paths).await?;
            print_files(&files, args.json)?;
        }
        Command::Upload { collection, file } => {
            let action = ingestor
                .ingest_file(&collection, &file)
                .await
                .with_context(|| format!("upload of {} failed", file.display()))?;
            if args.json {
                println!("{}", serde_json::to_string(&action)?);
            } else {
                match action {
                    IngestAction::Created { chunks } | IngestAction::Appended { chunks } => {
                        println!("OK ({chunks} chunks)")
                    }
                    IngestAction::Skipped => println!("KO (already loaded)"),
                }
            }
        }
        Command::ListCollections => {
            let names = ingestor.list_collections().await?;
            if args.json {
                println!("{}", serde_json::to_string(&names)?);
            } else {
                names.iter().for_each(|n| println!("{n}"));
            }
        }
        Command::ListDocuments { collection } => {
            let docs = ingestor.list_documents(&collection).await?;
            if args.json {
                println!("{}", serde_json::to_string(&docs)?);
            } else {
                docs.iter().for_each(|d| println!("{d}"));
            }
        }
        Command::Delete {
            collection,
            documents,
        } => {
            let removed = ingestor.delete_documents(&collection, &documents).await?;
            println!("Removed {removed} chunks");
        }
        Command::Drop { collection } => {
            if ingestor.drop_collection(&collection).await? {
                println!("Collection {collection} dropped");
            } else {
                println!("Collection {collection} not found");
            }
        }
        Command::Analyze { collection } => {
            let report = ingestor.analyze_collection(&collection).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Command::CheckDb => unreachable!("handled above"),
    }
    Ok(())
}

fn scan(dir: &Path, recursive: bool) -> Result<Vec<std::path::PathBuf>> {
    let paths = document_files(dir, recursive)?;
    if paths.is_empty() {
        bail!("no PDF, DOCX or Markdown files in {}", dir.display());
    }
    info!(dir = %dir.display(), files = paths.len(), "documents found");
    for path in &paths {
        info!("  * {}", path.display());
    }
    Ok(paths)
}

fn print_files(files: &[FileReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
        return Ok(());
    }
    for file in files {
        println!("{file}");
    }
    let count = |status| files.iter().filter(|f| f.status == status).count();
    println!(
        "OK: {}  KO: {}  ERROR: {}",
        count(FileStatus::Ok),
        count(FileStatus::Ko),
        count(FileStatus::Error)
    );
    Ok(())
}

async fn open_store(config: &Config, in_memory: bool) -> Result<Arc<dyn CollectionStore>> {
    if in_memory {
        info!("using in-memory collection store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PgVectorStore::connect(&config.postgres)
        .await
        .context("failed to connect to PostgreSQL")?;
    Ok(Arc::new(store))
}

async fn check_db(config: &Config, in_memory: bool) -> Result<()> {
    if in_memory {
        println!("In-memory store: nothing to check");
        return Ok(());
    }
    let store = PgVectorStore::connect(&config.postgres)
        .await
        .context("failed to connect to PostgreSQL")?;
    store.ping().await.context("database did not answer")?;
    let collections = store.list_collections().await?;
    println!(
        "Connected to {}:{}/{} ({} collections)",
        config.postgres.host,
        config.postgres.port,
        config.postgres.database,
        collections.len()
    );
    Ok(())
}

fn build_ingestor(config: &Config, store: Arc<dyn CollectionStore>) -> Result<Ingestor> {
    let embedder = create_embedder(&config.embedding).context("invalid embedding configuration")?;

    let summarizer: Option<Arc<dyn Summarizer>> = if config.summary.enabled {
        let inner = LlmSummarizer::from_config(
            &config.llm,
            &config.ollama,
            Duration::from_secs(config.summary.timeout_secs),
        )
        .context("failed to create summary provider")?;
        Some(Arc::new(ThrottledSummarizer::from_config(inner, &config.summary)) as Arc<dyn Summarizer>)
    } else {
        None
    };

    let enricher = ContextEnricher::new(EnrichConfig::from(&config.summary), summarizer)?;
    let pipeline = Pipeline::new(
        PipelineConfig {
            chunking: config.chunking,
        },
        enricher,
    )?;
    Ok(Ingestor::new(store, embedder, pipeline, config.embedding.batch_size()))
}
