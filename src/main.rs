use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use inquiry_crm::campaign::{CampaignRunner, LinkOpener, TokioDelay};
use inquiry_crm::config::AppConfig;
use inquiry_crm::contacts::ContactStore;
use inquiry_crm::drafts::{DraftPipeline, LlmMessageGenerator, MessageGenerator, TemplateGenerator};
use inquiry_crm::llm::anthropic_provider;
use inquiry_crm::repl::{Outcome, Session};
use inquiry_crm::store::{ContactPersistence, JsonFileStore};

/// Prints deep links so the user can open them on their device.
struct StdoutOpener;

impl LinkOpener for StdoutOpener {
    fn open(&self, url: &str) {
        println!("Open to send: {url}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    // Logs go to a file so they don't interleave with REPL output
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log dir {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "inquiry-crm.log");
    let (log_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(log_writer)
        .with_ansi(false)
        .init();

    eprintln!("Inquiry CRM v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Logs: {}", config.log_dir.display());

    // ── Store ────────────────────────────────────────────────────────────
    let persistence: Arc<dyn ContactPersistence> = Arc::new(JsonFileStore::new(&config.db_path));
    let store = ContactStore::open(persistence).await;
    eprintln!("   Contacts: {}", store.len().await);

    // ── Generator ───────────────────────────────────────────────────────
    let generator: Arc<dyn MessageGenerator> = match &config.api_key {
        Some(api_key) => {
            let llm = anthropic_provider(api_key, &config.model)?;
            eprintln!("   Drafting: {}", config.model);
            Arc::new(LlmMessageGenerator::new(llm))
        }
        None => {
            eprintln!("   Drafting: offline templates (set ANTHROPIC_API_KEY for AI drafts)");
            Arc::new(TemplateGenerator)
        }
    };

    let drafts = Arc::new(DraftPipeline::new(Arc::clone(&store), generator));
    let campaign = Arc::new(CampaignRunner::new(
        Arc::clone(&store),
        Arc::new(TokioDelay(config.send_delay)),
    ));
    eprintln!("   Send delay: {}ms", config.send_delay.as_millis());
    eprintln!("   Type 'help' for commands.\n");

    let mut session = Session::new(
        Arc::clone(&store),
        drafts,
        campaign,
        Arc::new(StdoutOpener),
        config.inquiry.clone(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    eprint!("> ");
                    continue;
                }
                match session.handle_line(&line).await {
                    Outcome::Output(text) => println!("{text}\n"),
                    Outcome::Quit => break,
                }
                eprint!("> ");
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        }
    }

    store.flush().await;
    Ok(())
}
