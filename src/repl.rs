//! Interactive command session. Parses REPL lines and runs them against the store.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::campaign::{CampaignEvent, CampaignRunner, LinkOpener, send_manually};
use crate::config::{InquiryConfig, Tone};
use crate::contacts::model::{Contact, ReplyStatus};
use crate::contacts::store::ContactStore;
use crate::csv::{export_csv, export_filename, parse_csv};
use crate::drafts::DraftPipeline;
use crate::query::{ContactFilter, DashboardStats, filter_contacts};

/// Usage text shown by `help`.
pub const HELP: &str = "\
Commands:
  add <name>, <phone>        add a contact by hand
  import <path>              import contacts from CSV
  export [path]              export all contacts to CSV
  list [all|pending|available]
  stats                      dashboard counters
  config                     show inquiry settings
  product <text>             product to ask about
  notes <text>               extra context for drafting
  tone <professional|casual|urgent>
  draft [id]                 draft all messages, or redraft one
  edit <id> <text>           replace a drafted message
  send <id>                  open a WhatsApp link and mark sent
  campaign                   auto-send every drafted, unsent message
  cancel                     stop the campaign after the current send
  reply <id> <pending|available|unavailable|no_reply|unknown>
  delete <id>
  clear                      delete every contact
  quit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Add { name: String, phone: String },
    Import { path: PathBuf },
    Export { path: Option<PathBuf> },
    List { filter: ContactFilter },
    Stats,
    Config,
    Product(String),
    Notes(String),
    Tone(Tone),
    Draft { id: Option<String> },
    Edit { id: String, text: String },
    Send { id: String },
    Campaign,
    Cancel,
    Reply { id: String, status: ReplyStatus },
    Delete { id: String },
    Clear,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let verb = verb.trim_start_matches('/').to_ascii_lowercase();

    let need = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("Usage: {verb} {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.as_str() {
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "add" => {
            let (name, phone) = rest
                .rsplit_once(',')
                .ok_or_else(|| "Usage: add <name>, <phone>".to_string())?;
            Ok(Command::Add {
                name: name.trim().to_string(),
                phone: phone.trim().to_string(),
            })
        }
        "import" => Ok(Command::Import {
            path: need("<path>")?.into(),
        }),
        "export" => Ok(Command::Export {
            path: (!rest.is_empty()).then(|| rest.into()),
        }),
        "list" | "ls" => Ok(Command::List {
            filter: rest.parse::<ContactFilter>()?,
        }),
        "stats" => Ok(Command::Stats),
        "config" => Ok(Command::Config),
        "product" => Ok(Command::Product(need("<text>")?)),
        "notes" => Ok(Command::Notes(rest.to_string())),
        "tone" => Ok(Command::Tone(need("<tone>")?.parse::<Tone>().map_err(|e| e.to_string())?)),
        "draft" => Ok(Command::Draft {
            id: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "edit" => {
            let (id, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: edit <id> <text>".to_string())?;
            Ok(Command::Edit {
                id: id.to_string(),
                text: text.trim().to_string(),
            })
        }
        "send" => Ok(Command::Send { id: need("<id>")? }),
        "campaign" => Ok(Command::Campaign),
        "cancel" => Ok(Command::Cancel),
        "reply" => {
            let (id, status) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: reply <id> <status>".to_string())?;
            Ok(Command::Reply {
                id: id.to_string(),
                status: status.parse::<ReplyStatus>()?,
            })
        }
        "delete" | "rm" => Ok(Command::Delete { id: need("<id>")? }),
        "clear" => Ok(Command::Clear),
        other => Err(format!("Unknown command: {other}. Type 'help' for commands.")),
    }
}

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Quit,
}

/// Everything a REPL session needs.
pub struct Session {
    store: Arc<ContactStore>,
    drafts: Arc<DraftPipeline>,
    campaign: Arc<CampaignRunner>,
    opener: Arc<dyn LinkOpener>,
    config: InquiryConfig,
}

impl Session {
    pub fn new(
        store: Arc<ContactStore>,
        drafts: Arc<DraftPipeline>,
        campaign: Arc<CampaignRunner>,
        opener: Arc<dyn LinkOpener>,
        config: InquiryConfig,
    ) -> Self {
        Self {
            store,
            drafts,
            campaign,
            opener,
            config,
        }
    }

    pub fn config(&self) -> &InquiryConfig {
        &self.config
    }

    /// Parse and run one line.
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        match parse_command(line) {
            Ok(cmd) => self.execute(cmd).await,
            Err(msg) => Outcome::Output(msg),
        }
    }

    pub async fn execute(&mut self, cmd: Command) -> Outcome {
        let out = match cmd {
            Command::Help => HELP.to_string(),
            Command::Quit => return Outcome::Quit,
            Command::Add { name, phone } => match self.store.add_contact(&name, &phone).await {
                Ok(c) => format!("Added {} ({})", c.name, c.short_id()),
                Err(e) => e.to_string(),
            },
            Command::Import { path } => self.import(path).await,
            Command::Export { path } => self.export(path).await,
            Command::List { filter } => {
                let contacts = self.store.snapshot().await;
                render_list(&filter_contacts(&contacts, filter), filter)
            }
            Command::Stats => render_stats(&DashboardStats::compute(&self.store.snapshot().await)),
            Command::Config => format!(
                "Product: {}\nNotes: {}\nTone: {}",
                if self.config.has_product() {
                    self.config.product_name.as_str()
                } else {
                    "(not set)"
                },
                self.config.additional_notes,
                self.config.tone
            ),
            Command::Product(text) => {
                self.config.product_name = text;
                format!("Product set to {}", self.config.product_name)
            }
            Command::Notes(text) => {
                self.config.additional_notes = text;
                "Notes updated".to_string()
            }
            Command::Tone(tone) => {
                self.config.tone = tone;
                format!("Tone set to {tone}")
            }
            Command::Draft { id: None } => match self.drafts.generate_all(&self.config).await {
                Ok(report) => format!(
                    "Drafted {} messages ({} kept their previous text)",
                    report.drafted, report.retained
                ),
                Err(e) => e.to_string(),
            },
            Command::Draft { id: Some(prefix) } => match self.resolve(&prefix).await {
                Ok(id) => match self.drafts.regenerate(id, &self.config).await {
                    Ok(c) => format!("{}: {}", c.name, c.message),
                    Err(e) => e.to_string(),
                },
                Err(msg) => msg,
            },
            Command::Edit { id, text } => match self.resolve(&id).await {
                Ok(id) => match self.store.set_message(id, text).await {
                    Ok(c) => format!("Message updated for {}", c.name),
                    Err(e) => e.to_string(),
                },
                Err(msg) => msg,
            },
            Command::Send { id } => match self.resolve(&id).await {
                Ok(id) => match send_manually(&self.store, id, self.opener.as_ref()).await {
                    Ok(c) => format!("Marked {} as sent", c.name),
                    Err(e) => e.to_string(),
                },
                Err(msg) => msg,
            },
            Command::Campaign => self.start_campaign(),
            Command::Cancel => {
                if self.campaign.is_running() {
                    self.campaign.cancel();
                    "Campaign will stop after the current send".to_string()
                } else {
                    "No campaign is running".to_string()
                }
            }
            Command::Reply { id, status } => match self.resolve(&id).await {
                Ok(id) => match self.store.set_reply_status(id, status).await {
                    Ok(c) => format!("{} marked {}", c.name, c.reply_status),
                    Err(e) => e.to_string(),
                },
                Err(msg) => msg,
            },
            Command::Delete { id } => match self.resolve(&id).await {
                Ok(id) => match self.store.remove(id).await {
                    Some(c) => format!("Deleted {}", c.name),
                    None => "Contact already gone".to_string(),
                },
                Err(msg) => msg,
            },
            Command::Clear => format!("Cleared {} contacts", self.store.clear().await),
        };
        Outcome::Output(out)
    }

    async fn resolve(&self, prefix: &str) -> Result<Uuid, String> {
        self.store
            .resolve_prefix(prefix)
            .await
            .ok_or_else(|| format!("No unique contact matches '{prefix}'"))
    }

    async fn import(&self, path: PathBuf) -> String {
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Import failed");
                return format!("Failed to read {}: {e}", path.display());
            }
        };
        let records = parse_csv(&text);
        if records.is_empty() {
            return "No valid contacts found in CSV.".to_string();
        }
        let summary = self.store.import(records).await;
        if summary.accepted == 0 {
            "All contacts in the file already exist.".to_string()
        } else {
            format!(
                "Imported {} new contacts ({} duplicates skipped)",
                summary.accepted, summary.duplicates
            )
        }
    }

    async fn export(&self, path: Option<PathBuf>) -> String {
        let path = path.unwrap_or_else(|| export_filename(Local::now().date_naive()).into());
        let contacts = self.store.snapshot().await;
        match tokio::fs::write(&path, export_csv(&contacts)).await {
            Ok(()) => {
                info!(path = %path.display(), count = contacts.len(), "Exported contacts");
                format!("Exported {} contacts to {}", contacts.len(), path.display())
            }
            Err(e) => format!("Failed to write {}: {e}", path.display()),
        }
    }

    /// Start a campaign in the background and print its progress.
    fn start_campaign(&self) -> String {
        if self.campaign.is_running() {
            return "A campaign is already running".to_string();
        }
        self.spawn_campaign();
        "Campaign started".to_string()
    }

    /// Run the campaign and print its events until the run returns.
    fn spawn_campaign(&self) -> JoinHandle<()> {
        let runner = Arc::clone(&self.campaign);
        tokio::spawn(async move {
            let mut events = runner.subscribe();
            let run = runner.run();
            tokio::pin!(run);

            let result = loop {
                tokio::select! {
                    result = &mut run => break result,
                    event = events.recv() => {
                        if let Ok(event) = event {
                            println!("{}", render_event(&event));
                        }
                    }
                }
            };

            match result {
                Ok(_) => {
                    while let Ok(event) = events.try_recv() {
                        println!("{}", render_event(&event));
                    }
                }
                Err(e) => println!("{e}"),
            }
        })
    }
}

fn render_event(event: &CampaignEvent) -> String {
    match event {
        CampaignEvent::Started { total } => format!("Sending to {total} contacts..."),
        CampaignEvent::Progress { percent, .. } => format!("Sending {percent}%..."),
        CampaignEvent::Finished { report } if report.targets == 0 => "Nothing to send".to_string(),
        CampaignEvent::Finished { report } => format!(
            "Campaign finished: {} sent, {} skipped{}",
            report.sent,
            report.skipped,
            if report.cancelled { " (cancelled)" } else { "" }
        ),
    }
}

fn render_list(contacts: &[&Contact], filter: ContactFilter) -> String {
    if contacts.is_empty() {
        return format!("No contacts in the {filter} view.");
    }
    let mut lines = vec![format!("{} contacts ({filter})", contacts.len())];
    for c in contacts {
        let preview: String = c.message.chars().take(40).collect();
        lines.push(format!(
            "{}  {:<24} {:<16} {:<10} {:<11} {}",
            c.short_id(),
            c.name,
            c.phone,
            c.draft_status.to_string(),
            c.reply_status.to_string(),
            preview
        ));
    }
    lines.join("\n")
}

fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "Pending replies: {} of {} total\nStock found: {} ({}% positive)\nUnsent: {}",
        stats.pending, stats.total, stats.available, stats.success_rate, stats.unsent
    )
}
