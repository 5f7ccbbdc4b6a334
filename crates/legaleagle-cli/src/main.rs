mod config;
mod display;
mod evaluate;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use legaleagle_ai::{ChatClassifier, Classifier};
use legaleagle_core::{ActionItemLifecycle, NewRule, Severity};
use legaleagle_store::DuckStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::FileConfig;
use crate::evaluate::Evaluator;

#[derive(Parser)]
#[command(name = "legaleagle", version, about = "Document compliance evaluation and remediation tracking")]
struct Cli {
    /// DuckDB database file. In-memory when unset.
    #[arg(long, global = true, env = "LEGALEAGLE_DB")]
    db: Option<PathBuf>,

    /// TOML pipeline file (keyword table, severity weights, classifier settings).
    #[arg(long, global = true, env = "LEGALEAGLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    classifier: ClassifierArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ClassifierArgs {
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Overrides `classifier.base_url` from the pipeline file.
    #[arg(long, global = true, env = "GROQ_BASE_URL")]
    base_url: Option<String>,

    /// Overrides `classifier.model` from the pipeline file.
    #[arg(long, global = true, env = "GROQ_MODEL")]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Manage the rule catalog.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Register, list, and search documents.
    Documents {
        #[command(subcommand)]
        command: DocumentsCommand,
    },
    /// Classify a stored document, score it, and open action items.
    Evaluate { document_id: String },
    /// List or complete action items.
    Actions {
        #[command(subcommand)]
        command: ActionsCommand,
    },
    /// Print the rule name recovered from a classifier explanation.
    Extract { explanation: String },
}

#[derive(Subcommand)]
enum RulesCommand {
    Add {
        #[arg(long)]
        name: String,
        /// high, medium, low, or any other label.
        #[arg(long)]
        severity: String,
        #[arg(long, default_value = "")]
        pattern: String,
    },
    List,
}

#[derive(Subcommand)]
enum DocumentsCommand {
    Add {
        #[arg(long)]
        title: String,
        /// Extracted document text.
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// Read the extracted text from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    List,
    Search { query: String },
}

#[derive(Subcommand)]
enum ActionsCommand {
    /// Pending action items.
    List {
        /// Join each item with its document title.
        #[arg(long)]
        titles: bool,
    },
    Complete { id: String },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(db: Option<&PathBuf>) -> anyhow::Result<DuckStore> {
    match db {
        Some(path) => DuckStore::open_persistent(path)
            .with_context(|| format!("opening database {}", path.display())),
        None => {
            warn!("no database path given, using an in-memory store");
            DuckStore::open().context("opening in-memory database")
        }
    }
}

fn build_classifier(
    args: &ClassifierArgs,
    file: &FileConfig,
) -> anyhow::Result<Option<ChatClassifier>> {
    let Some(api_key) = args.api_key.clone().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let mut settings = file.classifier.clone();
    if let Some(url) = &args.base_url {
        settings.base_url = url.clone();
    }
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    let classifier = ChatClassifier::new(settings, api_key).context("building classifier client")?;
    Ok(Some(classifier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;

    if let Command::Extract { explanation } = &cli.command {
        println!("{}", file.pipeline.extractor().extract(explanation));
        return Ok(());
    }

    let store = open_store(cli.db.as_ref())?;

    match cli.command {
        Command::Serve { port } => {
            let classifier = build_classifier(&cli.classifier, &file)?;
            if classifier.is_none() {
                warn!("GROQ_API_KEY not set, document evaluation is disabled");
            }
            let classifier = classifier.map(|c| Arc::new(c) as Arc<dyn Classifier>);
            info!("legaleagle v{}", env!("CARGO_PKG_VERSION"));
            serve::start_server(port, store, classifier, &file.pipeline).await?;
        }
        Command::Rules { command } => match command {
            RulesCommand::Add {
                name,
                severity,
                pattern,
            } => {
                let rule = store.add_rule(NewRule {
                    name,
                    pattern,
                    severity: Severity::parse(&severity),
                })?;
                println!("Added rule {} ({})", rule.name, rule.id);
            }
            RulesCommand::List => print!("{}", display::rules_table(&store.all_rules()?)),
        },
        Command::Documents { command } => match command {
            DocumentsCommand::Add { title, text, file } => {
                let text = match (text, file) {
                    (Some(text), _) => text,
                    (None, Some(path)) => std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                    (None, None) => bail!("either --text or --file is required"),
                };
                let doc = store.add_document(&title, &text)?;
                println!("Added document {} ({})", doc.title, doc.id);
            }
            DocumentsCommand::List => {
                print!("{}", display::documents_table(&store.all_documents()?))
            }
            DocumentsCommand::Search { query } => {
                print!(
                    "{}",
                    display::documents_table(&store.search_documents(&query)?)
                )
            }
        },
        Command::Evaluate { document_id } => {
            let Some(classifier) = build_classifier(&cli.classifier, &file)? else {
                bail!("GROQ_API_KEY is required to evaluate documents");
            };
            let extractor = file.pipeline.extractor();
            let scorer = file.pipeline.risk_scorer();
            let report = Evaluator::new(&store, &classifier, &extractor, &scorer)
                .evaluate(&document_id)
                .await
                .with_context(|| format!("evaluating document {document_id}"))?;
            print!("{}", display::evaluation(&report));
        }
        Command::Actions { command } => {
            let lifecycle = ActionItemLifecycle::new(&store);
            match command {
                ActionsCommand::List { titles: true } => {
                    print!("{}", display::titled_action_items(&lifecycle.pending_with_titles()?))
                }
                ActionsCommand::List { titles: false } => {
                    print!("{}", display::action_items(&lifecycle.pending()?))
                }
                ActionsCommand::Complete { id } => {
                    let item = lifecycle.complete(&id)?;
                    println!("Completed action item {}", item.id);
                }
            }
        }
        Command::Extract { .. } => {}
    }

    Ok(())
}
