use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;

use rulesync::clipboard::ClipboardHandler;
use rulesync::config::Config;
use rulesync::engine::{EngineOptions, ItemId, RuleEngine};
use rulesync::events::Notifications;
use rulesync::feature::RuleFeature;
use rulesync::features::{DictRuleFeature, ReplaceRuleFeature, TocRuleFeature};
use rulesync::import::{BaseImportUiState, ImportStatus};
use rulesync::logging::init_tracing;
use rulesync::model::{RuleEntity, SelectableItem};
use rulesync::store::{JsonFileStore, RuleStore};

/// Slack added on top of the configured HTTP timeout when waiting on the engine.
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "rulesync", version, about = "Manage, import and share rule collections")]
struct Cli {
    /// Rule collection to operate on.
    #[arg(short, long, value_enum, default_value = "replace")]
    kind: Kind,

    /// Config file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Replace,
    Dict,
    Toc,
}

impl Kind {
    fn file_name(self) -> &'static str {
        match self {
            Kind::Replace => "replace_rules.json",
            Kind::Dict => "dict_rules.json",
            Kind::Toc => "toc_rules.json",
        }
    }
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print the rules in display order.
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Import from a URL, a file:// reference or literal JSON.
    Import {
        source: String,
        /// Also overwrite rules that are already identical.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        keep_name: bool,
        #[arg(long)]
        group: Option<String>,
        /// Merge --group into existing groups instead of replacing them.
        #[arg(long, requires = "group")]
        add_group: bool,
    },
    /// Write rules to a JSON file.
    Export {
        output: PathBuf,
        /// Rules to export; all when omitted.
        #[arg(long, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Upload rules and print the share link.
    Upload {
        #[arg(long, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Copy one rule as JSON to the clipboard.
    Copy { id: String },
    /// Move the rule at FROM to TO and save the new order.
    Reorder { from: usize, to: usize },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let path = config.store.data_dir.join(cli.kind.file_name());

    match cli.kind {
        Kind::Replace => run_feature(ReplaceRuleFeature, &config, &path, cli.command).await,
        Kind::Dict => run_feature(DictRuleFeature, &config, &path, cli.command).await,
        Kind::Toc => run_feature(TocRuleFeature, &config, &path, cli.command).await,
    }
}

async fn run_feature<F>(feature: F, config: &Config, path: &Path, command: CliCommand) -> Result<()>
where
    F: RuleFeature,
    ItemId<F>: FromStr + Display,
    <ItemId<F> as FromStr>::Err: Display,
{
    let store = Arc::new(
        JsonFileStore::<F::Entity>::open(path)
            .with_context(|| format!("Failed to open rule store {}", path.display()))?,
    );
    let options = EngineOptions::from_config(config).context("Failed to build HTTP clients")?;
    let has_uploader = options.uploader.is_some();
    let wait = Duration::from_secs(config.import.timeout_seconds) + WAIT_SLACK;

    let dyn_store: Arc<dyn RuleStore<F::Entity>> = store.clone();
    let (engine, mut notifications) = RuleEngine::spawn(Arc::new(feature), dyn_store, options);
    let feature = engine.feature();
    let items: Vec<F::Item> = store
        .snapshot()
        .iter()
        .map(|rule| feature.to_ui_item(rule))
        .collect();

    match command {
        CliCommand::List { search } => {
            let rules = feature.filter_data(&store.snapshot(), search.as_deref().unwrap_or(""));
            for rule in &rules {
                let item = feature.to_ui_item(rule);
                println!("{}\t{}", item.id(), rule.sort_order());
            }
            eprintln!("{} of {} rules", rules.len(), items.len());
        }

        CliCommand::Import {
            source,
            all,
            keep_name,
            group,
            add_group,
        } => {
            let mut state_rx = engine.subscribe();
            engine.import_source(source);
            let state = wait_for_state(&mut state_rx, wait, "import", |s| {
                matches!(
                    feature.import_state(s),
                    BaseImportUiState::Success { .. } | BaseImportUiState::Error { .. }
                )
            })
            .await?;
            let import = feature.import_state(&state);
            if let Some(message) = import.error_message() {
                bail!("Import failed: {}", message);
            }
            for wrapper in import.items() {
                let status = match wrapper.status {
                    ImportStatus::New => "new",
                    ImportStatus::Update => "update",
                    ImportStatus::Existing => "existing",
                };
                println!("{:?}\t{}", wrapper.data.key(), status);
            }

            if all {
                engine.toggle_import_all(true);
            }
            engine.set_keep_original_name(keep_name);
            if group.is_some() {
                engine.set_custom_group(group, add_group);
            }
            engine.save_imported_rules();

            tokio::select! {
                idle = wait_for_state(&mut state_rx, wait, "import to be saved", |s| {
                    matches!(feature.import_state(s), BaseImportUiState::Idle)
                }) => {
                    idle?;
                    println!("Import saved");
                }
                Some(notification) = notifications.recv() => bail!("{}", notification.message),
            }
        }

        CliCommand::Export { output, ids } => {
            let selected = parse_ids::<F>(&ids, &items)?;
            let written = engine.export_to_path(&output, &items, &selected).await;
            let message = notifications
                .try_recv()
                .map(|n| n.message)
                .unwrap_or_default();
            if !written {
                bail!("{}", message);
            }
            println!("{}", message);
        }

        CliCommand::Upload { ids } => {
            if !has_uploader {
                bail!("No upload endpoint configured; set [upload] endpoint in the config file");
            }
            let selected = parse_ids::<F>(&ids, &items)?;
            engine.upload_selected_rules(selected, items);
            let notification = tokio::time::timeout(wait, notifications.recv())
                .await
                .context("Timed out waiting for upload")?
                .context("Rule engine stopped")?;
            match notification.url {
                Some(url) => println!("{}", url),
                None => bail!("{}", notification.message),
            }
        }

        CliCommand::Copy { id } => {
            let id = parse_id::<F>(&id)?;
            let Some(item) = items.iter().find(|item| item.id() == id) else {
                bail!("No rule with id {}", id);
            };
            let json = engine.copy_rule_json(item)?;
            let mut clipboard = ClipboardHandler::new().context("Clipboard unavailable")?;
            clipboard.set_text(&json).map_err(anyhow::Error::msg)?;
            println!("{}", json);
        }

        CliCommand::Reorder { from, to } => {
            if from >= items.len() || to >= items.len() {
                bail!("Positions must be below {}", items.len());
            }
            let mut store_rx = store.observe();
            engine.move_item_in_list(from, to);
            engine.save_sort_order();
            wait_for_store(&mut store_rx, wait, &mut notifications).await?;
            println!("Order saved");
        }

        CliCommand::Delete { ids } => {
            let selected = parse_ids::<F>(&ids, &items)?;
            let mut store_rx = store.observe();
            engine.set_selection(selected);
            engine.delete_selected();
            wait_for_store(&mut store_rx, wait, &mut notifications).await?;
            println!("Deleted {} rules", ids.len());
        }
    }
    Ok(())
}

fn parse_id<F>(raw: &str) -> Result<ItemId<F>>
where
    F: RuleFeature,
    ItemId<F>: FromStr,
    <ItemId<F> as FromStr>::Err: Display,
{
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid rule id '{}': {}", raw, e))
}

/// Ids named on the command line, or every rule when none are given.
fn parse_ids<F>(raw: &[String], items: &[F::Item]) -> Result<HashSet<ItemId<F>>>
where
    F: RuleFeature,
    ItemId<F>: FromStr + Display,
    <ItemId<F> as FromStr>::Err: Display,
{
    if raw.is_empty() {
        return Ok(items.iter().map(SelectableItem::id).collect());
    }
    let mut ids = HashSet::new();
    for id in raw {
        let id = parse_id::<F>(id)?;
        if !items.iter().any(|item| item.id() == id) {
            bail!("No rule with id {}", id);
        }
        ids.insert(id);
    }
    Ok(ids)
}

async fn wait_for_state<S: Clone>(
    rx: &mut watch::Receiver<S>,
    wait: Duration,
    what: &str,
    predicate: impl FnMut(&S) -> bool,
) -> Result<S> {
    let state = tokio::time::timeout(wait, rx.wait_for(predicate))
        .await
        .with_context(|| format!("Timed out waiting for {}", what))?
        .context("Rule engine stopped")?;
    Ok((*state).clone())
}

/// Wait for the next store write, failing on the first notification instead.
async fn wait_for_store<E>(
    store_rx: &mut watch::Receiver<Vec<E>>,
    wait: Duration,
    notifications: &mut Notifications,
) -> Result<()> {
    tokio::select! {
        changed = tokio::time::timeout(wait, store_rx.changed()) => {
            changed.context("Timed out waiting for the rule store")??;
            Ok(())
        }
        Some(notification) = notifications.recv() => bail!("{}", notification.message),
    }
}
