//! Command-line interface and presentation layer

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use crate::clipboard::{
    create_provider, ClipboardContent, ClipboardProvider, CopyGate, GatedWriter,
};
use crate::config::Config;
use crate::history::{ClipItem, HistoryStore, ItemKind};
use crate::monitor::{self, ClipboardMonitor};

pub mod picker;

#[derive(Parser)]
#[command(name = "clipkeep")]
#[command(about = "Desktop clipboard history manager")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Watch the clipboard and record history")]
    Watch,

    #[command(about = "Stop a running watcher")]
    Stop,

    #[command(about = "Show watcher and history status")]
    Status,

    #[command(about = "Browse history interactively")]
    Show,

    #[command(about = "Print recent history")]
    History {
        #[arg(short, long, default_value = "50")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    #[command(about = "Search history by substring")]
    Search {
        query: String,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    #[command(about = "Copy a stored item back to the clipboard")]
    Copy { id: i64 },

    #[command(about = "Toggle the favorite flag on an item")]
    Favorite { id: i64 },

    #[command(about = "Delete an item")]
    Delete { id: i64 },

    #[command(about = "Clear the history, keeping favorites by default")]
    Clear {
        #[arg(long, help = "Also remove favorites")]
        everything: bool,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Print aggregate counts")]
    Stats {
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Generate example configuration")]
    Init {
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Validate configuration")]
    Validate,
}

pub struct CliHandler {
    config: Arc<Config>,
    store: Option<Arc<HistoryStore>>,
    provider: Option<Arc<dyn ClipboardProvider>>,
    gate: Arc<CopyGate>,
}

impl CliHandler {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Arc::new(Config::load_config(config_path)?);

        Ok(Self {
            config,
            store: None,
            provider: None,
            gate: Arc::new(CopyGate::new()),
        })
    }

    /// The loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lazily open the history store when needed
    async fn ensure_store(&mut self) -> Result<Arc<HistoryStore>> {
        if self.store.is_none() {
            let store = Arc::new(HistoryStore::open(&self.config.history).await?);
            self.store = Some(store);
        }
        Ok(Arc::clone(self.store.as_ref().expect("store initialized above")))
    }

    /// Lazily connect to the system clipboard when needed
    fn ensure_provider(&mut self) -> Result<Arc<dyn ClipboardProvider>> {
        if self.provider.is_none() {
            self.provider = Some(create_provider()?);
        }
        Ok(Arc::clone(self.provider.as_ref().expect("provider initialized above")))
    }

    pub async fn handle_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Watch => self.watch().await,
            Commands::Stop => self.stop(),
            Commands::Status => self.status().await,
            Commands::Show => self.show().await,
            Commands::History { limit, json } => self.history(limit, json).await,
            Commands::Search { query, limit } => self.search(&query, limit).await,
            Commands::Copy { id } => self.copy(id).await,
            Commands::Favorite { id } => self.favorite(id).await,
            Commands::Delete { id } => self.delete(id).await,
            Commands::Clear { everything, yes } => self.clear(everything, yes).await,
            Commands::Stats { json } => self.stats(json).await,
            Commands::Config { action } => self.handle_config_action(action),
        }
    }

    /// Run the clipboard watcher in the foreground until interrupted
    async fn watch(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if crate::daemon::is_watcher_running()? {
                anyhow::bail!("A clipkeep watcher is already running");
            }
            crate::daemon::write_pidfile(std::process::id())?;
        }

        let store = self.ensure_store().await?;
        let provider = self.ensure_provider()?;
        let monitor =
            ClipboardMonitor::new(provider, store, Arc::clone(&self.gate), &self.config.monitor);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        #[cfg(unix)]
        crate::daemon::spawn_signal_listener(shutdown_tx.clone())?;

        let mut external_shutdown = shutdown_tx.subscribe();
        let task = tokio::spawn(monitor.run(shutdown_rx));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
            }
            _ = async {
                while external_shutdown.changed().await.is_ok() {
                    if *external_shutdown.borrow() {
                        break;
                    }
                }
            } => {}
        }

        let _ = shutdown_tx.send(true);
        let _ = task.await;

        #[cfg(unix)]
        crate::daemon::remove_pidfile()?;

        Ok(())
    }

    fn stop(&self) -> Result<()> {
        #[cfg(unix)]
        {
            crate::daemon::stop_watcher()?;
            Ok(())
        }

        #[cfg(not(unix))]
        {
            println!("stop is only supported on unix");
            Ok(())
        }
    }

    async fn status(&mut self) -> Result<()> {
        println!("ClipKeep Status:");
        println!(
            "  Version: {} ({}, {})",
            crate::VERSION,
            env!("TARGET"),
            env!("BUILD_DATE")
        );

        #[cfg(unix)]
        {
            match crate::daemon::read_pidfile()? {
                Some(pid) if crate::daemon::is_process_running(pid) => {
                    println!("  Watcher: running (pid {})", pid);
                }
                _ => println!("  Watcher: not running"),
            }
        }

        let store = self.ensure_store().await?;
        let stats = store.stats().await?;
        println!(
            "  History: {} items, {} favorites (cap {})",
            stats.total, stats.favorites, stats.cap
        );

        Ok(())
    }

    /// Open the interactive picker, with a live monitor alongside it so
    /// new copies appear as they happen and re-copies are echo-suppressed.
    async fn show(&mut self) -> Result<()> {
        let store = self.ensure_store().await?;
        let provider = self.ensure_provider()?;

        // A standalone watcher already records changes; running a second
        // monitor here would save every captured image twice.
        #[cfg(unix)]
        let watcher_running = crate::daemon::is_watcher_running().unwrap_or(false);
        #[cfg(not(unix))]
        let watcher_running = false;

        let writer = GatedWriter::new(Arc::clone(&provider), Arc::clone(&self.gate));

        if watcher_running {
            let mut picker = picker::HistoryPicker::new(store, writer, None);
            return picker.show().await;
        }

        let monitor = ClipboardMonitor::new(
            provider,
            Arc::clone(&store),
            Arc::clone(&self.gate),
            &self.config.monitor,
        );
        let events = monitor.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(monitor.run(shutdown_rx));

        let mut picker = picker::HistoryPicker::new(store, writer, Some(events));
        let result = picker.show().await;

        let _ = shutdown_tx.send(true);
        let _ = task.await;

        result
    }

    async fn history(&mut self, limit: usize, json: bool) -> Result<()> {
        let store = self.ensure_store().await?;
        let items = store.get_history(limit).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        if items.is_empty() {
            println!("No clipboard history found");
            return Ok(());
        }

        println!("Clipboard history ({} entries):", items.len());
        for item in &items {
            print_item(item);
        }

        Ok(())
    }

    async fn search(&mut self, query: &str, limit: usize) -> Result<()> {
        let store = self.ensure_store().await?;
        let items = store.search(query, limit).await?;

        if items.is_empty() {
            println!("No items matching '{}'", query);
            return Ok(());
        }

        println!("Found {} items:", items.len());
        for item in &items {
            print_item(item);
        }

        Ok(())
    }

    async fn copy(&mut self, id: i64) -> Result<()> {
        let store = self.ensure_store().await?;
        let provider = self.ensure_provider()?;

        let Some(item) = store.get(id).await? else {
            println!("No item with id {}", id);
            return Ok(());
        };

        let content = match item.kind {
            ItemKind::Text => ClipboardContent::Text(item.content.clone()),
            ItemKind::Image => {
                ClipboardContent::Image(monitor::load_png(Path::new(&item.content))?)
            }
        };

        let writer = GatedWriter::new(provider, Arc::clone(&self.gate));
        writer.copy(&content).await?;
        println!("Copied item {} to clipboard", id);

        Ok(())
    }

    async fn favorite(&mut self, id: i64) -> Result<()> {
        let store = self.ensure_store().await?;

        if store.toggle_favorite(id).await? {
            let pinned = store
                .get(id)
                .await?
                .map(|item| item.is_favorite)
                .unwrap_or(false);
            println!(
                "Item {} {}",
                id,
                if pinned { "favorited" } else { "unfavorited" }
            );
        } else {
            println!("No item with id {}", id);
        }

        Ok(())
    }

    async fn delete(&mut self, id: i64) -> Result<()> {
        let store = self.ensure_store().await?;

        if store.delete(id).await? {
            println!("Deleted item {}", id);
        } else {
            println!("No item with id {}", id);
        }

        Ok(())
    }

    async fn clear(&mut self, everything: bool, yes: bool) -> Result<()> {
        let store = self.ensure_store().await?;
        let stats = store.stats().await?;

        let target = if everything {
            stats.total
        } else {
            stats.total - stats.favorites
        };

        if target == 0 {
            println!("Nothing to clear");
            return Ok(());
        }

        if !yes {
            let what = if everything {
                "ALL items including favorites"
            } else {
                "all non-favorite items"
            };
            print!("Clear {} ({} rows)? [y/N] ", what, target);
            std::io::stdout().flush()?;

            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            if !matches!(answer.trim(), "y" | "Y") {
                println!("Aborted");
                return Ok(());
            }
        }

        let removed = store.clear(!everything).await?;
        println!("Cleared {} items", removed);

        Ok(())
    }

    async fn stats(&mut self, json: bool) -> Result<()> {
        let store = self.ensure_store().await?;
        let stats = store.stats().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Total items: {}", stats.total);
            println!("Favorites:   {}", stats.favorites);
            println!("History cap: {}", stats.cap);
        }

        Ok(())
    }

    fn handle_config_action(&mut self, action: ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Show => {
                println!("Current Configuration:");
                println!("{:#?}", self.config);
            }
            ConfigAction::Init { force } => {
                Config::generate_example_config(force)?;
                println!("Example configuration generated");
            }
            ConfigAction::Validate => {
                // Config is already loaded and validated in CliHandler::new()
                println!("Configuration is valid");
            }
        }
        Ok(())
    }
}

/// Render a unix timestamp for display
pub(crate) fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn print_item(item: &ClipItem) {
    let star = if item.is_favorite { "*" } else { " " };
    let label = match item.kind {
        ItemKind::Text => item.preview(60),
        ItemKind::Image => format!("[image] {}", item.content),
    };

    println!(
        "{:>5} {} {} | {}",
        item.id,
        star,
        format_timestamp(item.timestamp),
        label
    );
}
