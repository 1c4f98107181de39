//! Interactive history picker
//!
//! A small crossterm surface over the history store: live substring
//! search, favorites-first listing, copy-on-enter through the echo gate,
//! favorite toggling, deletion, and confirmed clearing.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::clipboard::{ClipboardContent, GatedWriter};
use crate::history::{ClipItem, HistoryStore, ItemKind, StoreStats};
use crate::monitor::{self, Captured};

const PICKER_LIMIT: usize = 100;

pub struct HistoryPicker {
    store: Arc<HistoryStore>,
    writer: GatedWriter,
    events: Option<broadcast::Receiver<Captured>>,
    items: Vec<ClipItem>,
    counts: Option<StoreStats>,
    selected: usize,
    query: String,
    status: String,
    confirm_clear: bool,
}

enum PickerAction {
    Continue,
    Exit,
}

impl HistoryPicker {
    pub fn new(
        store: Arc<HistoryStore>,
        writer: GatedWriter,
        events: Option<broadcast::Receiver<Captured>>,
    ) -> Self {
        Self {
            store,
            writer,
            events,
            items: Vec::new(),
            counts: None,
            selected: 0,
            query: String::new(),
            status: String::new(),
            confirm_clear: false,
        }
    }

    pub async fn show(&mut self) -> Result<()> {
        self.reload().await;

        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;

        let result = self.run().await;

        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;

        result
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            self.draw()?;

            // Poll keys with a timeout so monitor events can refresh the list
            if event::poll(Duration::from_millis(150))? {
                if let Event::Key(key_event) = event::read()? {
                    match self.handle_key_event(key_event).await {
                        PickerAction::Exit => break,
                        PickerAction::Continue => {}
                    }
                }
            } else if self.drain_events() {
                self.reload().await;
            }
        }

        Ok(())
    }

    /// Returns true when the monitor captured something since the last check
    fn drain_events(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };

        let mut fresh = false;
        loop {
            match events.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => fresh = true,
                Err(_) => break,
            }
        }
        fresh
    }

    async fn reload(&mut self) {
        let result = if self.query.trim().is_empty() {
            self.store.get_history(PICKER_LIMIT).await
        } else {
            self.store.search(&self.query, PICKER_LIMIT).await
        };

        match result {
            Ok(items) => {
                self.items = items;
                if self.selected >= self.items.len() {
                    self.selected = self.items.len().saturating_sub(1);
                }
            }
            Err(e) => self.status = format!("Error loading history: {:#}", e),
        }

        match self.store.stats().await {
            Ok(stats) => self.counts = Some(stats),
            Err(e) => debug!("failed to load stats: {:#}", e),
        }
    }

    fn draw(&self) -> Result<()> {
        print!("\x1B[2J\x1B[H"); // Clear screen and move cursor to top

        print!("ClipKeep History\r\n");
        print!("================\r\n");
        print!(
            "Type to search | Enter copy | ^F favorite | ^D delete | ^X clear | Esc quit\r\n"
        );
        print!("Search: {}\r\n\r\n", self.query);

        if self.items.is_empty() {
            print!("  (no items)\r\n");
        }

        for (i, item) in self.items.iter().enumerate() {
            let cursor = if i == self.selected { "► " } else { "  " };
            let star = if item.is_favorite { "*" } else { " " };

            let label = match item.kind {
                ItemKind::Text => item.preview(70),
                ItemKind::Image => format!("[image] {}", item.content),
            };

            print!(
                "{}{} {} | {}\r\n",
                cursor,
                star,
                super::format_timestamp(item.timestamp),
                label
            );
        }

        let counts = self
            .counts
            .map(|stats| format!("Total: {} | Favorites: {}", stats.total, stats.favorites))
            .unwrap_or_default();

        if self.confirm_clear {
            print!("\r\nClear all non-favorite items? Press y to confirm.\r\n");
        } else if self.status.is_empty() {
            print!("\r\n{}\r\n", counts);
        } else {
            print!("\r\n{} | {}\r\n", counts, self.status);
        }

        io::stdout().flush()?;
        Ok(())
    }

    async fn handle_key_event(&mut self, key_event: KeyEvent) -> PickerAction {
        // A pending clear confirmation swallows the next key
        if self.confirm_clear {
            self.confirm_clear = false;
            if let KeyCode::Char('y') = key_event.code {
                self.clear_history().await;
            } else {
                self.status = "Clear aborted".to_string();
            }
            return PickerAction::Continue;
        }

        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

        match key_event.code {
            KeyCode::Esc => PickerAction::Exit,
            KeyCode::Char('c') if ctrl => PickerAction::Exit,
            KeyCode::Enter => {
                self.copy_selected().await;
                PickerAction::Continue
            }
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                PickerAction::Continue
            }
            KeyCode::Down => {
                if self.selected < self.items.len().saturating_sub(1) {
                    self.selected += 1;
                }
                PickerAction::Continue
            }
            KeyCode::Char('f') if ctrl => {
                self.toggle_favorite().await;
                PickerAction::Continue
            }
            KeyCode::Char('d') if ctrl => {
                self.delete_selected().await;
                PickerAction::Continue
            }
            KeyCode::Char('x') if ctrl => {
                self.confirm_clear = true;
                PickerAction::Continue
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.selected = 0; // Reset selection when searching
                self.reload().await;
                PickerAction::Continue
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.selected = 0;
                self.reload().await;
                PickerAction::Continue
            }
            _ => PickerAction::Continue,
        }
    }

    async fn copy_selected(&mut self) {
        let Some(item) = self.items.get(self.selected) else {
            self.status = "No item selected".to_string();
            return;
        };

        debug!(id = item.id, "copying entry to clipboard");

        let content = match item.kind {
            ItemKind::Text => ClipboardContent::Text(item.content.clone()),
            ItemKind::Image => match monitor::load_png(Path::new(&item.content)) {
                Ok(raw) => ClipboardContent::Image(raw),
                Err(e) => {
                    self.status = format!("Error loading image: {:#}", e);
                    return;
                }
            },
        };

        match self.writer.copy(&content).await {
            Ok(()) => self.status = "Copied to clipboard".to_string(),
            Err(e) => self.status = format!("Error copying: {:#}", e),
        }
    }

    async fn toggle_favorite(&mut self) {
        let Some(item) = self.items.get(self.selected) else {
            self.status = "No item selected".to_string();
            return;
        };

        match self.store.toggle_favorite(item.id).await {
            Ok(true) => {
                self.status = "Favorite toggled".to_string();
                self.reload().await;
            }
            Ok(false) => self.status = "Item no longer exists".to_string(),
            Err(e) => self.status = format!("Error toggling favorite: {:#}", e),
        }
    }

    async fn delete_selected(&mut self) {
        let Some(item) = self.items.get(self.selected) else {
            self.status = "No item selected".to_string();
            return;
        };

        match self.store.delete(item.id).await {
            Ok(true) => {
                self.status = "Item deleted".to_string();
                self.reload().await;
            }
            Ok(false) => self.status = "Item no longer exists".to_string(),
            Err(e) => self.status = format!("Error deleting: {:#}", e),
        }
    }

    async fn clear_history(&mut self) {
        match self.store.clear(true).await {
            Ok(removed) => {
                self.status = format!("Cleared {} items", removed);
                self.reload().await;
            }
            Err(e) => self.status = format!("Error clearing history: {:#}", e),
        }
    }
}

impl Drop for HistoryPicker {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}
