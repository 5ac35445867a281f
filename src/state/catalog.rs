use super::AppState;
use crate::types::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use ulid::Ulid;

/// One entry of the JSON catalog seed file.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    label: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl AppState {
    /// Register a votable item. The catalog is append-only; binary rounds
    /// flip `active`, nothing ever removes an item.
    pub async fn add_item(&self, label: impl Into<String>, active: bool) -> Item {
        let item = Item {
            id: Ulid::new().to_string(),
            label: label.into(),
            active,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.items.write().await.push(item.clone());
        item
    }

    /// Seed the catalog from a JSON array of `{"label": …, "active"?: …}`
    /// entries. A missing or malformed file logs a warning and seeds nothing;
    /// the server still starts.
    pub async fn load_catalog_file(&self, path: &Path) -> usize {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read catalog file");
                return 0;
            }
        };
        let entries: Vec<CatalogEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not parse catalog file");
                return 0;
            }
        };

        let count = entries.len();
        let mut items = self.items.write().await;
        for entry in entries {
            items.push(Item {
                id: Ulid::new().to_string(),
                label: entry.label,
                active: entry.active,
                created_at: chrono::Utc::now().to_rfc3339(),
            });
        }
        tracing::info!(added = count, total = items.len(), "Catalog seeded");
        count
    }

    pub async fn all_items(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }

    pub async fn active_items(&self) -> Vec<Item> {
        self.items
            .read()
            .await
            .iter()
            .filter(|i| i.active)
            .cloned()
            .collect()
    }

    pub async fn item(&self, item_id: &str) -> Option<Item> {
        self.items
            .read()
            .await
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
    }

    /// Items in the order of `ids`, for embedding in round views.
    pub async fn items_for(&self, ids: &[ItemId]) -> Vec<Item> {
        let items = self.items.read().await;
        ids.iter()
            .filter_map(|id| items.iter().find(|i| &i.id == id).cloned())
            .collect()
    }

    /// Snapshot of id -> label for tally assembly.
    pub async fn item_labels(&self) -> HashMap<ItemId, String> {
        self.items
            .read()
            .await
            .iter()
            .map(|i| (i.id.clone(), i.label.clone()))
            .collect()
    }

    /// Write an item's `active` flag. Unknown ids are skipped with a warning
    /// rather than failing the caller; the flag sink must never abort a
    /// round advance.
    pub async fn set_active(&self, item_id: &str, active: bool) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.active = active;
                tracing::info!(item_id, active, "Item flag updated");
            }
            None => {
                tracing::warn!(item_id, "Tried to flag an unknown item");
            }
        }
    }
}
