//! Recipe persistence.
//!
//! [`RecipeStore`] is the seam the service talks to. [`JsonFileStore`] keeps
//! the collection in memory and snapshots it to a JSON file after every
//! mutation.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::recipe::{Pagination, RecipeRecord, RecipeUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("recipe not found: {0}")]
    NotFound(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Stores a draft, assigning `id` and timestamps.
    async fn create(&self, draft: RecipeRecord) -> Result<RecipeRecord, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<RecipeRecord>, StoreError>;

    async fn update(&self, id: &str, update: RecipeUpdate) -> Result<RecipeRecord, StoreError>;

    async fn rate(&self, id: &str, rating: u8) -> Result<RecipeRecord, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// One page of records, newest first, plus the total record count.
    async fn list(&self, pagination: Pagination) -> Result<(Vec<RecipeRecord>, usize), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    recipes: Vec<RecipeRecord>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    storage_file: Option<PathBuf>,
    recipes: RwLock<Vec<RecipeRecord>>,
}

impl JsonFileStore {
    /// Opens the store at `storage_file`, loading it if it exists and is not empty.
    pub async fn open(storage_file: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_file = storage_file.as_ref().to_path_buf();
        let snapshot = match fs::read_to_string(&storage_file).await {
            Ok(contents) if !contents.trim().is_empty() => {
                serde_json::from_str::<StoreSnapshot>(&contents)?
            }
            Ok(_) => StoreSnapshot::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: storage_file,
                    source,
                })
            }
        };
        info!(path = %storage_file.display(), recipes = snapshot.recipes.len(), "recipe store opened");
        Ok(Self {
            storage_file: Some(storage_file),
            recipes: RwLock::new(snapshot.recipes),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            storage_file: None,
            recipes: RwLock::new(Vec::new()),
        }
    }

    async fn save(&self, recipes: &[RecipeRecord]) -> Result<(), StoreError> {
        let Some(path) = &self.storage_file else {
            return Ok(());
        };
        let snapshot = StoreSnapshot {
            recipes: recipes.to_vec(),
        };
        let serialized = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, serialized).await.map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), recipes = recipes.len(), "recipe store saved");
        Ok(())
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<RecipeRecord, StoreError>
    where
        F: FnOnce(&mut RecipeRecord) + Send,
    {
        let mut recipes = self.recipes.write().await;
        let record = recipes
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        change(record);
        record.updated_at = Some(Utc::now());
        let updated = record.clone();
        self.save(&recipes).await?;
        Ok(updated)
    }
}

#[async_trait]
impl RecipeStore for JsonFileStore {
    async fn create(&self, mut draft: RecipeRecord) -> Result<RecipeRecord, StoreError> {
        let now = Utc::now();
        draft.id = Some(Uuid::new_v4().to_string());
        draft.created_at = Some(now);
        draft.updated_at = Some(now);

        let mut recipes = self.recipes.write().await;
        recipes.push(draft.clone());
        self.save(&recipes).await?;
        Ok(draft)
    }

    async fn get(&self, id: &str) -> Result<Option<RecipeRecord>, StoreError> {
        let recipes = self.recipes.read().await;
        Ok(recipes.iter().find(|r| r.id.as_deref() == Some(id)).cloned())
    }

    async fn update(&self, id: &str, update: RecipeUpdate) -> Result<RecipeRecord, StoreError> {
        self.modify(id, move |record| update.apply_to(record)).await
    }

    async fn rate(&self, id: &str, rating: u8) -> Result<RecipeRecord, StoreError> {
        self.modify(id, move |record| record.rating = Some(rating)).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut recipes = self.recipes.write().await;
        let before = recipes.len();
        recipes.retain(|r| r.id.as_deref() != Some(id));
        if recipes.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(&recipes).await
    }

    async fn list(&self, pagination: Pagination) -> Result<(Vec<RecipeRecord>, usize), StoreError> {
        let recipes = self.recipes.read().await;
        // Reverse first so equal timestamps keep newest-inserted first.
        let mut ordered: Vec<&RecipeRecord> = recipes.iter().rev().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page = ordered
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        Ok((page, recipes.len()))
    }
}
