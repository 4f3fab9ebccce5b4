//! The orchestration boundary.
//!
//! [`RecipeService`] wires the pipeline to its collaborators: a generative
//! backend, a recipe store and the realtime notifier. Core failures are
//! logged here with their cause and collapsed into the opaque
//! [`ServiceError::GenerationFailed`] / [`ServiceError::ModificationFailed`].

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api_connection::GenerativeBackend;
use crate::envelope::final_marker;
use crate::error::{CoreError, ServiceError};
use crate::notifier::RecipeNotifier;
use crate::prompt::build_generation_prompt;
use crate::recipe::{
    validate_rating, GenerateRecipeRequest, PageInfo, Pagination, RecipePage, RecipeRecord,
    RecipeUpdate,
};
use crate::recipe_parser::parse_recipe_response;
use crate::revision::{revise_recipe, RevisionPreview};
use crate::store::RecipeStore;
use crate::streaming::{stream_recipe, ChunkSink};

pub struct RecipeService<B: ?Sized, S: ?Sized> {
    backend: Arc<B>,
    store: Arc<S>,
    notifier: RecipeNotifier,
}

impl<B, S> RecipeService<B, S>
where
    B: GenerativeBackend + ?Sized,
    S: RecipeStore + ?Sized,
{
    pub fn new(backend: Arc<B>, store: Arc<S>, notifier: RecipeNotifier) -> Self {
        Self {
            backend,
            store,
            notifier,
        }
    }

    pub fn notifier(&self) -> &RecipeNotifier {
        &self.notifier
    }

    /// Generates a draft in one backend round trip.
    pub async fn generate(&self, request: &GenerateRecipeRequest) -> Result<RecipeRecord, ServiceError> {
        request.validate()?;
        let prompt = build_generation_prompt(request);

        let recipe = self.complete_recipe(&prompt).await.map_err(|e| {
            log_core_failure("generate", &e);
            ServiceError::GenerationFailed
        })?;
        info!(recipe_id = %recipe.recipe_id, title = %recipe.title, "recipe generated");
        Ok(recipe)
    }

    /// Generates a draft while forwarding raw backend text to `sink`.
    ///
    /// On success the sink finally receives the `[FINAL_JSON]` frame. On
    /// failure nothing more is written, so the stream ends without a marker.
    pub async fn generate_stream<K: ChunkSink + ?Sized>(
        &self,
        request: &GenerateRecipeRequest,
        sink: &mut K,
    ) -> Result<RecipeRecord, ServiceError> {
        request.validate()?;
        let prompt = build_generation_prompt(request);

        let recipe = self.stream_recipe_to(&prompt, &mut *sink).await.map_err(|e| {
            log_core_failure("generate_stream", &e);
            ServiceError::GenerationFailed
        })?;

        match final_marker(&recipe) {
            Ok(frame) => {
                if let Err(e) = sink.send(&frame) {
                    warn!(error = %e, "final frame not delivered");
                }
            }
            Err(e) => {
                error!(error = %e, "failed to encode final frame");
                return Err(ServiceError::GenerationFailed);
            }
        }

        info!(recipe_id = %recipe.recipe_id, title = %recipe.title, "recipe streamed");
        Ok(recipe)
    }

    /// Produces a revision preview for a stored recipe. Nothing is persisted.
    pub async fn chat_modify(&self, id: &str, message: &str) -> Result<RevisionPreview, ServiceError> {
        if message.trim().is_empty() {
            return Err(ServiceError::Validation("Message is required".to_string()));
        }
        let original = self.get(id).await?;

        revise_recipe(self.backend.as_ref(), &original, message)
            .await
            .map_err(|e| {
                log_core_failure("chat_modify", &e);
                ServiceError::ModificationFailed
            })
    }

    pub async fn save(&self, draft: RecipeRecord) -> Result<RecipeRecord, ServiceError> {
        draft.validate_for_save()?;
        let saved = self.store.create(draft).await?;
        info!(id = ?saved.id, recipe_id = %saved.recipe_id, "recipe saved");
        Ok(saved)
    }

    pub async fn get(&self, id: &str) -> Result<RecipeRecord, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    pub async fn list(&self, pagination: Pagination) -> Result<RecipePage, ServiceError> {
        let (recipes, total) = self.store.list(pagination).await?;
        Ok(RecipePage {
            recipes,
            pagination: PageInfo {
                page: pagination.page,
                limit: pagination.limit,
                total,
                total_pages: pagination.total_pages(total),
            },
        })
    }

    /// Persists an accepted update, then pushes the stored record to every
    /// viewer of that recipe.
    pub async fn update(&self, id: &str, update: RecipeUpdate) -> Result<RecipeRecord, ServiceError> {
        update.validate()?;
        let updated = self.store.update(id, update).await?;

        match self.notifier.publish(id, &updated).await {
            Ok(delivered) => info!(id, delivered, "recipe update broadcast"),
            Err(e) => warn!(id, error = %e, "recipe update not broadcast"),
        }
        Ok(updated)
    }

    pub async fn rate(&self, id: &str, rating: u8) -> Result<RecipeRecord, ServiceError> {
        validate_rating(rating)?;
        Ok(self.store.rate(id, rating).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        info!(id, "recipe deleted");
        Ok(())
    }

    async fn complete_recipe(&self, prompt: &str) -> Result<RecipeRecord, CoreError> {
        let text = self.backend.complete(prompt).await?;
        Ok(parse_recipe_response(&text)?)
    }

    async fn stream_recipe_to<K: ChunkSink + ?Sized>(
        &self,
        prompt: &str,
        sink: &mut K,
    ) -> Result<RecipeRecord, CoreError> {
        let response = self.backend.open_stream(prompt).await?;
        stream_recipe(response, sink).await
    }
}

fn log_core_failure(operation: &str, err: &CoreError) {
    match err.raw_text() {
        Some(raw) => error!(operation, error = %err, raw, "recipe pipeline failed"),
        None => error!(operation, error = %err, "recipe pipeline failed"),
    }
}
