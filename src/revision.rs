use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api_connection::GenerativeBackend;
use crate::diff::{diff_recipes, ChangeSet};
use crate::error::CoreError;
use crate::prompt::build_modification_prompt;
use crate::recipe::RecipeRecord;
use crate::recipe_parser::parse_recipe_response;

/// A proposed revision, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionPreview {
    pub modified: RecipeRecord,
    pub summary: String,
    pub details: ChangeSet,
}

/// Asks the backend to apply `instruction` to `original` and diffs the answer
/// against it as returned. Nothing is written anywhere.
pub async fn revise_recipe<B: GenerativeBackend + ?Sized>(
    backend: &B,
    original: &RecipeRecord,
    instruction: &str,
) -> Result<RevisionPreview, CoreError> {
    let prompt = build_modification_prompt(original, instruction).map_err(CoreError::Encode)?;
    let text = backend.complete(&prompt).await?;
    let modified = parse_recipe_response(&text)?;

    let diff = diff_recipes(original, &modified);
    debug!(recipe_id = %original.recipe_id, summary = %diff.summary, "revision prepared");

    Ok(RevisionPreview {
        modified,
        summary: diff.summary,
        details: diff.details,
    })
}
