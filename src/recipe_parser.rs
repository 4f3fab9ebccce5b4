use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ParseFailure;
use crate::recipe::RecipeRecord;

/// Shape the backend is asked to produce.
///
/// `cuisine_type` and `dietary_restrictions` only show up in revision answers.
#[derive(Debug, Deserialize)]
struct GeneratedRecipe {
    title: String,
    ingredients: Vec<String>,
    instructions: Vec<String>,
    #[serde(alias = "prepTime")]
    prep_time: String,
    difficulty: String,
    #[serde(default, alias = "cuisineType")]
    cuisine_type: Option<String>,
    #[serde(default, alias = "dietaryRestrictions")]
    dietary_restrictions: Option<Vec<String>>,
}

/// Removes a surrounding markdown code fence (optionally tagged `json`).
///
/// Text that does not open with a fence is returned trimmed and otherwise
/// unchanged.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_fence) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match after_fence.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &after_fence[4..],
        _ => after_fence,
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Parses raw backend text into a fresh draft record.
///
/// Every successful parse gets a new `recipe_id`, even when the text matches
/// an earlier draft.
pub fn parse_recipe_response(text: &str) -> Result<RecipeRecord, ParseFailure> {
    let cleaned = strip_code_fences(text);
    debug!(len = cleaned.len(), "parsing backend response");

    if cleaned.is_empty() {
        return Err(ParseFailure::new("response is empty", text));
    }

    let parsed: GeneratedRecipe = serde_json::from_str(cleaned)
        .map_err(|e| ParseFailure::new(e.to_string(), text))?;

    check_generated(&parsed).map_err(|reason| ParseFailure::new(reason, text))?;

    Ok(RecipeRecord {
        id: None,
        recipe_id: Uuid::new_v4().to_string(),
        title: parsed.title,
        ingredients: parsed.ingredients,
        instructions: parsed.instructions,
        prep_time: parsed.prep_time,
        difficulty: parsed.difficulty,
        cuisine_type: parsed.cuisine_type.filter(|c| !c.trim().is_empty()),
        dietary_restrictions: parsed.dietary_restrictions,
        rating: None,
        created_at: None,
        updated_at: None,
    })
}

fn check_generated(recipe: &GeneratedRecipe) -> Result<(), String> {
    if recipe.title.trim().is_empty() {
        return Err("title is empty".to_string());
    }
    if recipe.ingredients.is_empty() {
        return Err("ingredients list is empty".to_string());
    }
    if recipe.instructions.is_empty() {
        return Err("instructions list is empty".to_string());
    }
    if recipe.ingredients.iter().any(|i| i.trim().is_empty()) {
        return Err("ingredients contain a blank entry".to_string());
    }
    if recipe.instructions.iter().any(|s| s.trim().is_empty()) {
        return Err("instructions contain a blank step".to_string());
    }
    Ok(())
}
