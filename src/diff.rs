//! Semantic diff between two recipe records.
//!
//! Scalar fields are compared by exact equality. List fields (ingredients,
//! instructions, dietary restrictions) are compared by exact-string set
//! difference, so reordering identical entries is not a change.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::recipe::RecipeRecord;

pub const NO_CHANGES_SUMMARY: &str = "No significant changes detected.";

/// Shown in summaries for an absent cuisine. Never stored in a [`ChangeSet`].
const UNSPECIFIED: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Structured per-field and per-list differences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<FieldChange>,
    #[serde(rename = "addedIngredients", default, skip_serializing_if = "Vec::is_empty")]
    pub added_ingredients: Vec<String>,
    #[serde(rename = "removedIngredients", default, skip_serializing_if = "Vec::is_empty")]
    pub removed_ingredients: Vec<String>,
    #[serde(rename = "addedInstructions", default, skip_serializing_if = "Vec::is_empty")]
    pub added_instructions: Vec<String>,
    #[serde(rename = "removedInstructions", default, skip_serializing_if = "Vec::is_empty")]
    pub removed_instructions: Vec<String>,
    #[serde(rename = "addedDietary", default, skip_serializing_if = "Vec::is_empty")]
    pub added_dietary: Vec<String>,
    #[serde(rename = "removedDietary", default, skip_serializing_if = "Vec::is_empty")]
    pub removed_dietary: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.prep_time.is_none()
            && self.difficulty.is_none()
            && self.cuisine_type.is_none()
            && self.added_ingredients.is_empty()
            && self.removed_ingredients.is_empty()
            && self.added_instructions.is_empty()
            && self.removed_instructions.is_empty()
            && self.added_dietary.is_empty()
            && self.removed_dietary.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDiff {
    pub summary: String,
    pub details: ChangeSet,
}

/// Diffs `previous` against `candidate`.
///
/// Summary sentences always come in the order title, prep time, difficulty,
/// cuisine, added/removed ingredients, added/removed instructions,
/// added/removed dietary restrictions.
pub fn diff_recipes(previous: &RecipeRecord, candidate: &RecipeRecord) -> RecipeDiff {
    let mut sentences = Vec::new();
    let mut details = ChangeSet::default();

    if previous.title != candidate.title {
        sentences.push(format!(
            "Title changed from \"{}\" to \"{}\".",
            previous.title, candidate.title
        ));
        details.title = Some(change(Some(&previous.title), Some(&candidate.title)));
    }

    if previous.prep_time != candidate.prep_time {
        sentences.push(format!(
            "Prep time changed from \"{}\" to \"{}\".",
            previous.prep_time, candidate.prep_time
        ));
        details.prep_time = Some(change(Some(&previous.prep_time), Some(&candidate.prep_time)));
    }

    if previous.difficulty != candidate.difficulty {
        sentences.push(format!(
            "Difficulty changed from \"{}\" to \"{}\".",
            previous.difficulty, candidate.difficulty
        ));
        details.difficulty = Some(change(Some(&previous.difficulty), Some(&candidate.difficulty)));
    }

    if previous.cuisine_type != candidate.cuisine_type {
        sentences.push(format!(
            "Cuisine changed from \"{}\" to \"{}\".",
            previous.cuisine_type.as_deref().unwrap_or(UNSPECIFIED),
            candidate.cuisine_type.as_deref().unwrap_or(UNSPECIFIED)
        ));
        details.cuisine_type = Some(change(
            previous.cuisine_type.as_deref(),
            candidate.cuisine_type.as_deref(),
        ));
    }

    details.added_ingredients = difference(&candidate.ingredients, &previous.ingredients);
    details.removed_ingredients = difference(&previous.ingredients, &candidate.ingredients);
    push_list_sentence(&mut sentences, "Added ingredients", &details.added_ingredients, ", ");
    push_list_sentence(&mut sentences, "Removed ingredients", &details.removed_ingredients, ", ");

    // Steps often contain commas themselves.
    details.added_instructions = difference(&candidate.instructions, &previous.instructions);
    details.removed_instructions = difference(&previous.instructions, &candidate.instructions);
    push_list_sentence(&mut sentences, "Added instructions", &details.added_instructions, " | ");
    push_list_sentence(&mut sentences, "Removed instructions", &details.removed_instructions, " | ");

    let previous_diet = previous.dietary_restrictions.as_deref().unwrap_or_default();
    let candidate_diet = candidate.dietary_restrictions.as_deref().unwrap_or_default();
    details.added_dietary = difference(candidate_diet, previous_diet);
    details.removed_dietary = difference(previous_diet, candidate_diet);
    push_list_sentence(&mut sentences, "Added dietary restrictions", &details.added_dietary, ", ");
    push_list_sentence(&mut sentences, "Removed dietary restrictions", &details.removed_dietary, ", ");

    let summary = if sentences.is_empty() {
        NO_CHANGES_SUMMARY.to_string()
    } else {
        sentences.join(" ")
    };

    RecipeDiff { summary, details }
}

fn change(from: Option<&str>, to: Option<&str>) -> FieldChange {
    FieldChange {
        from: from.map(str::to_string),
        to: to.map(str::to_string),
    }
}

/// Entries of `items` absent from `other`, in `items` order (duplicates kept).
fn difference(items: &[String], other: &[String]) -> Vec<String> {
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    items
        .iter()
        .filter(|item| !other.contains(item.as_str()))
        .cloned()
        .collect()
}

fn push_list_sentence(sentences: &mut Vec<String>, label: &str, items: &[String], separator: &str) {
    if !items.is_empty() {
        sentences.push(format!("{}: {}.", label, items.join(separator)));
    }
}
