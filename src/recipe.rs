use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// The canonical recipe entity.
///
/// A record without `id` is a draft: it was produced by generation or
/// revision and has not been stored yet. `recipe_id` is assigned when the
/// draft is generated and survives persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub recipe_id: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: String,
    /// Usually "Easy", "Medium" or "Hard", but not enforced.
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecipeRecord {
    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }

    /// Structural checks applied before a draft is handed to the store.
    pub fn validate_for_save(&self) -> Result<(), ServiceError> {
        if self.recipe_id.trim().is_empty() {
            return Err(ServiceError::Validation("recipe_id must not be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(ServiceError::Validation("title must not be empty".to_string()));
        }
        if self.ingredients.is_empty() {
            return Err(ServiceError::Validation(
                "at least one ingredient is required".to_string(),
            ));
        }
        if self.instructions.is_empty() {
            return Err(ServiceError::Validation(
                "at least one instruction is required".to_string(),
            ));
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

/// Caller input for a new generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRecipeRequest {
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
}

impl GenerateRecipeRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.ingredients.is_empty() {
            return Err(ServiceError::Validation(
                "At least one ingredient is required".to_string(),
            ));
        }
        if self.ingredients.iter().any(|i| i.trim().is_empty()) {
            return Err(ServiceError::Validation(
                "ingredients must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update sent by a client once it accepts a revision preview.
///
/// Identity fields (`id`, `recipe_id`, `created_at`) are not part of an
/// update and are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl RecipeUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(ServiceError::Validation("title must not be empty".to_string()));
        }
        if matches!(&self.ingredients, Some(list) if list.is_empty()) {
            return Err(ServiceError::Validation(
                "at least one ingredient is required".to_string(),
            ));
        }
        if matches!(&self.instructions, Some(list) if list.is_empty()) {
            return Err(ServiceError::Validation(
                "at least one instruction is required".to_string(),
            ));
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    pub fn apply_to(self, record: &mut RecipeRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(ingredients) = self.ingredients {
            record.ingredients = ingredients;
        }
        if let Some(instructions) = self.instructions {
            record.instructions = instructions;
        }
        if let Some(prep_time) = self.prep_time {
            record.prep_time = prep_time;
        }
        if let Some(difficulty) = self.difficulty {
            record.difficulty = difficulty;
        }
        if let Some(cuisine_type) = self.cuisine_type {
            record.cuisine_type = Some(cuisine_type);
        }
        if let Some(dietary_restrictions) = self.dietary_restrictions {
            record.dietary_restrictions = Some(dietary_restrictions);
        }
        if let Some(rating) = self.rating {
            record.rating = Some(rating);
        }
    }
}

impl From<RecipeRecord> for RecipeUpdate {
    /// Turns an accepted revision preview into the update that stores it.
    fn from(record: RecipeRecord) -> Self {
        Self {
            title: Some(record.title),
            ingredients: Some(record.ingredients),
            instructions: Some(record.instructions),
            prep_time: Some(record.prep_time),
            difficulty: Some(record.difficulty),
            cuisine_type: record.cuisine_type,
            dietary_restrictions: record.dietary_restrictions,
            rating: record.rating,
        }
    }
}

pub fn validate_rating(rating: u8) -> Result<(), ServiceError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ServiceError> {
        let pagination = Self {
            page: page.unwrap_or(DEFAULT_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        };
        if pagination.page == 0 {
            return Err(ServiceError::Validation("page must be at least 1".to_string()));
        }
        if pagination.limit == 0 || pagination.limit > MAX_PAGE_LIMIT {
            return Err(ServiceError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(pagination)
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipePage {
    pub recipes: Vec<RecipeRecord>,
    pub pagination: PageInfo,
}

#[cfg(test)]
pub(crate) fn sample_record() -> RecipeRecord {
    RecipeRecord {
        id: None,
        recipe_id: "draft-1".to_string(),
        title: "Chicken Rice".to_string(),
        ingredients: vec!["chicken".to_string(), "rice".to_string()],
        instructions: vec!["boil rice".to_string(), "fry chicken".to_string()],
        prep_time: "30 minutes".to_string(),
        difficulty: "Easy".to_string(),
        cuisine_type: None,
        dietary_restrictions: None,
        rating: None,
        created_at: None,
        updated_at: None,
    }
}
