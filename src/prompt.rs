use crate::recipe::{GenerateRecipeRequest, RecipeRecord};

/// Output shape requested from the backend for both generation and revision.
const RECIPE_JSON_TEMPLATE: &str = r#"{
  "title": "Recipe name",
  "ingredients": ["ingredient 1 with quantity", "ingredient 2 with quantity"],
  "instructions": ["step 1", "step 2", "step 3"],
  "prep_time": "time in minutes (e.g., '30 minutes')",
  "difficulty": "Easy, Medium, or Hard"
}"#;

/// Builds the generation prompt from the caller's ingredients and constraints.
///
/// The dietary clause is only added for a non-empty restriction list and the
/// cuisine clause only for a non-blank cuisine.
pub fn build_generation_prompt(request: &GenerateRecipeRequest) -> String {
    let mut prompt = format!(
        "You are a professional chef. Generate a detailed recipe using the following ingredients: {}.",
        request.ingredients.join(", ")
    );

    if let Some(restrictions) = request.dietary_restrictions.as_deref() {
        if !restrictions.is_empty() {
            prompt.push_str(&format!(" The recipe must be {}.", restrictions.join(" and ")));
        }
    }

    if let Some(cuisine) = request.cuisine_type.as_deref() {
        if !cuisine.trim().is_empty() {
            prompt.push_str(&format!(" The recipe should be {} cuisine.", cuisine.trim()));
        }
    }

    prompt.push_str(
        "\n\nPlease provide the recipe in the following JSON format (respond ONLY with valid JSON, no additional text):\n",
    );
    prompt.push_str(RECIPE_JSON_TEMPLATE);
    prompt
}

/// Builds the revision prompt: the full current record plus the instruction verbatim.
pub fn build_modification_prompt(
    recipe: &RecipeRecord,
    instruction: &str,
) -> Result<String, serde_json::Error> {
    let recipe_json = serde_json::to_string_pretty(recipe)?;
    Ok(format!(
        "You are a professional chef and recipe editor. Given the following recipe JSON:
{recipe_json}

Modify the recipe according to the user's instruction: \"{instruction}\".
Return ONLY valid JSON in the same format as this recipe, with the keys title, ingredients (array), instructions (array), prep_time and difficulty, plus cuisine_type and dietary_restrictions if applicable:
{RECIPE_JSON_TEMPLATE}
Do not include any explanation or surrounding text."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::sample_record;

    fn request(ingredients: &[&str]) -> GenerateRecipeRequest {
        GenerateRecipeRequest {
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn plain_request_has_no_optional_clauses() {
        let prompt = build_generation_prompt(&request(&["chicken", "rice"]));
        assert!(prompt.contains("chicken, rice"));
        assert!(prompt.starts_with("You are a professional chef."));
        assert!(!prompt.contains("The recipe must be"));
        assert!(!prompt.contains("cuisine."));
    }

    #[test]
    fn dietary_restrictions_are_joined_conjunctively() {
        let mut req = request(&["tofu"]);
        req.dietary_restrictions = Some(vec!["vegan".to_string(), "gluten-free".to_string()]);
        let prompt = build_generation_prompt(&req);
        assert!(prompt.contains("The recipe must be vegan and gluten-free."));
    }

    #[test]
    fn empty_restriction_list_adds_nothing() {
        let mut req = request(&["tofu"]);
        req.dietary_restrictions = Some(vec![]);
        assert!(!build_generation_prompt(&req).contains("The recipe must be"));
    }

    #[test]
    fn cuisine_clause() {
        let mut req = request(&["pasta"]);
        req.cuisine_type = Some("Italian".to_string());
        assert!(build_generation_prompt(&req).contains("The recipe should be Italian cuisine."));
    }

    #[test]
    fn schema_template_lists_the_five_keys() {
        let prompt = build_generation_prompt(&request(&["egg"]));
        for key in ["\"title\"", "\"ingredients\"", "\"instructions\"", "\"prep_time\"", "\"difficulty\""] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains("respond ONLY with valid JSON"));
    }

    #[test]
    fn modification_prompt_embeds_record_and_instruction() {
        let record = sample_record();
        let prompt = build_modification_prompt(&record, "make it vegan").unwrap();
        assert!(prompt.contains("\"recipe_id\": \"draft-1\""));
        assert!(prompt.contains("\"Chicken Rice\""));
        assert!(prompt.contains("\"make it vegan\""));
        assert!(prompt.contains("\"prep_time\""));
    }
}
