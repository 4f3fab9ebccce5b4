use dotenv::dotenv;
use recipe_chat::api_connection::{ApiConnectionError, GenerativeBackend, Provider};
use recipe_chat::config::BackendConfig;
use recipe_chat::recipe::GenerateRecipeRequest;
use recipe_chat::recipe_parser::parse_recipe_response;
use recipe_chat::streaming::stream_recipe;
use std::env;

const TEST_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

// Cerebras-served model, fast enough for live runs
const TEST_MODEL: &str = "qwen/qwen3-32b";

fn setup_test_environment() {
    dotenv().ok();
}

fn live_provider() -> Option<Provider> {
    setup_test_environment();
    if env::var(TEST_API_KEY_ENV_VAR).is_err() {
        println!("Skipping live test: {} not set.", TEST_API_KEY_ENV_VAR);
        return None;
    }
    let config = BackendConfig {
        model: TEST_MODEL.to_string(),
        ..BackendConfig::default()
    };
    Some(Provider::openrouter(&config))
}

fn chicken_rice_prompt() -> String {
    recipe_chat::prompt::build_generation_prompt(&GenerateRecipeRequest {
        ingredients: vec!["chicken".to_string(), "rice".to_string()],
        ..Default::default()
    })
}

#[tokio::test]
async fn test_missing_api_key_error() {
    setup_test_environment();
    let config = BackendConfig {
        api_key_env_var: "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ".to_string(),
        ..BackendConfig::default()
    };
    let provider = Provider::openrouter(&config);

    let result = provider.complete("Hello").await;
    assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    if let Err(ApiConnectionError::MissingApiKey(key_name)) = result {
        assert_eq!(key_name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    }

    let streamed = provider.open_stream("Hello").await;
    assert!(matches!(streamed, Err(ApiConnectionError::MissingApiKey(_))));
}

#[test]
fn test_request_carries_configured_sampling() {
    let provider = Provider::openrouter(&BackendConfig::default());
    let request = provider.prompt_request("Hello", true);
    assert_eq!(request.model, provider.model());
    assert_eq!(request.stream, Some(true));
    assert_eq!(request.messages.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_successful_buffered_generation() {
    let Some(provider) = live_provider() else {
        return;
    };
    let text = provider.complete(&chicken_rice_prompt()).await.unwrap();
    let recipe = parse_recipe_response(&text).unwrap();
    println!("Generated: {}", recipe.title);
    assert!(!recipe.ingredients.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_successful_streamed_generation() {
    let Some(provider) = live_provider() else {
        return;
    };
    let response = provider.open_stream(&chicken_rice_prompt()).await.unwrap();
    let mut chunks: Vec<String> = Vec::new();
    let recipe = stream_recipe(response, &mut chunks).await.unwrap();
    println!("Streamed {} chunks for {}", chunks.len(), recipe.title);
    assert!(!chunks.is_empty());
    assert!(!recipe.instructions.is_empty());
}
