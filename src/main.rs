use anyhow::{Context, Result};
use recipe_chat::api_connection::Provider;
use recipe_chat::cli::{parse_args, Command};
use recipe_chat::config::AppConfig;
use recipe_chat::logging::init_tracing;
use recipe_chat::notifier::RecipeNotifier;
use recipe_chat::recipe::{GenerateRecipeRequest, Pagination, RecipeRecord, RecipeUpdate};
use recipe_chat::service::RecipeService;
use recipe_chat::store::JsonFileStore;
use recipe_chat::streaming::{sink_fn, SinkError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

type Service = RecipeService<Provider, JsonFileStore>;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode output")?);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse JSON in '{}'", path.display()))
}

async fn run(service: &Service, command: Command) -> Result<()> {
    match command {
        Command::Generate {
            ingredients,
            dietary_restrictions,
            cuisine,
            stream,
        } => {
            let request = GenerateRecipeRequest {
                ingredients,
                dietary_restrictions: (!dietary_restrictions.is_empty()).then_some(dietary_restrictions),
                cuisine_type: cuisine,
            };
            if stream {
                let mut stdout = sink_fn(|chunk: &str| {
                    let mut out = std::io::stdout().lock();
                    out.write_all(chunk.as_bytes())
                        .and_then(|_| out.flush())
                        .map_err(|e| SinkError(e.to_string()))
                });
                service.generate_stream(&request, &mut stdout).await?;
                println!();
            } else {
                print_json(&service.generate(&request).await?)?;
            }
        }
        Command::Save { file } => {
            let draft: RecipeRecord = read_json(&file).await?;
            print_json(&service.save(draft).await?)?;
        }
        Command::List { page, limit } => {
            let pagination = Pagination::new(page, limit)?;
            print_json(&service.list(pagination).await?)?;
        }
        Command::Show { id } => print_json(&service.get(&id).await?)?,
        Command::Chat { id, message, out } => {
            let preview = service.chat_modify(&id, &message).await?;
            if let Some(path) = out {
                let modified = serde_json::to_string_pretty(&preview.modified)?;
                fs::write(&path, modified)
                    .await
                    .with_context(|| format!("Failed to write '{}'", path.display()))?;
            }
            print_json(&preview)?;
        }
        Command::Apply { id, file } => {
            let accepted: RecipeRecord = read_json(&file).await?;
            print_json(&service.update(&id, RecipeUpdate::from(accepted)).await?)?;
        }
        Command::Rate { id, rating } => print_json(&service.rate(&id, rating).await?)?,
        Command::Delete { id } => {
            service.delete(&id).await?;
            println!("Deleted recipe {}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = parse_args();
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(model) = cli.model {
        config.backend.model = model;
    }
    if let Some(store_path) = cli.store {
        config.store_path = store_path;
    }

    let store = JsonFileStore::open(&config.store_path)
        .await
        .with_context(|| format!("Failed to open recipe store '{}'", config.store_path.display()))?;
    let backend = Provider::openrouter(&config.backend);
    let service = RecipeService::new(Arc::new(backend), Arc::new(store), RecipeNotifier::spawn());

    run(&service, cli.command).await
}
