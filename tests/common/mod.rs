#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use recipe_chat::api_connection::{ApiConnectionError, GenerativeBackend};
use recipe_chat::error::StreamFailure;
use recipe_chat::notifier::RecipeNotifier;
use recipe_chat::service::RecipeService;
use recipe_chat::store::JsonFileStore;
use recipe_chat::streaming::BackendResponse;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LEMON_CHICKEN: &str = r#"{"title":"Lemon Chicken","ingredients":["chicken","lemon"],"instructions":["cook"],"prep_time":"20 minutes","difficulty":"Easy"}"#;

/// One scripted backend answer, consumed in order.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Chunks(Vec<Vec<u8>>),
    /// Chunks followed by a transport failure.
    Broken(Vec<Vec<u8>>),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn chunked(text: &str, size: usize) -> Self {
        Reply::Chunks(text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next(&self, prompt: &str) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Fail)
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        match self.next(prompt) {
            Reply::Text(text) => Ok(text),
            Reply::Chunks(chunks) => Ok(String::from_utf8_lossy(&chunks.concat()).into_owned()),
            Reply::Fail | Reply::Broken(_) => Err(ApiConnectionError::EmptyResponse),
        }
    }

    async fn open_stream(&self, prompt: &str) -> Result<BackendResponse, ApiConnectionError> {
        match self.next(prompt) {
            Reply::Text(text) => Ok(BackendResponse::Buffered(text)),
            Reply::Chunks(chunks) => Ok(BackendResponse::Pull(
                stream::iter(chunks.into_iter().map(Ok::<_, StreamFailure>)).boxed(),
            )),
            Reply::Broken(chunks) => {
                let items = chunks
                    .into_iter()
                    .map(Ok::<_, StreamFailure>)
                    .chain(std::iter::once(Err(StreamFailure("connection reset".to_string()))));
                Ok(BackendResponse::Pull(stream::iter(items).boxed()))
            }
            Reply::Fail => Err(ApiConnectionError::EmptyResponse),
        }
    }
}

pub type TestService = RecipeService<ScriptedBackend, JsonFileStore>;

pub fn service_with(replies: impl IntoIterator<Item = Reply>) -> (TestService, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(replies));
    let service = RecipeService::new(
        backend.clone(),
        Arc::new(JsonFileStore::in_memory()),
        RecipeNotifier::spawn(),
    );
    (service, backend)
}

pub fn recipe_json(title: &str, ingredients: &[&str], instructions: &[&str]) -> String {
    serde_json::json!({
        "title": title,
        "ingredients": ingredients,
        "instructions": instructions,
        "prep_time": "30 minutes",
        "difficulty": "Easy",
    })
    .to_string()
}
