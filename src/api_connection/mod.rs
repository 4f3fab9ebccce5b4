pub mod backend;
pub mod connection;
pub mod endpoints;

pub use backend::GenerativeBackend;
pub use connection::{ApiConnectionError, SseDecoder, SseFrame};
pub use endpoints::Provider;
