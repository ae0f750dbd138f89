pub mod client;
pub mod models;
pub mod stream;
pub mod traits;
pub mod types;

pub use client::ApiClient;
pub use models::SimpleMessageRequest;
pub use stream::PushEvent;
pub use traits::Backend;
pub use types::{ApiError, Resource};
