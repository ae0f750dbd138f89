pub mod activity;
pub mod answer;
pub mod chat;
pub mod context;
pub mod conversation;
pub mod database;
pub mod history;
pub mod inspector;
pub mod markdown;
pub mod settings;
pub mod thread_sync;

pub use conversation::ConversationLog;
pub use database::Database;
pub use settings::SettingsStore;
pub use thread_sync::{ChangeOrigin, Location, LocationChange, SyncAction, ThreadSync};
