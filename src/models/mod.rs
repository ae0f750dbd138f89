pub mod context;
pub mod message;
pub mod segment;
pub mod settings;
pub mod trace;

pub use context::ConversationContext;
pub use message::{Message, Role};
pub use segment::AnswerSegment;
pub use settings::Settings;
pub use trace::RequestTrace;
