pub mod chat_view;
pub mod input_area;
pub mod inspector;
pub mod message_widget;
pub mod onboarding;
pub mod window;
