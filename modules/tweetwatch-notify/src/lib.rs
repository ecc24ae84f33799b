pub mod backend;
pub mod discord;
pub mod dispatcher;
pub mod format;
pub mod noop;

pub use backend::NotifyBackend;
pub use discord::DiscordWebhook;
pub use dispatcher::Dispatcher;
pub use format::{format_message, FormattedMessage, MessageField};
pub use noop::NoopBackend;
