pub mod config;
pub mod error;
pub mod presence;
pub mod publisher;
pub mod signature;

pub use config::{AblyConfig, ConfigError};
pub use error::{PublishError, WebhookError};
pub use presence::{extract_transitions, PresenceWebhookBody};
pub use publisher::{AblyEventPublisher, LoggingEventPublisher};
pub use signature::{verify, ApiKey};
