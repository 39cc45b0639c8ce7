//! Sends the latest TBM shift summary to a mobile number as a WhatsApp
//! template message.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod notifier;
pub mod record;
pub mod render;
pub mod store;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use notifier::{Notifier, NotifyError, SentNotification};
