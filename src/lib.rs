//! Library root for `rocket-notify-bot`.
//!
//! Rocket-notify-bot is a Telegram bot that bridges a Rocket.Chat group to Telegram chats:
//! - Chats subscribe and unsubscribe with bot commands, optionally guarded by a secret key
//! - New messages in the watched Rocket.Chat group trigger a notification to every subscriber
//! - Subscribers can get custom notification texts when particular users are mentioned
//!
//! The bot integrates with Telegram for chat, SurrealDB for storage, and the Rocket.Chat REST API.
//! The architecture is built around extensible traits that allow for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database, chat, and Rocket.Chat clients
/// - Starts the message loop and the notifier
pub async fn start(config: Config) -> Void {
    info!("Starting rocket-notify-bot ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
