//! Message handling and user interactions for the bot.
//!
//! This module provides the path an inbound message takes:
//! - The filter chain decides whether a message is handled at all
//! - The invoker resumes a pending conversation or asks the factory for a new processor
//! - Processors carry out the commands and reply
//!
//! The Rocket.Chat notifier lives here as well; it is the only interaction the bot starts on its own.

pub mod factory;
pub mod filter;
pub mod handler;
pub mod invoker;
pub mod notifier;
pub mod processor;
pub mod storage;
