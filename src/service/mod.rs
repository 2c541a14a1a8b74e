//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the bot:
//! - Chat services (e.g., Telegram)
//! - Database services (e.g., SurrealDB)
//! - The watched chat room (Rocket.Chat)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod db;
pub mod rocket;
pub mod subscription;
