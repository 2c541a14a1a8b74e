//! Core components, types, and utilities for the bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Message model and result aliases.
//! - Typed errors and user-facing reply texts.

pub mod config;
pub mod error;
pub mod replies;
pub mod types;
