//! # Kitobxona Telegram Bot
//!
//! A Telegram front-end for a remote library-management API: multi-step
//! registration and login conversations, book search and listing, and
//! borrowing via inline keyboards.

pub mod bot;
pub mod config;
pub mod flow;
pub mod gateway;
pub mod localization;
pub mod session;
