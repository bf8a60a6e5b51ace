//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming commands, text, and shared contacts
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `flow_manager`: Drives flow state transitions and submits to the backend
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod flow_manager;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::{borrow_decision, callback_handler, BorrowDecision};
pub use message_handler::message_handler;

// Re-export utility functions that might be used elsewhere
pub use flow_manager::{drive_flow, send_step_prompt, start_flow};
pub use ui_builder::{create_books_keyboard, format_books_list};
