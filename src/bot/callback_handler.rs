//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import flow types
use crate::flow::FlowEvent;

// Import gateway types
use crate::gateway::{BackendGateway, Outcome, Payload};

// Import session types
use crate::session::{AuthState, SessionStore};

// Import flow manager functions
use super::flow_manager::drive_flow;

/// Whether a borrow callback may reach the backend
#[derive(Debug, PartialEq, Eq)]
pub enum BorrowDecision<'a> {
    /// No library user id recorded: prompt to authenticate, make no call
    AuthRequired,
    /// Borrow on behalf of the recorded library user id
    Proceed { library_user_id: &'a str },
}

/// Decide how to act on a borrow button press given the user's
/// authentication state
pub fn borrow_decision(auth: &AuthState) -> BorrowDecision<'_> {
    match auth.library_user_id.as_deref() {
        Some(library_user_id) => BorrowDecision::Proceed { library_user_id },
        None => BorrowDecision::AuthRequired,
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: teloxide::types::CallbackQuery,
    store: Arc<SessionStore>,
    gateway: Arc<BackendGateway>,
) -> Result<()> {
    let user_id = q.from.id.0;
    let language_code = q.from.language_code.as_deref();
    debug!(user_id, data = ?q.data, "Received callback query from user");

    let data = q.data.clone().unwrap_or_default();

    // The originating message may be inaccessible for old keyboards; the
    // private chat id equals the user id
    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or(ChatId(user_id as i64));

    let mut entry = store.entry(user_id).await;
    entry.language_code = q.from.language_code.clone();

    if data.starts_with("gender_") {
        // Gender selection is a flow step, delivered as a callback
        drive_flow(
            &bot,
            chat_id,
            language_code,
            &mut entry,
            &store,
            &gateway,
            FlowEvent::Callback(data),
        )
        .await?;
    } else if let Some(book_id) = data.strip_prefix("borrow_") {
        return handle_borrow(
            &bot,
            q.id,
            chat_id,
            user_id,
            language_code,
            &gateway,
            &entry.auth,
            book_id,
        )
        .await;
    } else if data == "cancel_borrow" {
        bot.send_message(chat_id, t_lang("borrow-cancelled", language_code))
            .await?;
    } else {
        debug!(user_id, data = %data, "Ignoring unknown callback payload");
    }

    // Answer the callback query to remove the loading state
    bot.answer_callback_query(q.id).await?;

    Ok(())
}

/// Borrow a book on behalf of an authenticated user.
///
/// Without a recorded library user id no backend call is made; the user is
/// told to authenticate first via an alert on the pressed button.
#[allow(clippy::too_many_arguments)]
async fn handle_borrow(
    bot: &Bot,
    callback_id: teloxide::types::CallbackQueryId,
    chat_id: ChatId,
    user_id: u64,
    language_code: Option<&str>,
    gateway: &BackendGateway,
    auth: &AuthState,
    book_id: &str,
) -> Result<()> {
    let library_user_id = match borrow_decision(auth) {
        BorrowDecision::AuthRequired => {
            info!(user_id, book_id, "Borrow attempted without authentication");
            bot.answer_callback_query(callback_id)
                .text(t_lang("auth-required", language_code))
                .show_alert(true)
                .await?;
            bot.send_message(chat_id, t_lang("auth-required", language_code))
                .await?;
            return Ok(());
        }
        BorrowDecision::Proceed { library_user_id } => library_user_id,
    };

    info!(user_id, book_id, "Borrowing book");

    let message = match gateway.borrow(library_user_id, book_id).await {
        Outcome::Success(Payload::Borrowed(_)) => t_lang("borrow-success", language_code),
        Outcome::Success(_) => {
            warn!(user_id, "Borrow returned an unexpected payload");
            t_lang("error-transport", language_code)
        }
        Outcome::DomainFailure(message) => {
            t_args_lang("borrow-failed", &[("message", &message)], language_code)
        }
        Outcome::TransportFailure(_) => t_lang("error-transport", language_code),
    };

    bot.send_message(chat_id, message).await?;
    bot.answer_callback_query(callback_id).await?;

    Ok(())
}
