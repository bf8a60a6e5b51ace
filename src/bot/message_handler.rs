//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import flow types
use crate::flow::{self, FlowEvent, FlowKind};

// Import gateway types
use crate::gateway::{BackendGateway, Outcome, Payload};

// Import session types
use crate::session::{SessionStore, UserEntry};

// Import flow manager functions
use super::flow_manager::{drive_flow, send_step_prompt, start_flow};

// Import UI builder functions
use super::ui_builder::{create_books_keyboard, format_books_list};

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    gateway: Arc<BackendGateway>,
) -> Result<()> {
    // Updates without a sender (channel posts etc.) carry no session
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0;
    let language_code = user.language_code.as_deref();
    let chat_id = msg.chat.id;

    // Holding the entry's lock serializes all processing for this user
    let mut entry = store.entry(user_id).await;
    entry.language_code = user.language_code.clone();

    if let Some(contact) = msg.contact() {
        debug!(user_id, "Received shared contact");
        let event = FlowEvent::Contact {
            phone: contact.phone_number.clone(),
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
        };
        return drive_flow(
            &bot,
            chat_id,
            language_code,
            &mut entry,
            &store,
            &gateway,
            event,
        )
        .await;
    }

    let Some(text) = msg.text() else {
        return handle_unsupported_message(&bot, chat_id, language_code, &mut entry, &store)
            .await;
    };
    let text = text.trim();

    let mut parts = text.split_whitespace();
    let command = parts.next().unwrap_or("");

    match command {
        "/start" => {
            let welcome_message = format!(
                "👋 {}\n\n{}\n\n{}",
                t_lang("welcome-title", language_code),
                t_lang("welcome-description", language_code),
                t_lang("welcome-commands", language_code)
            );
            bot.send_message(chat_id, welcome_message).await?;
        }
        "/help" => {
            let help_message = vec![
                t_lang("help-title", language_code),
                t_lang("help-register", language_code),
                t_lang("help-login", language_code),
                t_lang("help-search", language_code),
                t_lang("help-list", language_code),
                t_lang("help-setid", language_code),
                t_lang("help-cancel", language_code),
            ]
            .join("\n");
            bot.send_message(chat_id, help_message).await?;
        }
        "/register" => {
            info!(user_id, "Starting registration flow");
            start_flow(
                &bot,
                chat_id,
                language_code,
                &mut entry,
                &store,
                FlowKind::Registering,
            )
            .await?;
        }
        "/login" => {
            info!(user_id, "Starting login flow");
            start_flow(
                &bot,
                chat_id,
                language_code,
                &mut entry,
                &store,
                FlowKind::LoggingIn,
            )
            .await?;
        }
        "/search" => {
            info!(user_id, "Starting search flow");
            start_flow(
                &bot,
                chat_id,
                language_code,
                &mut entry,
                &store,
                FlowKind::Searching,
            )
            .await?;
        }
        "/list" => {
            handle_list(&bot, chat_id, user_id, language_code, &gateway).await?;
        }
        "/setid" => {
            handle_setid(&bot, chat_id, language_code, &mut entry, parts.next()).await?;
        }
        "/cancel" => {
            handle_cancel(&bot, chat_id, user_id, language_code, &mut entry, &store).await?;
        }
        _ => {
            // Free text: feed the active flow, or show help when idle
            drive_flow(
                &bot,
                chat_id,
                language_code,
                &mut entry,
                &store,
                &gateway,
                FlowEvent::Text(text.to_string()),
            )
            .await?;
        }
    }

    Ok(())
}

async fn handle_list(
    bot: &Bot,
    chat_id: ChatId,
    user_id: u64,
    language_code: Option<&str>,
    gateway: &BackendGateway,
) -> Result<()> {
    info!(user_id, "Fetching full book list");

    match gateway.list_books().await {
        Outcome::Success(Payload::Books(books)) => {
            if books.is_empty() {
                bot.send_message(chat_id, t_lang("no-books-found", language_code))
                    .await?;
            } else {
                let listing = format!(
                    "{}\n\n{}",
                    t_lang("list-header", language_code),
                    format_books_list(&books)
                );
                bot.send_message(chat_id, listing)
                    .reply_markup(create_books_keyboard(&books))
                    .await?;
            }
        }
        Outcome::Success(_) => {
            warn!(user_id, "Book list returned an unexpected payload");
            bot.send_message(chat_id, t_lang("error-transport", language_code))
                .await?;
        }
        Outcome::DomainFailure(message) => {
            bot.send_message(
                chat_id,
                t_args_lang("error-domain", &[("message", &message)], language_code),
            )
            .await?;
        }
        Outcome::TransportFailure(_) => {
            bot.send_message(chat_id, t_lang("error-transport", language_code))
                .await?;
        }
    }
    Ok(())
}

async fn handle_setid(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    argument: Option<&str>,
) -> Result<()> {
    match argument {
        Some(id) if !id.is_empty() => {
            entry.auth.library_user_id = Some(id.to_string());
            bot.send_message(
                chat_id,
                t_args_lang("setid-success", &[("id", id)], language_code),
            )
            .await?;
        }
        _ => {
            bot.send_message(chat_id, t_lang("setid-usage", language_code))
                .await?;
        }
    }
    Ok(())
}

async fn handle_cancel(
    bot: &Bot,
    chat_id: ChatId,
    user_id: u64,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    store: &SessionStore,
) -> Result<()> {
    if entry.flow(store.idle_timeout()).is_some() {
        entry.clear_flow();
        info!(user_id, "Flow cancelled by user");
        bot.send_message(chat_id, t_lang("flow-cancelled", language_code))
            .await?;
    } else {
        bot.send_message(chat_id, t_lang("nothing-to-cancel", language_code))
            .await?;
    }
    Ok(())
}

/// Photos, stickers and the like never match a step's expected input:
/// re-prompt without advancing, or show the generic help when idle
async fn handle_unsupported_message(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    store: &SessionStore,
) -> Result<()> {
    if let Some(session) = entry.flow(store.idle_timeout()) {
        let step = &flow::steps(session.kind)[session.step];
        entry.touch();
        send_step_prompt(bot, chat_id, step, step.invalid, language_code).await
    } else {
        bot.send_message(chat_id, t_lang("unsupported-message", language_code))
            .await?;
        Ok(())
    }
}
