//! Flow manager module: drives a session through its steps and submits
//! completed flows to the backend

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import flow types
use crate::flow::{self, FlowAction, FlowEvent, FlowKind, PromptKeyboard, StepDef};

// Import gateway types
use crate::gateway::{BackendGateway, Outcome, Payload};

// Import session types
use crate::session::{SessionStore, UserEntry};

// Import UI builder functions
use super::ui_builder::{
    create_books_keyboard, create_contact_keyboard, create_gender_keyboard,
    format_search_results_header,
};

/// Start (or re-enter) a flow for a user and send the current step's prompt
pub async fn start_flow(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    store: &SessionStore,
    kind: FlowKind,
) -> Result<()> {
    let session = entry.get_or_create_flow(kind, store.idle_timeout());
    let step = &flow::steps(kind)[session.step];
    send_step_prompt(bot, chat_id, step, step.prompt, language_code).await
}

/// Feed one inbound event into the user's active flow.
///
/// Without an active flow the event gets the generic help response; a
/// `Submit` clears the session before the outcome is rendered.
pub async fn drive_flow(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    store: &SessionStore,
    gateway: &BackendGateway,
    event: FlowEvent,
) -> Result<()> {
    let Some(session) = entry.flow(store.idle_timeout()) else {
        bot.send_message(chat_id, t_lang("unknown-command", language_code))
            .await?;
        return Ok(());
    };

    match flow::advance(session, &event) {
        FlowAction::Prompt(step) => {
            send_step_prompt(bot, chat_id, step, step.prompt, language_code).await
        }
        FlowAction::Reprompt(step) => {
            send_step_prompt(bot, chat_id, step, step.invalid, language_code).await
        }
        FlowAction::Submit { kind, fields } => {
            entry.clear_flow();
            submit_flow(bot, chat_id, language_code, entry, gateway, kind, fields).await
        }
    }
}

/// Send a step's prompt (or corrective re-prompt) with its keyboard
pub async fn send_step_prompt(
    bot: &Bot,
    chat_id: ChatId,
    step: &StepDef,
    message_key: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let text = t_lang(message_key, language_code);
    match step.keyboard {
        PromptKeyboard::None => {
            bot.send_message(chat_id, text).await?;
        }
        PromptKeyboard::ContactRequest => {
            bot.send_message(chat_id, text)
                .reply_markup(create_contact_keyboard(language_code))
                .await?;
        }
        PromptKeyboard::Gender => {
            bot.send_message(chat_id, text)
                .reply_markup(create_gender_keyboard(language_code))
                .await?;
        }
    }
    Ok(())
}

async fn submit_flow(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    entry: &mut UserEntry,
    gateway: &BackendGateway,
    kind: FlowKind,
    fields: std::collections::HashMap<String, String>,
) -> Result<()> {
    match kind {
        FlowKind::Registering => {
            info!(chat_id = %chat_id, "Submitting registration");
            let message = match gateway.register(&fields).await {
                Outcome::Success(_) => t_lang("register-success", language_code),
                Outcome::DomainFailure(message) => {
                    t_args_lang("register-failed", &[("message", &message)], language_code)
                }
                Outcome::TransportFailure(_) => t_lang("error-transport", language_code),
            };
            bot.send_message(chat_id, message).await?;
        }
        FlowKind::LoggingIn => {
            info!(chat_id = %chat_id, "Submitting login");
            let message = match gateway.submit(kind, &fields).await {
                Outcome::Success(Payload::Token(token)) => {
                    entry.auth.token = Some(token);
                    t_lang("login-success", language_code)
                }
                Outcome::Success(_) => {
                    warn!(chat_id = %chat_id, "Login returned an unexpected payload");
                    t_lang("error-transport", language_code)
                }
                Outcome::DomainFailure(message) => {
                    t_args_lang("login-failed", &[("message", &message)], language_code)
                }
                Outcome::TransportFailure(_) => t_lang("error-transport", language_code),
            };
            bot.send_message(chat_id, message).await?;
        }
        FlowKind::Searching => {
            submit_search(bot, chat_id, language_code, gateway, &fields).await?;
        }
    }
    Ok(())
}

/// Search sends a placeholder first, then edits it in place with the
/// results
async fn submit_search(
    bot: &Bot,
    chat_id: ChatId,
    language_code: Option<&str>,
    gateway: &BackendGateway,
    fields: &std::collections::HashMap<String, String>,
) -> Result<()> {
    let query = fields.get("query").cloned().unwrap_or_default();
    info!(chat_id = %chat_id, query = %query, "Submitting book search");

    let loading = bot
        .send_message(chat_id, t_lang("search-loading", language_code))
        .await?;

    match gateway.search_books(&query).await {
        Outcome::Success(Payload::Books(books)) => {
            if books.is_empty() {
                bot.edit_message_text(
                    chat_id,
                    loading.id,
                    t_args_lang("search-no-results", &[("query", &query)], language_code),
                )
                .await?;
            } else {
                let header =
                    format_search_results_header(&query, books.len(), language_code);
                bot.edit_message_text(chat_id, loading.id, header)
                    .reply_markup(create_books_keyboard(&books))
                    .await?;
            }
        }
        Outcome::Success(_) => {
            warn!(chat_id = %chat_id, "Search returned an unexpected payload");
            bot.edit_message_text(chat_id, loading.id, t_lang("error-transport", language_code))
                .await?;
        }
        Outcome::DomainFailure(message) => {
            bot.edit_message_text(
                chat_id,
                loading.id,
                t_args_lang("error-domain", &[("message", &message)], language_code),
            )
            .await?;
        }
        Outcome::TransportFailure(_) => {
            bot.edit_message_text(chat_id, loading.id, t_lang("error-transport", language_code))
                .await?;
        }
    }
    Ok(())
}
