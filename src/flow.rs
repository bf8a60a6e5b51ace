//! Flow Controller module for multi-step conversations
//!
//! Each flow kind (registration, login, search) is a declarative, ordered
//! list of [`StepDef`]s. [`advance`] is the single transition function: it
//! checks the incoming event against the current step's expected input
//! kind and validation rule, re-prompting without advancing on mismatch,
//! and yields [`FlowAction::Submit`] once the last step is satisfied. All
//! side effects (sending messages, calling the backend) belong to the
//! handlers.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::session::Session;

lazy_static! {
    // Optional leading +, then 7 to 15 digits
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex");
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// The flows a user can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Registering,
    LoggingIn,
    Searching,
}

/// Input type a step is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Contact,
    Callback,
}

/// Keyboard that accompanies a step's prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKeyboard {
    None,
    ContactRequest,
    Gender,
}

/// One unit of a flow: what it expects, how it validates, what it writes
#[derive(Debug)]
pub struct StepDef {
    pub name: &'static str,
    pub expects: InputKind,
    /// Field written into the session's collected fields on success
    pub field: &'static str,
    /// Localization key for the step's prompt
    pub prompt: &'static str,
    /// Localization key for the corrective re-prompt
    pub invalid: &'static str,
    pub keyboard: PromptKeyboard,
    /// Validates the raw value and returns the canonical stored form
    pub parse: fn(&str) -> Option<String>,
}

fn parse_phone(value: &str) -> Option<String> {
    let cleaned: String = value.trim().chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&cleaned).then(|| cleaned)
}

fn parse_password(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (trimmed.chars().count() >= MIN_PASSWORD_LEN).then(|| trimmed.to_string())
}

fn parse_gender(value: &str) -> Option<String> {
    match value {
        "gender_male" => Some("Male".to_string()),
        "gender_female" => Some("Female".to_string()),
        _ => None,
    }
}

fn parse_query(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

static REGISTRATION_STEPS: &[StepDef] = &[
    StepDef {
        name: "contact",
        expects: InputKind::Contact,
        field: "phone",
        prompt: "register-contact-prompt",
        invalid: "register-contact-invalid",
        keyboard: PromptKeyboard::ContactRequest,
        parse: parse_phone,
    },
    StepDef {
        name: "password",
        expects: InputKind::Text,
        field: "password",
        prompt: "password-prompt",
        invalid: "password-too-short",
        keyboard: PromptKeyboard::None,
        parse: parse_password,
    },
    StepDef {
        name: "gender",
        expects: InputKind::Callback,
        field: "gender",
        prompt: "gender-prompt",
        invalid: "gender-invalid",
        keyboard: PromptKeyboard::Gender,
        parse: parse_gender,
    },
];

static LOGIN_STEPS: &[StepDef] = &[
    StepDef {
        name: "phone",
        expects: InputKind::Text,
        field: "phone",
        prompt: "login-phone-prompt",
        invalid: "phone-invalid",
        keyboard: PromptKeyboard::None,
        parse: parse_phone,
    },
    StepDef {
        name: "password",
        expects: InputKind::Text,
        field: "password",
        prompt: "password-prompt",
        invalid: "password-too-short",
        keyboard: PromptKeyboard::None,
        parse: parse_password,
    },
];

static SEARCH_STEPS: &[StepDef] = &[StepDef {
    name: "query",
    expects: InputKind::Text,
    field: "query",
    prompt: "search-prompt",
    invalid: "search-query-invalid",
    keyboard: PromptKeyboard::None,
    parse: parse_query,
}];

/// Ordered step list for a flow kind
pub fn steps(kind: FlowKind) -> &'static [StepDef] {
    match kind {
        FlowKind::Registering => REGISTRATION_STEPS,
        FlowKind::LoggingIn => LOGIN_STEPS,
        FlowKind::Searching => SEARCH_STEPS,
    }
}

/// The first step's definition, used when a flow command starts the flow
pub fn first_step(kind: FlowKind) -> &'static StepDef {
    &steps(kind)[0]
}

/// Inbound event as seen by the flow controller
#[derive(Debug, Clone)]
pub enum FlowEvent {
    Text(String),
    Contact {
        phone: String,
        first_name: String,
        last_name: Option<String>,
    },
    Callback(String),
}

impl FlowEvent {
    fn kind(&self) -> InputKind {
        match self {
            FlowEvent::Text(_) => InputKind::Text,
            FlowEvent::Contact { .. } => InputKind::Contact,
            FlowEvent::Callback(_) => InputKind::Callback,
        }
    }

    fn value(&self) -> &str {
        match self {
            FlowEvent::Text(value) => value,
            FlowEvent::Contact { phone, .. } => phone,
            FlowEvent::Callback(data) => data,
        }
    }
}

/// What the handler must do next
#[derive(Debug)]
pub enum FlowAction {
    /// Render the given step's prompt
    Prompt(&'static StepDef),
    /// Input mismatched or failed validation: repeat the step's
    /// instruction, step unchanged
    Reprompt(&'static StepDef),
    /// All steps satisfied: invoke the gateway, then clear the session
    Submit {
        kind: FlowKind,
        fields: HashMap<String, String>,
    },
}

/// Advance a session by one inbound event.
///
/// Never performs I/O; the caller owns the per-user lock and clears the
/// session after acting on `Submit`.
pub fn advance(session: &mut Session, event: &FlowEvent) -> FlowAction {
    let flow_steps = steps(session.kind);
    let step = &flow_steps[session.step.min(flow_steps.len() - 1)];

    session.last_active_at = Utc::now();

    if event.kind() != step.expects {
        return FlowAction::Reprompt(step);
    }

    let Some(value) = (step.parse)(event.value()) else {
        return FlowAction::Reprompt(step);
    };

    session.fields.insert(step.field.to_string(), value);

    // A shared contact also carries the user's name, which registration
    // forwards to the backend
    if let FlowEvent::Contact {
        first_name,
        last_name,
        ..
    } = event
    {
        session
            .fields
            .insert("first_name".to_string(), first_name.clone());
        session
            .fields
            .insert("last_name".to_string(), last_name.clone().unwrap_or_default());
    }

    session.step += 1;
    if session.step >= flow_steps.len() {
        FlowAction::Submit {
            kind: session.kind,
            fields: session.fields.clone(),
        }
    } else {
        FlowAction::Prompt(&flow_steps[session.step])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_event() -> FlowEvent {
        FlowEvent::Contact {
            phone: "+998901234567".to_string(),
            first_name: "Ali".to_string(),
            last_name: Some("Valiyev".to_string()),
        }
    }

    #[test]
    fn test_registration_walkthrough_submits_exact_fields() {
        let mut session = Session::new(FlowKind::Registering);

        match advance(&mut session, &contact_event()) {
            FlowAction::Prompt(step) => assert_eq!(step.name, "password"),
            other => panic!("unexpected action: {:?}", other),
        }
        match advance(&mut session, &FlowEvent::Text("abc123".to_string())) {
            FlowAction::Prompt(step) => assert_eq!(step.name, "gender"),
            other => panic!("unexpected action: {:?}", other),
        }
        match advance(&mut session, &FlowEvent::Callback("gender_male".to_string())) {
            FlowAction::Submit { kind, fields } => {
                assert_eq!(kind, FlowKind::Registering);
                assert_eq!(fields.len(), 5);
                assert_eq!(fields["phone"], "+998901234567");
                assert_eq!(fields["password"], "abc123");
                assert_eq!(fields["gender"], "Male");
                assert_eq!(fields["first_name"], "Ali");
                assert_eq!(fields["last_name"], "Valiyev");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_input_type_never_advances() {
        let mut session = Session::new(FlowKind::Registering);
        session.fields.insert("marker".to_string(), "kept".to_string());

        // Text where a contact is expected
        match advance(&mut session, &FlowEvent::Text("+998901234567".to_string())) {
            FlowAction::Reprompt(step) => assert_eq!(step.name, "contact"),
            other => panic!("unexpected action: {:?}", other),
        }
        assert_eq!(session.step, 0);
        assert_eq!(session.fields["marker"], "kept");
    }

    #[test]
    fn test_short_password_reprompts_without_advancing() {
        let mut session = Session::new(FlowKind::Registering);
        advance(&mut session, &contact_event());

        match advance(&mut session, &FlowEvent::Text("ab".to_string())) {
            FlowAction::Reprompt(step) => assert_eq!(step.name, "password"),
            other => panic!("unexpected action: {:?}", other),
        }
        assert_eq!(session.step, 1);
        assert!(!session.fields.contains_key("password"));
    }

    #[test]
    fn test_unknown_gender_callback_reprompts() {
        let mut session = Session::new(FlowKind::Registering);
        advance(&mut session, &contact_event());
        advance(&mut session, &FlowEvent::Text("abc123".to_string()));

        match advance(&mut session, &FlowEvent::Callback("gender_other".to_string())) {
            FlowAction::Reprompt(step) => assert_eq!(step.name, "gender"),
            other => panic!("unexpected action: {:?}", other),
        }
        assert_eq!(session.step, 2);
    }

    #[test]
    fn test_login_flow_collects_phone_then_password() {
        let mut session = Session::new(FlowKind::LoggingIn);

        match advance(&mut session, &FlowEvent::Text("+998901234567".to_string())) {
            FlowAction::Prompt(step) => assert_eq!(step.name, "password"),
            other => panic!("unexpected action: {:?}", other),
        }
        match advance(&mut session, &FlowEvent::Text("secret1".to_string())) {
            FlowAction::Submit { kind, fields } => {
                assert_eq!(kind, FlowKind::LoggingIn);
                assert_eq!(fields.len(), 2);
                assert_eq!(fields["phone"], "+998901234567");
                assert_eq!(fields["password"], "secret1");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_search_is_single_step() {
        let mut session = Session::new(FlowKind::Searching);

        match advance(&mut session, &FlowEvent::Text("  Harry Potter ".to_string())) {
            FlowAction::Submit { kind, fields } => {
                assert_eq!(kind, FlowKind::Searching);
                assert_eq!(fields["query"], "Harry Potter");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_phone_validation() {
        assert_eq!(parse_phone("+998 90 123 45 67").as_deref(), Some("+998901234567"));
        assert_eq!(parse_phone("901234567").as_deref(), Some("901234567"));
        assert!(parse_phone("12345").is_none());
        assert!(parse_phone("not-a-phone").is_none());
        assert!(parse_phone("").is_none());
    }
}
