//! Backend Gateway module for the library-management API
//!
//! A stateless adapter over `reqwest`: one outbound call per invocation,
//! no retries. Connection and timeout errors map to
//! [`Outcome::TransportFailure`]; non-2xx responses and bodies flagged
//! `success: false` map to [`Outcome::DomainFailure`] carrying the
//! backend's message.

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

use crate::flow::FlowKind;

/// A book as reported by the backend; opaque beyond display and selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
}

/// Kind-specific success payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Token(String),
    Registered,
    Books(Vec<Book>),
    Borrowed(String),
}

/// Tri-state result of one backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Payload),
    DomainFailure(String),
    TransportFailure(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BorrowResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    phone: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    first_name: &'a str,
    last_name: &'a str,
    phone: &'a str,
    password: &'a str,
    gender: &'a str,
}

#[derive(Debug, Serialize)]
struct BorrowRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "bookId")]
    book_id: &'a str,
}

/// Stateless request/response adapter for the remote library API
pub struct BackendGateway {
    client: Client,
    base_url: String,
}

impl BackendGateway {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Dispatch a completed flow's collected fields to the matching endpoint
    pub async fn submit(&self, kind: FlowKind, fields: &HashMap<String, String>) -> Outcome {
        match kind {
            FlowKind::Registering => self.register(fields).await,
            FlowKind::LoggingIn => {
                self.login(field(fields, "phone"), field(fields, "password"))
                    .await
            }
            FlowKind::Searching => self.search_books(field(fields, "query")).await,
        }
    }

    /// `GET /book/all_book`
    pub async fn list_books(&self) -> Outcome {
        let url = format!("{}/book/all_book", self.base_url);
        debug!(%url, "Fetching full book list");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure("list_books", &e),
        };
        books_outcome(response).await
    }

    /// `GET /book/books?title=<q>`
    pub async fn search_books(&self, title: &str) -> Outcome {
        let url = format!("{}/book/books", self.base_url);
        debug!(%url, query = %title, "Searching books by title");

        let response = match self
            .client
            .get(&url)
            .query(&[("title", title)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure("search_books", &e),
        };
        books_outcome(response).await
    }

    /// `POST /auth/login`
    pub async fn login(&self, phone: &str, password: &str) -> Outcome {
        let url = format!("{}/auth/login", self.base_url);
        let request = LoginRequest { phone, password };
        debug!(%url, "Sending login request");

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure("login", &e),
        };
        if !response.status().is_success() {
            return domain_failure(response).await;
        }
        match response.json::<TokenResponse>().await {
            Ok(body) => Outcome::Success(Payload::Token(body.token)),
            Err(e) => transport_failure("login", &e),
        }
    }

    /// `POST /auth/register`
    pub async fn register(&self, fields: &HashMap<String, String>) -> Outcome {
        let url = format!("{}/auth/register", self.base_url);
        let request = RegisterRequest {
            first_name: field(fields, "first_name"),
            last_name: field(fields, "last_name"),
            phone: field(fields, "phone"),
            password: field(fields, "password"),
            gender: field(fields, "gender"),
        };
        debug!(%url, "Sending registration request");

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure("register", &e),
        };
        if response.status().is_success() {
            Outcome::Success(Payload::Registered)
        } else {
            domain_failure(response).await
        }
    }

    /// `POST /borrowing/borrow`
    pub async fn borrow(&self, user_id: &str, book_id: &str) -> Outcome {
        let url = format!("{}/borrowing/borrow", self.base_url);
        let request = BorrowRequest { user_id, book_id };
        debug!(%url, book_id, "Sending borrow request");

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure("borrow", &e),
        };
        if !response.status().is_success() {
            return domain_failure(response).await;
        }
        match response.json::<BorrowResponse>().await {
            Ok(body) if body.success => {
                Outcome::Success(Payload::Borrowed(body.message.unwrap_or_default()))
            }
            Ok(body) => Outcome::DomainFailure(body.message.unwrap_or_default()),
            Err(e) => transport_failure("borrow", &e),
        }
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, key: &str) -> &'a str {
    fields.get(key).map(String::as_str).unwrap_or("")
}

fn transport_failure(operation: &str, error: &reqwest::Error) -> Outcome {
    error!(operation, error = %error, "Backend call failed at the transport level");
    Outcome::TransportFailure(error.to_string())
}

async fn domain_failure(response: reqwest::Response) -> Outcome {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.to_string());
    debug!(%status, "Backend rejected the request");
    Outcome::DomainFailure(message)
}

async fn books_outcome(response: reqwest::Response) -> Outcome {
    if !response.status().is_success() {
        return domain_failure(response).await;
    }
    match response.json::<Vec<Book>>().await {
        Ok(books) => Outcome::Success(Payload::Books(books)),
        Err(e) => transport_failure("books", &e),
    }
}
