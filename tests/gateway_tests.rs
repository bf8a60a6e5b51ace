use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kitobxona::bot::{borrow_decision, BorrowDecision};
use kitobxona::flow::FlowKind;
use kitobxona::gateway::{BackendGateway, Book, Outcome, Payload};
use kitobxona::session::AuthState;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn gateway(server: &MockServer) -> BackendGateway {
    BackendGateway::new(&server.uri(), 5).unwrap()
}

#[tokio::test]
async fn test_register_posts_exactly_the_collected_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "first_name": "Ali",
            "last_name": "Valiyev",
            "phone": "+998901234567",
            "password": "abc123",
            "gender": "Male"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway(&server)
        .submit(
            FlowKind::Registering,
            &fields(&[
                ("first_name", "Ali"),
                ("last_name", "Valiyev"),
                ("phone", "+998901234567"),
                ("password", "abc123"),
                ("gender", "Male"),
            ]),
        )
        .await;

    assert_eq!(outcome, Outcome::Success(Payload::Registered));
}

#[tokio::test]
async fn test_login_success_yields_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "phone": "+998901234567", "password": "abc123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-123" })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway(&server)
        .login("+998901234567", "abc123")
        .await;

    assert_eq!(outcome, Outcome::Success(Payload::Token("jwt-123".to_string())));
}

#[tokio::test]
async fn test_rejected_login_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "wrong password" })),
        )
        .mount(&server)
        .await;

    let outcome = gateway(&server).login("+998901234567", "nope99").await;

    assert_eq!(outcome, Outcome::DomainFailure("wrong password".to_string()));
}

#[tokio::test]
async fn test_search_sends_title_query_and_handles_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/books"))
        .and(query_param("title", "Harry Potter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway(&server).search_books("Harry Potter").await;

    assert_eq!(outcome, Outcome::Success(Payload::Books(vec![])));
}

#[tokio::test]
async fn test_list_books_deserializes_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/all_book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 42, "title": "Harry Potter", "author": "J.K. Rowling" },
            { "id": 7, "title": "O'tkan kunlar", "author": "Abdulla Qodiriy" }
        ])))
        .mount(&server)
        .await;

    let outcome = gateway(&server).list_books().await;

    let Outcome::Success(Payload::Books(books)) = outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(
        books[0],
        Book {
            id: 42,
            title: "Harry Potter".to_string(),
            author: "J.K. Rowling".to_string(),
        }
    );
    assert_eq!(books.len(), 2);
}

#[tokio::test]
async fn test_borrow_sends_user_and_book_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/borrowing/borrow"))
        .and(body_json(json!({ "userId": "12345", "bookId": "42" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "message": "enjoy" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway(&server).borrow("12345", "42").await;

    assert_eq!(outcome, Outcome::Success(Payload::Borrowed("enjoy".to_string())));
}

#[tokio::test]
async fn test_borrow_flagged_failure_is_a_domain_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/borrowing/borrow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "already borrowed" })),
        )
        .mount(&server)
        .await;

    let outcome = gateway(&server).borrow("12345", "42").await;

    assert_eq!(outcome, Outcome::DomainFailure("already borrowed".to_string()));
}

#[tokio::test]
async fn test_borrow_without_recorded_user_id_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/borrowing/borrow"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true })),
        )
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let auth = AuthState::default();

    // A borrow button press without a recorded library user id prompts
    // for authentication instead of calling the backend
    match borrow_decision(&auth) {
        BorrowDecision::AuthRequired => {}
        BorrowDecision::Proceed { library_user_id } => {
            gateway.borrow(library_user_id, "42").await;
        }
    }

    // Dropping the server verifies the zero-call expectation
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_failure() {
    // Nothing listens on this port
    let gateway = BackendGateway::new("http://127.0.0.1:9", 1).unwrap();

    let outcome = gateway.list_books().await;

    assert!(matches!(outcome, Outcome::TransportFailure(_)));
}
