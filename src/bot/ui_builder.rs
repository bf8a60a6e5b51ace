//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import gateway types
use crate::gateway::Book;

/// Create the inline keyboard for a list of books; each book becomes one
/// selectable button carrying `borrow_<id>` as opaque payload
pub fn create_books_keyboard(books: &[Book]) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = books
        .iter()
        .map(|book| {
            vec![InlineKeyboardButton::callback(
                format!("📚 {} - {}", book.title, book.author),
                format!("borrow_{}", book.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Create the gender selection keyboard used during registration
pub fn create_gender_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(t_lang("gender-male", language_code), "gender_male"),
        InlineKeyboardButton::callback(t_lang("gender-female", language_code), "gender_female"),
    ]])
}

/// Create the one-time reply keyboard requesting the user's contact
pub fn create_contact_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let button =
        KeyboardButton::new(t_lang("share-contact-button", language_code)).request(ButtonRequest::Contact);

    KeyboardMarkup::new(vec![vec![button]])
        .one_time_keyboard()
        .resize_keyboard()
}

/// Format the header line for search results
pub fn format_search_results_header(
    query: &str,
    count: usize,
    language_code: Option<&str>,
) -> String {
    t_args_lang(
        "search-results-header",
        &[("query", query), ("count", &count.to_string())],
        language_code,
    )
}

/// Format a book list as plain text, one numbered line per book
pub fn format_books_list(books: &[Book]) -> String {
    books
        .iter()
        .enumerate()
        .map(|(i, book)| format!("{}. 📚 {} - {}", i + 1, book.title, book.author))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_books() -> Vec<Book> {
        vec![
            Book {
                id: 42,
                title: "Harry Potter".to_string(),
                author: "J.K. Rowling".to_string(),
            },
            Book {
                id: 7,
                title: "O'tkan kunlar".to_string(),
                author: "Abdulla Qodiriy".to_string(),
            },
        ]
    }

    #[test]
    fn test_books_keyboard_carries_borrow_payloads() {
        let keyboard = create_books_keyboard(&sample_books());

        assert_eq!(keyboard.inline_keyboard.len(), 2);
        let first = &keyboard.inline_keyboard[0][0];
        assert!(first.text.contains("Harry Potter"));
        assert!(first.text.contains("J.K. Rowling"));
        match &first.kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => {
                assert_eq!(data, "borrow_42");
            }
            other => panic!("unexpected button kind: {:?}", other),
        }
    }

    #[test]
    fn test_empty_book_list_yields_no_buttons() {
        let keyboard = create_books_keyboard(&[]);
        assert!(keyboard.inline_keyboard.is_empty());
    }

    #[test]
    fn test_books_list_formatting() {
        let listing = format_books_list(&sample_books());
        assert!(listing.starts_with("1. 📚 Harry Potter - J.K. Rowling"));
        assert!(listing.contains("2. 📚 O'tkan kunlar - Abdulla Qodiriy"));
    }
}
