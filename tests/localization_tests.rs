use kitobxona::localization::{init_localization, t_args_lang, t_lang};

fn setup_localization() {
    // Initialize localization if not already done
    let _ = init_localization();
}

#[test]
fn test_english_is_the_default_locale() {
    setup_localization();
    assert_eq!(
        t_lang("register-success", None),
        "✅ You have been registered successfully!"
    );
    assert_eq!(
        t_lang("register-success", Some("fr")),
        "✅ You have been registered successfully!"
    );
}

#[test]
fn test_uzbek_locale_selected_from_language_code() {
    setup_localization();
    assert_eq!(
        t_lang("register-success", Some("uz")),
        "✅ Ro'yxatdan muvaffaqiyatli o'tdingiz!"
    );
    assert_eq!(
        t_lang("no-books-found", Some("uz-UZ")),
        "❌ Hech qanday kitob topilmadi."
    );
}

#[test]
fn test_arguments_are_interpolated() {
    setup_localization();
    let msg = t_args_lang("setid-success", &[("id", "12345")], Some("uz"));
    assert_eq!(msg, "✅ Foydalanuvchi ID o'rnatildi: 12345");

    let msg = t_args_lang(
        "search-no-results",
        &[("query", "Harry Potter")],
        None,
    );
    assert_eq!(msg, "❌ No results found for \"Harry Potter\".");
}

#[test]
fn test_missing_key_is_reported_not_panicked() {
    setup_localization();
    assert_eq!(
        t_lang("no-such-key", None),
        "Missing translation: no-such-key"
    );
}
