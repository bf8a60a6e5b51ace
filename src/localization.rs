use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, OnceLock};
use anyhow::Result;

const SUPPORTED_LOCALES: &[&str] = &["en", "uz"];
const FALLBACK_LOCALE: &str = "en";

/// Localization manager for the Kitobxona bot
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a new localization manager with all supported locales loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for locale in SUPPORTED_LOCALES {
            let langid: LanguageIdentifier = locale.parse()?;
            let bundle = Self::create_bundle(&langid)?;
            bundles.insert((*locale).to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Chat messages should not carry Unicode isolation marks
        bundle.set_use_isolating(false);

        // Load the main resource file
        let resource_path = format!("./locales/{}/main.ftl", locale);
        if let Ok(content) = fs::read_to_string(&resource_path) {
            if let Ok(resource) = FluentResource::try_new(content) {
                let _ = bundle.add_resource(resource);
            }
        }

        Ok(bundle)
    }

    /// Resolve a Telegram language code to a supported locale
    fn resolve_locale(&self, language_code: Option<&str>) -> &str {
        match language_code {
            Some(code) if code.starts_with("uz") => "uz",
            _ => FALLBACK_LOCALE,
        }
    }

    /// Get a localized message
    pub fn get_message(
        &self,
        key: &str,
        args: Option<&HashMap<&str, &str>>,
        language_code: Option<&str>,
    ) -> String {
        let locale = self.resolve_locale(language_code);

        // Try the requested locale first, then the English fallback
        self.lookup(locale, key, args)
            .or_else(|| self.lookup(FALLBACK_LOCALE, key, args))
            .unwrap_or_else(|| format!("Missing translation: {}", key))
    }

    fn lookup(
        &self,
        locale: &str,
        key: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> Option<String> {
        let bundle = self.bundles.get(locale)?;
        let msg = bundle.get_message(key)?;
        let pattern = msg.value()?;

        let mut value = String::new();

        if let Some(args) = args {
            let fluent_args = FluentArgs::from_iter(
                args.iter().map(|(k, v)| (*k, FluentValue::from(*v))),
            );
            let _ = bundle.write_pattern(&mut value, pattern, Some(&fluent_args), &mut vec![]);
        } else {
            let _ = bundle.write_pattern(&mut value, pattern, None, &mut vec![]);
        }

        Some(value)
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    let manager = LocalizationManager::new()?;
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER
        .get()
        .expect("Localization manager not initialized")
}

/// Convenience function to get a localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message(key, None, language_code)
}

/// Convenience function to get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message(key, Some(&args_map), language_code)
}
