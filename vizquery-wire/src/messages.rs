//! The locale-keyed message bundle backing §7's parameterized error
//! messages, seeded at compile time via `include_str!` of a small
//! key=value resource file — the same "static table consulted at
//! runtime" shape as `datafusion-postgres`'s `BLACKLIST_SQL_MAPPING`.

use std::collections::HashMap;

use vizquery_core::ErrorKey;

const EN_BUNDLE: &str = include_str!("../resources/messages_en.properties");

pub struct MessageBundle {
    templates: HashMap<&'static str, &'static str>,
}

impl MessageBundle {
    /// Only the `en` bundle ships; `_locale` is accepted so callers can
    /// thread a `Locale` through without the bundle pretending to be
    /// locale-aware yet.
    pub fn for_locale(_locale: &str) -> Self {
        let mut templates = HashMap::new();
        for line in EN_BUNDLE.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, template)) = line.split_once('=') {
                templates.insert(key, template);
            }
        }
        MessageBundle { templates }
    }

    /// Renders the template for `key`, substituting `{0}` with `arg` if
    /// the template has that placeholder. Falls back to the key's name
    /// if no template is registered.
    pub fn message(&self, key: ErrorKey, arg: &str) -> String {
        match self.templates.get(key.name()) {
            Some(template) => template.replace("{0}", arg),
            None => key.name().to_string(),
        }
    }

    pub fn sign_in_label(&self) -> &str {
        self.templates.get("SIGN_IN").copied().unwrap_or("Sign in")
    }
}

impl Default for MessageBundle {
    fn default() -> Self {
        MessageBundle::for_locale("en")
    }
}

/// Rewrites a `user_not_authenticated` detailed message that is a bare
/// sign-in URL into an HTML link using the localized "Sign in" label
/// (spec §7).
pub fn rewrite_user_not_authenticated(detailed_message: &str, bundle: &MessageBundle) -> String {
    let trimmed = detailed_message.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("<a href=\"{trimmed}\">{}</a>", bundle.sign_in_label())
    } else {
        detailed_message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_first_placeholder() {
        let bundle = MessageBundle::default();
        let msg = bundle.message(ErrorKey::NoColumn, "population");
        assert!(msg.contains("population"));
    }

    #[test]
    fn unknown_key_falls_back_to_name() {
        let bundle = MessageBundle::for_locale("en");
        assert_eq!(bundle.sign_in_label(), "Sign in");
    }

    #[test]
    fn url_only_detail_is_rewritten_to_a_link() {
        let bundle = MessageBundle::default();
        let rewritten = rewrite_user_not_authenticated("https://example.com/signin", &bundle);
        assert_eq!(rewritten, "<a href=\"https://example.com/signin\">Sign in</a>");
    }

    #[test]
    fn non_url_detail_is_left_untouched() {
        let bundle = MessageBundle::default();
        let rewritten = rewrite_user_not_authenticated("session expired", &bundle);
        assert_eq!(rewritten, "session expired");
    }
}
