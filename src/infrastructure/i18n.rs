//! Translator that returns keys as-is.

use chrono::{DateTime, Utc};

use crate::domain::ports::I18nPort;

/// Returns each key unchanged apart from `{{ name }}` substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl I18nPort for PassthroughTranslator {
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
        params.iter().fold(key.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{{ {name} }}}}"), value)
                .replace(&format!("{{{{{name}}}}}"), value)
        })
    }

    fn format_date(&self, date: DateTime<Utc>) -> String {
        date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_substitutes_params() {
        let t = PassthroughTranslator;
        assert_eq!(t.t("{{ user }} is typing...", &[("user", "Ann")]), "Ann is typing...");
        assert_eq!(t.t("{{user}} joined", &[("user", "Ann")]), "Ann joined");
        assert_eq!(t.t("Message deleted", &[]), "Message deleted");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(PassthroughTranslator.format_date(date), "2024-03-01");
    }
}
