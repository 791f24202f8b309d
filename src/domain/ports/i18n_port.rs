use chrono::{DateTime, Utc};

/// Port for the host application's localization layer.
pub trait I18nPort: Send + Sync {
    /// Translates `key`, substituting `{{ name }}` placeholders from `params`.
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String;

    /// Formats a date for date separators.
    fn format_date(&self, date: DateTime<Utc>) -> String;
}
