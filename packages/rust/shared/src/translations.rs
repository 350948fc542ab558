//! UI strings for the generated site, keyed by language and string key.

use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::error::{HelpCenterError, Result};

/// Site title shown in `<title>` and as the first breadcrumb.
pub const SITE_TITLE: &str = "site_title";
/// Language name shown in the translation bar and the root chooser.
pub const LANGUAGE_NAME: &str = "language_name";
/// Heading of the attachments block on article pages.
pub const ATTACHMENTS: &str = "attachments";
/// Label of the "last updated" line on article pages.
pub const UPDATED: &str = "updated";

/// Language → key → string lookup table.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    strings: BTreeMap<String, BTreeMap<String, String>>,
}

impl Translations {
    /// The built-in German and English strings.
    pub fn builtin() -> Self {
        let mut strings = BTreeMap::new();
        strings.insert(
            "de".to_string(),
            table(&[
                (SITE_TITLE, "eBlocker Hilfe"),
                (LANGUAGE_NAME, "Deutsch"),
                (ATTACHMENTS, "Anhänge"),
                (UPDATED, "Aktualisiert"),
            ]),
        );
        strings.insert(
            "en".to_string(),
            table(&[
                (SITE_TITLE, "eBlocker Help"),
                (LANGUAGE_NAME, "English"),
                (ATTACHMENTS, "Attachments"),
                (UPDATED, "Updated"),
            ]),
        );
        Self { strings }
    }

    /// Layer per-language overrides on top of the current table.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        for (language, entries) in overrides {
            let target = self.strings.entry(language.clone()).or_default();
            for (key, value) in entries {
                target.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// Look up a string. A missing entry is a programming error and fatal.
    pub fn get(&self, language: &str, key: &str) -> Result<&str> {
        self.strings
            .get(language)
            .and_then(|t| t.get(key))
            .map(String::as_str)
            .ok_or_else(|| HelpCenterError::MissingTranslation {
                language: language.to_string(),
                key: key.to_string(),
            })
    }
}

impl From<&AppConfig> for Translations {
    fn from(config: &AppConfig) -> Self {
        Self::builtin().with_overrides(&config.translations)
    }
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
