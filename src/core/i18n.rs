// StockSync - core/i18n.rs
//
// Translation resolver. Maps dotted keys (`history.filterAll`) to strings of
// the active language. The tables are TOML files embedded at compile time.
// A key that is missing, or that names a table rather than a string,
// resolves to itself so the UI shows something readable.

use std::fmt;

const EN_TABLE: &str = include_str!("../../i18n/en.toml");
const FR_TABLE: &str = include_str!("../../i18n/fr.toml");

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[Self::En, Self::Fr]
    }

    /// ISO 639-1 code, as used in config and on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Name of the language in itself, for the picker.
    pub fn native_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Fr => "Fran\u{e7}ais",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "fr" | "french" | "francais" => Some(Self::Fr),
            _ => None,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::En => EN_TABLE,
            Self::Fr => FR_TABLE,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Resolved string table for one language.
#[derive(Debug, Clone)]
pub struct Translator {
    language: Language,
    table: toml::Table,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        let table = match language.source().parse::<toml::Table>() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(language = %language, error = %e, "Embedded translation table is invalid");
                toml::Table::new()
            }
        };
        Self { language, table }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Look up `key`; returns `key` itself when it does not resolve to a string.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        let mut parts = key.split('.');
        let Some(first) = parts.next() else {
            return key;
        };
        let mut current = match self.table.get(first) {
            Some(v) => v,
            None => return key,
        };
        for part in parts {
            current = match current.get(part) {
                Some(v) => v,
                None => return key,
            };
        }
        current.as_str().unwrap_or(key)
    }

    /// Look up `key` and substitute `{name}` placeholders.
    pub fn tf(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.t(key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
