//! Supported locales and the keys of multilingual document fields.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A language the search service can localize results into.
///
/// The set is closed. Anything outside of it resolves to [`Locale::En`] via
/// [`Locale::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    De,
    #[default]
    En,
    Fr,
    It,
}

impl Locale {
    pub const ALL: [Self; 4] = [Self::De, Self::En, Self::Fr, Self::It];

    /// Resolve a requested language code to a supported locale.
    ///
    /// Missing or unsupported codes silently map to English.
    ///
    /// ```rust
    /// use waypoint_data::Locale;
    ///
    /// assert_eq!(Locale::resolve(Some("fr")), Locale::Fr);
    /// assert_eq!(Locale::resolve(Some(" DE ")), Locale::De);
    /// assert_eq!(Locale::resolve(Some("nl")), Locale::En);
    /// assert_eq!(Locale::resolve(None), Locale::En);
    /// ```
    pub fn resolve(requested: Option<&str>) -> Self {
        requested
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
            Self::Fr => "fr",
            Self::It => "it",
        }
    }

    /// Whether addresses read "25 Rue Bergère" (true) or "Bergmannstraße 25" (false).
    pub const fn housenumber_first(self) -> bool {
        matches!(self, Self::En | Self::Fr)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a language code is not one of the supported locales.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}'")]
pub struct UnsupportedLocale(pub String);

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "de" => Ok(Self::De),
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "it" => Ok(Self::It),
            _ => Err(UnsupportedLocale(s.to_owned())),
        }
    }
}

/// Key of a multilingual field: one of the supported locales, or the
/// language-neutral `default` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocaleKey {
    Default,
    Locale(Locale),
}

impl LocaleKey {
    /// All keys, `default` first.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Locale(Locale::De),
        Self::Locale(Locale::En),
        Self::Locale(Locale::Fr),
        Self::Locale(Locale::It),
    ];

    /// Position of this key in [`LocaleKey::ALL`].
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Default => 0,
            Self::Locale(Locale::De) => 1,
            Self::Locale(Locale::En) => 2,
            Self::Locale(Locale::Fr) => 3,
            Self::Locale(Locale::It) => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Locale(locale) => locale.as_str(),
        }
    }

    /// Parse a document map key. Returns `None` for keys that are neither a
    /// supported locale nor `default`.
    pub fn parse(key: &str) -> Option<Self> {
        if key == "default" {
            Some(Self::Default)
        } else {
            key.parse().ok().map(Self::Locale)
        }
    }
}

impl From<Locale> for LocaleKey {
    fn from(locale: Locale) -> Self {
        Self::Locale(locale)
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_supported() {
        for locale in Locale::ALL {
            assert_eq!(Locale::resolve(Some(locale.as_str())), locale);
        }
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        for code in ["", "nl", "english", "de-DE", "xx"] {
            assert_eq!(Locale::resolve(Some(code)), Locale::En, "code {code:?}");
        }
        assert_eq!(Locale::resolve(None), Locale::En);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(Locale::resolve(Some("IT")), Locale::It);
        assert_eq!(Locale::resolve(Some(" Fr")), Locale::Fr);
    }

    #[test]
    fn test_housenumber_order() {
        assert!(Locale::En.housenumber_first());
        assert!(Locale::Fr.housenumber_first());
        assert!(!Locale::De.housenumber_first());
        assert!(!Locale::It.housenumber_first());
    }

    #[test]
    fn test_locale_key_parse() {
        assert_eq!(LocaleKey::parse("default"), Some(LocaleKey::Default));
        assert_eq!(LocaleKey::parse("de"), Some(LocaleKey::Locale(Locale::De)));
        assert_eq!(LocaleKey::parse("alt"), None);
        assert_eq!(LocaleKey::ALL.len(), 5);
    }

    #[test]
    fn test_locale_key_ordinal_matches_all() {
        for (idx, key) in LocaleKey::ALL.into_iter().enumerate() {
            assert_eq!(key.ordinal(), idx);
        }
    }
}
