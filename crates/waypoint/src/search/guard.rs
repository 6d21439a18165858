use waypoint_data::{Document, Locale, LocaleKey};

use super::compiler::tokenize;

/// Keeps numbered address records out of results unless they were asked for.
///
/// A document is admitted if it has no housenumber, if its housenumber
/// shares a token with the query, or if it is also a named place in the
/// requested locale (or the `default` variant). Without this, every house
/// on a street would surface for a query that only names the street.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HousenumberGuard {
    tokens: Vec<String>,
    locale: Locale,
}

impl HousenumberGuard {
    pub fn new(text: &str, locale: Locale) -> Self {
        Self {
            tokens: tokenize(text),
            locale,
        }
    }

    /// Query tokens a housenumber may match.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Name variants that make an address record independently eligible.
    pub const fn name_variants(&self) -> [LocaleKey; 2] {
        [LocaleKey::Locale(self.locale), LocaleKey::Default]
    }

    pub fn admits(&self, document: &Document) -> bool {
        let Some(housenumber) = document.housenumber() else {
            return true;
        };
        tokenize(housenumber)
            .iter()
            .any(|t| self.tokens.contains(t))
            || document.is_named_in(self.locale)
    }
}

#[cfg(test)]
mod tests {
    use waypoint_data::{Coordinate, LocalizedText};

    use super::*;

    fn address(housenumber: Option<&str>) -> Document {
        Document {
            housenumber: housenumber.map(Into::into),
            street: LocalizedText::neutral("Rue Bergère"),
            ..Document::new(1, Coordinate::new(48.87, 2.34).unwrap())
        }
    }

    #[test]
    fn test_admits_non_address_records() {
        let guard = HousenumberGuard::new("rue bergère", Locale::Fr);
        assert!(guard.admits(&address(None)));
        assert!(guard.admits(&address(Some("  "))));
    }

    #[test]
    fn test_rejects_unrequested_housenumber() {
        let guard = HousenumberGuard::new("rue bergère", Locale::Fr);
        assert!(!guard.admits(&address(Some("25"))));
    }

    #[test]
    fn test_admits_requested_housenumber() {
        let guard = HousenumberGuard::new("25 rue bergère paris", Locale::Fr);
        assert!(guard.admits(&address(Some("25"))));
        assert!(!guard.admits(&address(Some("27"))));
    }

    #[test]
    fn test_housenumber_token_match_is_case_insensitive() {
        let guard = HousenumberGuard::new("rue bergère 25B", Locale::Fr);
        assert!(guard.admits(&address(Some("25b"))));
        let ranged = HousenumberGuard::new("main street 12", Locale::En);
        assert!(ranged.admits(&address(Some("12-14"))));
    }

    #[test]
    fn test_admits_named_address() {
        let guard = HousenumberGuard::new("bergère", Locale::De);
        let mut shop = address(Some("25"));
        shop.name = LocalizedText::new().with(Locale::It, "Bottega");
        assert!(!guard.admits(&shop), "an italian-only name does not count for de");

        shop.name = LocalizedText::neutral("Café Bergère");
        assert!(guard.admits(&shop));
    }
}
