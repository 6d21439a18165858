//! Query compilation: free text to a weighted multi-field match.
//!
//! Every multilingual field is targeted twice, once in the requested locale
//! and once in the language-neutral `default` variant. Each target carries a
//! boost from [`FieldWeights`]; the exact (whole string) name match dominates,
//! followed by the tokenized name, then city and street, housenumber,
//! postcode, and finally country and surrounding context.

use std::fmt;

use itertools::Itertools;
use tracing::{instrument, trace};
use waypoint_data::{Locale, LocaleKey};

use crate::config::ConfigError;

/// Whether every query token has to match, or any single one suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// `minimum_should_match = 100%`
    Strict,
    /// Any token match is enough.
    Relaxed,
}

impl Strictness {
    pub const fn minimum_should_match(self) -> &'static str {
        match self {
            Self::Strict => "100%",
            Self::Relaxed => "1",
        }
    }
}

/// A multilingual document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Name,
    City,
    Street,
    Country,
    Context,
}

impl TextField {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::City,
        Self::Street,
        Self::Country,
        Self::Context,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Street => "street",
            Self::Country => "country",
            Self::Context => "context",
        }
    }
}

/// A match target inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// The whole, lowercased name compared against the whole query.
    NameExact(LocaleKey),
    /// A tokenized multilingual field variant.
    Text(TextField, LocaleKey),
    Housenumber,
    Postcode,
}

impl FieldPath {
    pub const fn is_exact(&self) -> bool {
        matches!(self, Self::NameExact(_))
    }

    pub const fn variant(&self) -> Option<LocaleKey> {
        match self {
            Self::NameExact(key) | Self::Text(_, key) => Some(*key),
            Self::Housenumber | Self::Postcode => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameExact(key) => write!(f, "name.{key}.raw"),
            Self::Text(field, key) => write!(f, "{}.{key}", field.as_str()),
            Self::Housenumber => f.write_str("housenumber"),
            Self::Postcode => f.write_str("postcode"),
        }
    }
}

/// A match target with its boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBoost {
    pub path: FieldPath,
    pub boost: f32,
}

/// Relative importance of each match target.
///
/// Only the ordering is a contract; the absolute values may be recalibrated.
/// [`FieldWeights::validate`] enforces
/// `name_exact > name > city, street > housenumber > postcode > country, context > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    pub name_exact: f32,
    pub name: f32,
    pub city: f32,
    pub street: f32,
    pub housenumber: f32,
    pub postcode: f32,
    pub country: f32,
    pub context: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name_exact: 7.0,
            name: 1.0,
            city: 0.5,
            street: 0.5,
            housenumber: 0.4,
            postcode: 0.3,
            country: 0.1,
            context: 0.1,
        }
    }
}

impl FieldWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            self.name_exact,
            self.name,
            self.city,
            self.street,
            self.housenumber,
            self.postcode,
            self.country,
            self.context,
        ];
        if all.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ConfigError::InvalidWeights(format!(
                "all field weights must be finite and positive: {self:?}"
            )));
        }

        let ordered = self.name_exact > self.name
            && self.name > self.city.max(self.street)
            && self.city.min(self.street) > self.housenumber
            && self.housenumber > self.postcode
            && self.postcode > self.country.max(self.context);
        if !ordered {
            return Err(ConfigError::InvalidWeights(format!(
                "field weights must keep name_exact > name > city/street > housenumber > postcode > country/context: {self:?}"
            )));
        }
        Ok(())
    }

    pub const fn text(&self, field: TextField) -> f32 {
        match field {
            TextField::Name => self.name,
            TextField::City => self.city,
            TextField::Street => self.street,
            TextField::Country => self.country,
            TextField::Context => self.context,
        }
    }
}

/// Typo tolerance requested from the index. The compiler never applies it
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fuzziness {
    /// Maximum edit distance per token; a transposition counts as one edit.
    pub max_edits: u8,
    /// Number of leading characters that must match exactly.
    pub prefix_length: usize,
}

impl Default for Fuzziness {
    fn default() -> Self {
        Self {
            max_edits: 1,
            prefix_length: 2,
        }
    }
}

/// A compiled, index-agnostic match specification.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpec {
    text: String,
    tokens: Vec<String>,
    fields: Vec<FieldBoost>,
    strictness: Strictness,
    fuzziness: Fuzziness,
}

impl MatchSpec {
    /// The query as typed, trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The query in the normalized form exact name fields are indexed in.
    pub fn exact_text(&self) -> String {
        exact_form(&self.text)
    }

    /// Distinct lowercased query tokens in query order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// All targets, ordered from most to least important.
    pub fn fields(&self) -> &[FieldBoost] {
        &self.fields
    }

    pub fn exact_fields(&self) -> impl Iterator<Item = &FieldBoost> {
        self.fields.iter().filter(|f| f.path.is_exact())
    }

    pub fn token_fields(&self) -> impl Iterator<Item = &FieldBoost> {
        self.fields.iter().filter(|f| !f.path.is_exact())
    }

    pub const fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub const fn fuzziness(&self) -> Fuzziness {
        self.fuzziness
    }
}

/// Split text into lowercased alphanumeric runs.
///
/// This is the same segmentation the index applies to tokenized fields, so
/// tokens produced here can be compared against indexed terms directly.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .unique()
        .collect()
}

/// Normal form for whole-string comparison: whitespace collapsed, lowercased.
pub fn exact_form(text: &str) -> String {
    text.split_whitespace().join(" ").to_lowercase()
}

/// Turns query text into a [`MatchSpec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler {
    weights: FieldWeights,
    fuzziness: Fuzziness,
}

impl QueryCompiler {
    pub const fn new(weights: FieldWeights, fuzziness: Fuzziness) -> Self {
        Self { weights, fuzziness }
    }

    pub const fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    #[instrument(name = "Compile Query", level = "debug", skip(self))]
    pub fn compile(&self, text: &str, locale: Locale, strictness: Strictness) -> MatchSpec {
        let variants = [LocaleKey::Locale(locale), LocaleKey::Default];
        let w = &self.weights;

        let mut fields: Vec<FieldBoost> = variants
            .iter()
            .map(|&key| FieldBoost {
                path: FieldPath::NameExact(key),
                boost: w.name_exact,
            })
            .collect();

        for field in [TextField::Name, TextField::City, TextField::Street] {
            fields.extend(variants.iter().map(|&key| FieldBoost {
                path: FieldPath::Text(field, key),
                boost: w.text(field),
            }));
        }
        fields.push(FieldBoost {
            path: FieldPath::Housenumber,
            boost: w.housenumber,
        });
        fields.push(FieldBoost {
            path: FieldPath::Postcode,
            boost: w.postcode,
        });
        for field in [TextField::Country, TextField::Context] {
            fields.extend(variants.iter().map(|&key| FieldBoost {
                path: FieldPath::Text(field, key),
                boost: w.text(field),
            }));
        }

        let spec = MatchSpec {
            text: text.trim().to_owned(),
            tokens: tokenize(text),
            fields,
            strictness,
            fuzziness: self.fuzziness,
        };
        trace!(tokens = ?spec.tokens, num_fields = spec.fields.len(), "Compiled match spec");
        spec
    }
}
