//! Data model for the Waypoint place search library.
//!
//! This crate holds everything the search core and the index backends share:
//! the supported [`Locale`]s, multilingual [`LocalizedText`] fields, the place
//! [`Document`] as stored in the index, and helpers for JSON-lines document
//! dumps.
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::debug;

pub mod document;
pub mod dump;
pub mod locale;
pub mod test_data;

pub use document::{Coordinate, Document, LocalizedText};
pub use dump::{parse_documents, read_documents, write_documents};
pub use error::{DataError, Result};
pub use locale::{Locale, LocaleKey, UnsupportedLocale};

pub const DATA_DIR_DEFAULT: &str = "./waypoint_data";

/// Root directory for on-disk artifacts such as persisted search indexes.
///
/// Read once from `WAYPOINT_DATA_DIR`, falling back to [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let dir = std::env::var("WAYPOINT_DATA_DIR").unwrap_or_else(|_| DATA_DIR_DEFAULT.to_string());
    debug!(dir = %dir, "Resolved data directory");
    PathBuf::from(dir)
});

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Invalid document on line {line}: {source}")]
        Serde {
            line: usize,
            #[source]
            source: serde_json::Error,
        },
    }
    pub type Result<T> = std::result::Result<T, DataError>;
}
