//! JSON-lines document dumps: one serialized [`Document`] per line.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::{debug, info, instrument};

use crate::{
    document::Document,
    error::{DataError, Result},
};

/// Read every document from a JSON-lines dump. Blank lines are skipped.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_documents(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let file = File::open(path.as_ref())?;
    let documents = parse_documents(BufReader::new(file))?;
    info!(num_documents = documents.len(), "Loaded document dump");
    Ok(documents)
}

/// Parse documents from any buffered reader of JSON lines.
pub fn parse_documents(reader: impl BufRead) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = serde_json::from_str(&line).map_err(|source| DataError::Serde {
            line: idx + 1,
            source,
        })?;
        documents.push(document);
    }
    debug!(num_documents = documents.len(), "Parsed JSON lines");
    Ok(documents)
}

/// Write documents as JSON lines.
pub fn write_documents<'a>(
    path: impl AsRef<Path>,
    documents: impl IntoIterator<Item = &'a Document>,
) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    let mut count = 0;
    for document in documents {
        serde_json::to_writer(&mut writer, document)
            .map_err(|source| DataError::Serde { line: count + 1, source })?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
