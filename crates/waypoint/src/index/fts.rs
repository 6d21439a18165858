//! Tantivy-backed [`PlaceIndex`].
//!
//! Each multilingual field variant gets its own tokenized field
//! (`name_en`, `city_default`, ...). Names are additionally indexed whole and
//! lowercased (`name_en_raw`) for exact matches. The housenumber guard is
//! evaluated inside the index through a `has_housenumber` flag and a `named`
//! field listing the variants that carry a name, so filtering happens before
//! the top-k cut. Importance and coordinates live in fast fields and feed the
//! [`ScoringPolicy`](crate::search::ScoringPolicy) through a score tweaker.

use std::{collections::BTreeSet, path::Path};

use rapidfuzz::distance::osa;

use tantivy::{
    DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, Searcher, SegmentReader,
    TantivyDocument, Term,
    collector::{Count, TopDocs},
    query::{BooleanQuery, BoostQuery, ConstScoreQuery, Occur, Query, TermQuery},
    schema::{
        FAST, INDEXED, IndexRecordOption, STORED, STRING, Field, Schema, SchemaBuilder,
        TextFieldIndexing, TextOptions, Value,
    },
    tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer},
};
use tracing::{debug, info, instrument, trace, warn};
use waypoint_data::{Coordinate, Document, LocaleKey, LocalizedText};

use super::{Hit, IndexResponse, PlaceIndex, PlaceQuery, error::Result};
use crate::search::{
    FieldPath, Fuzziness, HousenumberGuard, MatchSpec, Strictness, TextField, exact_form,
};

const RAW_LOWERCASE: &str = "raw_lowercase";
const WRITER_MEMORY_BUDGET: usize = 50_000_000;
/// Fuzzy matches score at this fraction of the exact term's field boost.
const FUZZY_BOOST_FACTOR: f32 = 0.5;
/// Most indexed terms a single fuzzy token may expand to.
const MAX_FUZZY_EXPANSIONS: usize = 50;

/// One field per [`LocaleKey`], indexed by [`LocaleKey::ordinal`].
#[derive(Debug, Clone, Copy)]
struct VariantFields([Field; 5]);

impl VariantFields {
    fn lookup(schema: &Schema, prefix: &str, suffix: &str) -> Result<Self> {
        let mut fields = [Field::from_field_id(0); 5];
        for key in LocaleKey::ALL {
            fields[key.ordinal()] = schema.get_field(&format!("{prefix}_{key}{suffix}"))?;
        }
        Ok(Self(fields))
    }

    const fn get(&self, key: LocaleKey) -> Field {
        self.0[key.ordinal()]
    }
}

/// Field handles resolved once per index.
#[derive(Debug, Clone, Copy)]
struct PlaceFields {
    source: Field,
    osm_id: Field,
    name: VariantFields,
    name_exact: VariantFields,
    city: VariantFields,
    street: VariantFields,
    country: VariantFields,
    context: VariantFields,
    name_alternates: Field,
    housenumber: Field,
    postcode: Field,
    has_housenumber: Field,
    named: Field,
    importance: Field,
    lat: Field,
    lon: Field,
}

impl PlaceFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        Ok(Self {
            source: schema.get_field("source")?,
            osm_id: schema.get_field("osm_id")?,
            name: VariantFields::lookup(schema, "name", "")?,
            name_exact: VariantFields::lookup(schema, "name", "_raw")?,
            city: VariantFields::lookup(schema, "city", "")?,
            street: VariantFields::lookup(schema, "street", "")?,
            country: VariantFields::lookup(schema, "country", "")?,
            context: VariantFields::lookup(schema, "context", "")?,
            name_alternates: schema.get_field("name_alternates")?,
            housenumber: schema.get_field("housenumber")?,
            postcode: schema.get_field("postcode")?,
            has_housenumber: schema.get_field("has_housenumber")?,
            named: schema.get_field("named")?,
            importance: schema.get_field("importance")?,
            lat: schema.get_field("lat")?,
            lon: schema.get_field("lon")?,
        })
    }

    const fn text(&self, field: TextField) -> &VariantFields {
        match field {
            TextField::Name => &self.name,
            TextField::City => &self.city,
            TextField::Street => &self.street,
            TextField::Country => &self.country,
            TextField::Context => &self.context,
        }
    }

    /// Index fields a tokenized match target resolves to. The neutral name
    /// also covers alternative names.
    fn token_targets(&self, path: FieldPath) -> Vec<Field> {
        match path {
            FieldPath::Text(TextField::Name, LocaleKey::Default) => {
                vec![self.name.get(LocaleKey::Default), self.name_alternates]
            }
            FieldPath::Text(field, key) => vec![self.text(field).get(key)],
            FieldPath::Housenumber => vec![self.housenumber],
            FieldPath::Postcode => vec![self.postcode],
            FieldPath::NameExact(_) => Vec::new(),
        }
    }
}

fn build_schema() -> Schema {
    let mut schema_builder = SchemaBuilder::new();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    // Whole value as a single lowercased term
    let exact_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(RAW_LOWERCASE)
            .set_index_option(IndexRecordOption::WithFreqs),
    );

    schema_builder.add_text_field("source", STORED);
    schema_builder.add_i64_field("osm_id", STORED | INDEXED | FAST);
    for field in TextField::ALL {
        for key in LocaleKey::ALL {
            schema_builder.add_text_field(&format!("{}_{key}", field.as_str()), text_options.clone());
        }
    }
    for key in LocaleKey::ALL {
        schema_builder.add_text_field(&format!("name_{key}_raw"), exact_options.clone());
    }
    schema_builder.add_text_field("name_alternates", text_options.clone());
    schema_builder.add_text_field("housenumber", text_options.clone());
    schema_builder.add_text_field("postcode", text_options);
    schema_builder.add_bool_field("has_housenumber", INDEXED);
    schema_builder.add_text_field("named", STRING);
    schema_builder.add_f64_field("importance", FAST);
    schema_builder.add_f64_field("lat", FAST);
    schema_builder.add_f64_field("lon", FAST);
    schema_builder.build()
}

fn register_tokenizers(index: &Index) {
    index.tokenizers().register(
        RAW_LOWERCASE,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
}

/// A place index held by Tantivy, in RAM or on disk.
#[derive(Clone)]
pub struct TantivyPlaceIndex {
    index: Index,
    reader: IndexReader,
    fields: PlaceFields,
}

impl std::fmt::Debug for TantivyPlaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyPlaceIndex")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl TantivyPlaceIndex {
    /// Build an index in RAM from the given documents.
    #[instrument(name = "Create In-Memory Index", skip_all, level = "info")]
    pub fn in_memory<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Result<Self> {
        let index = Index::create_in_ram(build_schema());
        register_tokenizers(&index);
        let fields = PlaceFields::from_schema(&index.schema())?;
        Self::populate(&index, &fields, documents)?;
        Self::from_index(index, fields)
    }

    /// Open the index stored at `path`, or (re)build it from `documents`.
    ///
    /// An existing index is reused only when `overwrite` is false and it
    /// holds exactly as many documents as given; otherwise it is rebuilt.
    #[instrument(name = "Open Or Create Index", skip_all, fields(path = %path.as_ref().display(), overwrite = overwrite))]
    pub fn open_or_create(
        path: impl AsRef<Path>,
        documents: &[Document],
        overwrite: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        if overwrite && path.exists() {
            info!(path = ?path, "Overwriting existing index directory.");
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;

        if path.join("meta.json").exists() {
            match Index::open_in_dir(path) {
                Ok(existing) => {
                    register_tokenizers(&existing);
                    let fields = PlaceFields::from_schema(&existing.schema())?;
                    let opened = Self::from_index(existing, fields)?;
                    let actual = opened.num_docs() as usize;
                    if actual == documents.len() {
                        info!(path = ?path, actual, "Index is up-to-date. Loaded existing index.");
                        return Ok(opened);
                    }
                    info!(path = ?path, actual, expected = documents.len(), "Index out of date (doc count mismatch). Re-indexing.");
                }
                Err(e) => {
                    warn!(path = ?path, error = ?e, "Failed to open existing index, will re-index.");
                }
            }
            std::fs::remove_dir_all(path)?;
            std::fs::create_dir_all(path)?;
        }

        info!(path = ?path, "Creating new place index");
        let index = Index::create_in_dir(path, build_schema())?;
        register_tokenizers(&index);
        let fields = PlaceFields::from_schema(&index.schema())?;
        Self::populate(&index, &fields, documents)?;
        Self::from_index(index, fields)
    }

    fn from_index(index: Index, fields: PlaceFields) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    fn populate<'a>(
        index: &Index,
        fields: &PlaceFields,
        documents: impl IntoIterator<Item = &'a Document>,
    ) -> Result<()> {
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
        let mut count = 0usize;
        for document in documents {
            writer.add_document(to_tantivy(fields, document)?)?;
            count += 1;
        }
        writer.commit()?;
        if count == 0 {
            warn!("No documents to index. Index will be empty.");
        } else {
            info!(num_documents = count, "Index population complete");
        }
        Ok(())
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn term_query(field: Field, text: &str, boost: f32) -> Box<dyn Query> {
        let query = TermQuery::new(
            Term::from_field_text(field, text),
            IndexRecordOption::WithFreqs,
        );
        Box::new(BoostQuery::new(Box::new(query), boost))
    }

    /// Indexed terms of `field` within `fuzziness` of `token`, other than
    /// `token` itself. Candidates must start with the token's first
    /// `prefix_length` characters, so only the term range under that prefix
    /// is scanned.
    fn fuzzy_expansions(
        searcher: &Searcher,
        field: Field,
        token: &str,
        fuzziness: Fuzziness,
    ) -> Result<BTreeSet<String>> {
        let prefix: String = token.chars().take(fuzziness.prefix_length).collect();
        let max_edits = usize::from(fuzziness.max_edits);

        let mut expansions = BTreeSet::new();
        for segment_reader in searcher.segment_readers() {
            let inverted_index = segment_reader.inverted_index(field)?;
            let mut terms = inverted_index.terms().range().ge(prefix.as_bytes()).into_stream()?;
            while terms.advance() {
                if !terms.key().starts_with(prefix.as_bytes()) {
                    break;
                }
                let Ok(term) = std::str::from_utf8(terms.key()) else {
                    continue;
                };
                if term != token && osa::distance(token.chars(), term.chars()) <= max_edits {
                    expansions.insert(term.to_owned());
                }
            }
        }
        if expansions.len() > MAX_FUZZY_EXPANSIONS {
            debug!(token, num_terms = expansions.len(), "Truncating fuzzy expansions");
        }
        Ok(expansions.into_iter().take(MAX_FUZZY_EXPANSIONS).collect())
    }

    /// Disjunction over every tokenized target for one query token.
    fn token_query(&self, searcher: &Searcher, token: &str, spec: &MatchSpec) -> Result<Box<dyn Query>> {
        let fuzziness = spec.fuzziness();
        let fuzzy = fuzziness.max_edits > 0 && token.chars().count() > fuzziness.prefix_length;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for target in spec.token_fields() {
            for field in self.fields.token_targets(target.path) {
                clauses.push((Occur::Should, Self::term_query(field, token, target.boost)));
                if fuzzy && matches!(target.path, FieldPath::Text(TextField::Name, _)) {
                    for term in Self::fuzzy_expansions(searcher, field, token, fuzziness)? {
                        clauses.push((
                            Occur::Should,
                            Self::term_query(field, &term, target.boost * FUZZY_BOOST_FACTOR),
                        ));
                    }
                }
            }
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn match_query(&self, searcher: &Searcher, spec: &MatchSpec) -> Result<Box<dyn Query>> {
        let token_occur = match spec.strictness() {
            Strictness::Strict => Occur::Must,
            Strictness::Relaxed => Occur::Should,
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = spec
            .tokens()
            .iter()
            .map(|token| Ok((token_occur, self.token_query(searcher, token, spec)?)))
            .collect::<Result<_>>()?;

        let exact_text = spec.exact_text();
        for target in spec.exact_fields() {
            if let FieldPath::NameExact(key) = target.path {
                clauses.push((
                    Occur::Should,
                    Self::term_query(self.fields.name_exact.get(key), &exact_text, target.boost),
                ));
            }
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Filter admitting exactly the documents [`HousenumberGuard::admits`] would.
    fn guard_query(&self, guard: &HousenumberGuard) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Should,
            Box::new(TermQuery::new(
                Term::from_field_bool(self.fields.has_housenumber, false),
                IndexRecordOption::Basic,
            )),
        )];
        for token in guard.tokens() {
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.housenumber, token),
                    IndexRecordOption::Basic,
                )),
            ));
        }
        for key in guard.name_variants() {
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.named, key.as_str()),
                    IndexRecordOption::Basic,
                )),
            ));
        }
        Box::new(ConstScoreQuery::new(Box::new(BooleanQuery::new(clauses)), 0.0))
    }

    fn build_query(&self, searcher: &Searcher, query: &PlaceQuery) -> Result<Box<dyn Query>> {
        Ok(Box::new(BooleanQuery::new(vec![
            (Occur::Must, self.match_query(searcher, &query.match_spec)?),
            (Occur::Must, self.guard_query(&query.guard)),
        ])))
    }
}

impl PlaceIndex for TantivyPlaceIndex {
    fn name(&self) -> &'static str {
        "tantivy"
    }

    #[instrument(name = "Execute Place Query", skip_all, level = "debug",
        fields(query = query.match_spec.text(), strictness = ?query.match_spec.strictness(), limit = query.limit))]
    fn execute(&self, query: &PlaceQuery) -> Result<IndexResponse> {
        let searcher = self.reader.searcher();
        let tantivy_query = self.build_query(&searcher, query)?;
        trace!(?tantivy_query, "Final query constructed");

        let scoring = query.scoring;
        let top_docs = TopDocs::with_limit(query.limit.max(1)).tweak_score(
            move |segment_reader: &SegmentReader| {
                let fast_fields = segment_reader.fast_fields();
                let importance = fast_fields.f64("importance").ok();
                let lat = fast_fields.f64("lat").ok();
                let lon = fast_fields.f64("lon").ok();
                move |doc: DocId, base: Score| {
                    let importance = importance
                        .as_ref()
                        .and_then(|c| c.first(doc))
                        .unwrap_or(0.0);
                    let coordinate = lat
                        .as_ref()
                        .and_then(|c| c.first(doc))
                        .zip(lon.as_ref().and_then(|c| c.first(doc)))
                        .map(|(lat, lon)| Coordinate { lat, lon });
                    scoring.score(f64::from(base), importance, coordinate.as_ref())
                }
            },
        );

        let t_search = std::time::Instant::now();
        let (total_hits, top_docs) = searcher.search(&*tantivy_query, &(Count, top_docs))?;
        debug!(
            total_hits,
            num_results = top_docs.len(),
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        let hits = top_docs
            .into_iter()
            .map(|(score, doc_address)| {
                let stored = searcher.doc::<TantivyDocument>(doc_address)?;
                let source = stored
                    .get_first(self.fields.source)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        anyhow::anyhow!("Stored document is missing its source: {doc_address:?}")
                    })?;
                Ok(Hit {
                    score,
                    document: serde_json::from_str(source)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(IndexResponse { total_hits, hits })
    }
}

fn add_variants(doc: &mut TantivyDocument, fields: &VariantFields, text: &LocalizedText) {
    for (key, value) in text.variants() {
        doc.add_text(fields.get(key), value);
    }
}

fn to_tantivy(fields: &PlaceFields, document: &Document) -> Result<TantivyDocument> {
    let mut doc = TantivyDocument::default();
    doc.add_text(fields.source, serde_json::to_string(document)?);
    doc.add_i64(fields.osm_id, document.osm_id);

    for (key, value) in document.name.variants() {
        doc.add_text(fields.name.get(key), value);
        doc.add_text(fields.name_exact.get(key), exact_form(value));
        doc.add_text(fields.named, key.as_str());
    }
    for alternate in document.name.alternates() {
        doc.add_text(fields.name_alternates, alternate);
    }
    add_variants(&mut doc, &fields.city, &document.city);
    add_variants(&mut doc, &fields.street, &document.street);
    add_variants(&mut doc, &fields.country, &document.country);
    add_variants(&mut doc, &fields.context, &document.context);

    if let Some(housenumber) = document.housenumber() {
        doc.add_text(fields.housenumber, housenumber);
    }
    doc.add_bool(fields.has_housenumber, document.housenumber().is_some());
    if let Some(postcode) = document.postcode.as_deref() {
        doc.add_text(fields.postcode, postcode);
    }

    doc.add_f64(fields.importance, document.importance());
    doc.add_f64(fields.lat, document.coordinate.lat);
    doc.add_f64(fields.lon, document.coordinate.lon);
    Ok(doc)
}
