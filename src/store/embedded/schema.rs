//! Tantivy schema and document mapping for the embedded store

use crate::indexing::{Analyzer, IndexSchema};
use crate::models::{fields, ApodDocument};
use crate::store::embedded::tokenizer::EdgeNgramTokenizer;
use crate::store::{StoreError, StoreResult};
use chrono::{NaiveDate, NaiveTime};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, INDEXED,
    STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer};
use tantivy::{DateTime, Index, TantivyDocument};

/// Stored copy of the full document, mirroring Elasticsearch's `_source`
pub const SOURCE: &str = "source";

/// Tantivy's built-in word tokenizer with lowercasing
pub const STANDARD_TOKENIZER: &str = "default";

pub const EDGE_NGRAM_TOKENIZER: &str = "edge_ngram";

/// Handles to the fields of an APOD index
#[derive(Debug, Clone, Copy)]
pub struct ApodFields {
    pub title: Field,
    pub explanation: Field,
    pub author: Field,
    pub image_url: Field,
    pub date: Field,
    pub source: Field,
}

impl ApodFields {
    /// Look the fields up in an existing schema
    pub fn from_schema(schema: &Schema) -> StoreResult<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| StoreError::Tantivy(format!("missing field '{}': {}", name, e)))
        };

        Ok(Self {
            title: field(fields::TITLE)?,
            explanation: field(fields::EXPLANATION)?,
            author: field(fields::AUTHOR)?,
            image_url: field(fields::IMAGE_URL)?,
            date: field(fields::DATE)?,
            source: field(SOURCE)?,
        })
    }

    /// Searchable text field by name
    pub fn text_field(&self, name: &str) -> Option<Field> {
        match name {
            fields::TITLE => Some(self.title),
            fields::EXPLANATION => Some(self.explanation),
            fields::AUTHOR => Some(self.author),
            _ => None,
        }
    }
}

fn tokenizer_name(analyzer: Analyzer) -> &'static str {
    match analyzer {
        Analyzer::Standard => STANDARD_TOKENIZER,
        Analyzer::EdgeNgram { .. } => EDGE_NGRAM_TOKENIZER,
    }
}

/// Build the Tantivy schema for an index definition
pub fn build_schema(definition: &IndexSchema) -> Schema {
    let mut schema_builder = Schema::builder();

    let indexing = TextFieldIndexing::default()
        .set_tokenizer(tokenizer_name(definition.analyzer()))
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(indexing);

    schema_builder.add_text_field(fields::TITLE, text_options.clone());
    schema_builder.add_text_field(fields::EXPLANATION, text_options.clone());
    schema_builder.add_text_field(fields::AUTHOR, text_options);

    // Keyword: indexed as a single term, never tokenized
    schema_builder.add_text_field(fields::IMAGE_URL, STRING);

    schema_builder.add_date_field(fields::DATE, INDEXED | STORED | FAST);

    schema_builder.add_text_field(SOURCE, STORED);

    schema_builder.build()
}

/// Register the analyzers an index definition relies on
pub fn register_tokenizers(index: &Index, definition: &IndexSchema) {
    if let Analyzer::EdgeNgram { min_gram, max_gram } = definition.analyzer() {
        let analyzer = TextAnalyzer::builder(EdgeNgramTokenizer::new(min_gram, max_gram))
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(EDGE_NGRAM_TOKENIZER, analyzer);
    }
}

/// Midnight UTC of a calendar date, at Tantivy's date precision
pub fn to_tantivy_date(date: NaiveDate) -> DateTime {
    DateTime::from_timestamp_secs(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

pub fn to_tantivy_doc(fields: &ApodFields, document: &ApodDocument) -> StoreResult<TantivyDocument> {
    let mut doc = TantivyDocument::new();

    doc.add_text(fields.title, &document.title);
    doc.add_text(fields.explanation, &document.explanation);
    if let Some(author) = &document.author {
        doc.add_text(fields.author, author);
    }
    doc.add_text(fields.image_url, &document.image_url);
    doc.add_date(fields.date, to_tantivy_date(document.date));
    doc.add_text(fields.source, serde_json::to_string(document)?);

    Ok(doc)
}

pub fn from_tantivy_doc(fields: &ApodFields, doc: &TantivyDocument) -> StoreResult<ApodDocument> {
    let source = doc
        .get_first(fields.source)
        .and_then(|v| v.as_str())
        .ok_or_else(|| StoreError::Serialization("stored document without source".to_string()))?;

    Ok(serde_json::from_str(source)?)
}
