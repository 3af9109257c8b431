//! Translation of store queries into Tantivy queries

use crate::models::fields;
use crate::store::embedded::schema::{to_tantivy_date, ApodFields, STANDARD_TOKENIZER};
use crate::store::{DateRange, MultiMatch, StoreError, StoreResult};
use std::collections::BTreeSet;
use std::ops::Bound;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery, Occur,
    Query, RangeQuery, TermQuery,
};
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};

/// Build the query for a bool request: scoring `must` clauses, non-scoring filters.
pub fn build_bool_query(
    index: &Index,
    apod_fields: &ApodFields,
    must: &[MultiMatch],
    filter: &[DateRange],
) -> StoreResult<Box<dyn Query>> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    for clause in must {
        clauses.push((Occur::Must, multi_match_query(index, apod_fields, clause)?));
    }

    for range in filter {
        clauses.push((Occur::Must, date_filter(range)));
    }

    if clauses.is_empty() {
        return Ok(Box::new(AllQuery));
    }

    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Best-fields multi match: per-field OR of analyzed terms, combined by dis-max.
fn multi_match_query(
    index: &Index,
    apod_fields: &ApodFields,
    clause: &MultiMatch,
) -> StoreResult<Box<dyn Query>> {
    let mut per_field: Vec<Box<dyn Query>> = Vec::new();
    let terms = analyze(index, &clause.query)?;

    for boosted in &clause.fields {
        let field = apod_fields.text_field(boosted.field).ok_or_else(|| {
            StoreError::InvalidQuery(format!("field '{}' is not searchable", boosted.field))
        })?;

        if terms.is_empty() {
            continue;
        }

        let should: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|text| {
                let query: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(field, text),
                    IndexRecordOption::WithFreqs,
                ));
                (Occur::Should, query)
            })
            .collect();

        let field_query: Box<dyn Query> = Box::new(BooleanQuery::new(should));
        if (boosted.boost - 1.0).abs() < f32::EPSILON {
            per_field.push(field_query);
        } else {
            per_field.push(Box::new(BoostQuery::new(field_query, boosted.boost)));
        }
    }

    if per_field.is_empty() {
        return Ok(Box::new(EmptyQuery));
    }

    Ok(Box::new(DisjunctionMaxQuery::new(per_field)))
}

/// Run query text through the standard analyzer, deduplicating terms.
///
/// Edge n-gram fields are only split into grams at index time, so a query
/// word matches documents holding a word it is a prefix of.
fn analyze(index: &Index, text: &str) -> StoreResult<BTreeSet<String>> {
    let mut analyzer = index.tokenizers().get(STANDARD_TOKENIZER).ok_or_else(|| {
        StoreError::InvalidQuery(format!("tokenizer '{}' is not registered", STANDARD_TOKENIZER))
    })?;
    let mut stream = analyzer.token_stream(text);
    let mut terms = BTreeSet::new();
    stream.process(&mut |token| {
        terms.insert(token.text.clone());
    });
    Ok(terms)
}

fn date_filter(range: &DateRange) -> Box<dyn Query> {
    let range_query = RangeQuery::new_date_bounds(
        fields::DATE.to_string(),
        Bound::Included(to_tantivy_date(range.gte)),
        Bound::Included(to_tantivy_date(range.lte)),
    );
    Box::new(ConstScoreQuery::new(Box::new(range_query), 0.0))
}
