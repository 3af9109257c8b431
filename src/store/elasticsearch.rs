//! Elasticsearch backend over the REST API.

use crate::indexing::IndexSchema;
use crate::models::{fields, ApodDocument};
use crate::store::{
    BulkItemFailure, BulkOutcome, DateRange, DocumentStore, MultiMatch, StoreConnector,
    StoreError, StoreHit, StoreQuery, StoreRequest, StoreResponse, StoreResult, YearBucket,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Response fields requested from `_search`; everything else is dropped server side
const SEARCH_FILTER_PATH: &str = "hits.hits._source,hits.hits._score,hits.total,aggregations";

/// Document store backed by an Elasticsearch cluster
#[derive(Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchStore {
    /// Create a client for the cluster at `base_url`. Does not contact it.
    pub fn new(
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);

        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.clone()),
            None => builder,
        }
    }

    /// Send a request and turn non-success statuses into [`StoreError`]s.
    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), &body))
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn ping(&self) -> StoreResult<()> {
        let response = self.send(self.request(Method::GET, "/")).await?;
        let info: Value = response.json().await?;
        debug!(
            cluster = %info["cluster_name"].as_str().unwrap_or("unknown"),
            version = %info["version"]["number"].as_str().unwrap_or("unknown"),
            "Elasticsearch cluster reachable"
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> StoreResult<()> {
        let builder = self
            .request(Method::DELETE, index)
            .query(&[("ignore_unavailable", "true")]);

        match self.send(builder).await {
            Ok(_) | Err(StoreError::IndexNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> StoreResult<()> {
        let builder = self
            .request(Method::PUT, index)
            .json(&schema.to_elasticsearch_body());
        self.send(builder).await?;
        Ok(())
    }

    async fn bulk_write(
        &self,
        index: &str,
        documents: &[ApodDocument],
    ) -> StoreResult<BulkOutcome> {
        let body = bulk_body(index, documents)?;
        let builder = self
            .request(Method::POST, "_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);

        let response: Value = self.send(builder).await?.json().await?;
        let outcome = parse_bulk_response(&response, documents.len());
        if outcome.has_errors() {
            warn!(
                index = %index,
                failed = outcome.failures.len(),
                submitted = outcome.submitted,
                "Bulk request reported item failures"
            );
        }
        Ok(outcome)
    }

    async fn write_one(&self, index: &str, document: &ApodDocument) -> StoreResult<()> {
        let builder = self
            .request(Method::POST, &format!("{}/_doc", index))
            .json(document);
        self.send(builder).await?;
        Ok(())
    }

    async fn refresh(&self, index: &str) -> StoreResult<()> {
        self.send(self.request(Method::POST, &format!("{}/_refresh", index)))
            .await?;
        Ok(())
    }

    async fn count(&self, index: &str) -> StoreResult<u64> {
        let response: Value = self
            .send(self.request(Method::GET, &format!("{}/_count", index)))
            .await?
            .json()
            .await?;

        response["count"]
            .as_u64()
            .ok_or_else(|| StoreError::Serialization("count response without 'count'".to_string()))
    }

    async fn search(&self, index: &str, request: &StoreRequest) -> StoreResult<StoreResponse> {
        let builder = self
            .request(Method::POST, &format!("{}/_search", index))
            .query(&[("filter_path", SEARCH_FILTER_PATH)])
            .json(&search_body(request));

        let response: Value = self.send(builder).await?.json().await?;
        let aggregation = request.aggregation.as_ref().map(|agg| agg.name.as_str());
        parse_search_response(response, aggregation)
    }
}

/// Connects to an Elasticsearch cluster and checks that it answers
pub struct ElasticsearchConnector {
    url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl ElasticsearchConnector {
    pub fn new(
        url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            username,
            password,
            timeout,
        }
    }
}

#[async_trait]
impl StoreConnector for ElasticsearchConnector {
    fn describe(&self) -> String {
        let url = match Url::parse(&self.url) {
            Ok(mut url) => {
                let _ = url.set_password(None);
                let _ = url.set_username("");
                url.to_string()
            }
            Err(_) => self.url.clone(),
        };
        format!("elasticsearch at {}", url)
    }

    async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        let store = ElasticsearchStore::new(
            self.url.clone(),
            self.username.clone(),
            self.password.clone(),
            self.timeout,
        )?;
        store.ping().await?;
        Ok(Arc::new(store))
    }
}

fn multi_match_clause(clause: &MultiMatch) -> Value {
    let fields: Vec<String> = clause.fields.iter().map(|f| f.render()).collect();
    json!({
        "multi_match": {
            "query": clause.query,
            "fields": fields,
        }
    })
}

fn date_range_clause(range: &DateRange) -> Value {
    json!({
        "range": {
            "date": {
                "gte": range.gte.format("%Y-%m-%d").to_string(),
                "lte": range.lte.format("%Y-%m-%d").to_string(),
                "format": "yyyy-MM-dd",
            }
        }
    })
}

/// Render a store request as an Elasticsearch `_search` body.
pub(crate) fn search_body(request: &StoreRequest) -> Value {
    let mut body = json!({
        "from": request.from,
        "size": request.size,
        "track_total_hits": true,
        "_source": { "excludes": [fields::EMBEDDING] },
    });

    match &request.query {
        StoreQuery::Bool { must, filter } => {
            let must: Vec<Value> = must.iter().map(multi_match_clause).collect();
            let filter: Vec<Value> = filter.iter().map(date_range_clause).collect();
            body["query"] = json!({ "bool": { "must": must, "filter": filter } });
        }
        StoreQuery::Knn {
            vector,
            k,
            num_candidates,
            filter,
        } => {
            let mut knn = json!({
                "field": fields::EMBEDDING,
                "query_vector": vector,
                "k": k,
                "num_candidates": num_candidates,
            });
            if !filter.is_empty() {
                let filter: Vec<Value> = filter.iter().map(date_range_clause).collect();
                knn["filter"] = Value::Array(filter);
            }
            body["knn"] = knn;
        }
    }

    if let Some(agg) = &request.aggregation {
        let mut aggs = Map::new();
        aggs.insert(
            agg.name.clone(),
            json!({
                "date_histogram": {
                    "field": fields::DATE,
                    "calendar_interval": "year",
                    "format": "yyyy",
                    "min_doc_count": 1,
                }
            }),
        );
        body["aggs"] = Value::Object(aggs);
    }

    body
}

/// Paired action/document lines for `_bulk`, newline terminated.
pub(crate) fn bulk_body(index: &str, documents: &[ApodDocument]) -> StoreResult<String> {
    let action = json!({ "index": { "_index": index } }).to_string();
    let mut body = String::new();

    for document in documents {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }

    Ok(body)
}

pub(crate) fn parse_bulk_response(response: &Value, submitted: usize) -> BulkOutcome {
    let mut failures = Vec::new();

    if let Some(items) = response["items"].as_array() {
        for (position, item) in items.iter().enumerate() {
            // Each item is keyed by its action name
            let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
                continue;
            };

            let status = result["status"].as_u64().unwrap_or(0) as u16;
            let error = &result["error"];
            if !error.is_null() || status >= 300 {
                let reason = match (error["type"].as_str(), error["reason"].as_str()) {
                    (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
                    (None, Some(reason)) => reason.to_string(),
                    _ => error.to_string(),
                };
                failures.push(BulkItemFailure {
                    position,
                    status,
                    reason,
                });
            }
        }
    }

    BulkOutcome {
        submitted,
        failures,
    }
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    hits: Option<RawHits>,
    #[serde(default)]
    aggregations: Option<HashMap<String, RawAggregation>>,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_source")]
    source: ApodDocument,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawAggregation {
    #[serde(default)]
    buckets: Vec<RawBucket>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    key_as_string: Option<String>,
    #[serde(default)]
    key: Value,
    doc_count: u64,
}

pub(crate) fn parse_search_response(
    response: Value,
    aggregation: Option<&str>,
) -> StoreResult<StoreResponse> {
    let raw: RawSearchResponse = serde_json::from_value(response)?;

    let (hits, total) = match raw.hits {
        Some(hits) => {
            let total = hits.total.map(|t| t.value).unwrap_or(hits.hits.len() as u64);
            let hits = hits
                .hits
                .into_iter()
                .map(|hit| StoreHit {
                    document: hit.source.without_embedding(),
                    score: hit.score.unwrap_or(0.0),
                })
                .collect();
            (hits, total)
        }
        None => (Vec::new(), 0),
    };

    let buckets = match (aggregation, raw.aggregations) {
        (Some(name), Some(mut aggregations)) => aggregations
            .remove(name)
            .map(|agg| {
                agg.buckets
                    .into_iter()
                    .map(|bucket| YearBucket {
                        key_as_string: bucket
                            .key_as_string
                            .unwrap_or_else(|| bucket.key.to_string()),
                        doc_count: bucket.doc_count,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    Ok(StoreResponse {
        hits,
        total,
        buckets,
    })
}

/// Map an Elasticsearch error body onto a [`StoreError`].
pub(crate) fn error_from_body(status: u16, body: &str) -> StoreError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = &parsed["error"];
    let kind = error["type"].as_str().unwrap_or_default();
    let reason = error["reason"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body.to_string()
            }
        });
    let index = error["index"].as_str().unwrap_or_default().to_string();

    match kind {
        "index_not_found_exception" => StoreError::IndexNotFound(index),
        "resource_already_exists_exception" => StoreError::IndexAlreadyExists(index),
        "mapper_parsing_exception" | "document_parsing_exception" | "illegal_argument_exception"
            if status == 400 =>
        {
            StoreError::Rejected(reason)
        }
        _ => StoreError::Status { status, reason },
    }
}
