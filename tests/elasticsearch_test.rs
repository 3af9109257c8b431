//! Engines over the Elasticsearch backend against a mock cluster

use apod_search::connection::{ConnectionManager, ConnectionPolicy};
use apod_search::indexing::{provision, IndexSchema};
use apod_search::search::{search, year_histogram, QueryRequest};
use apod_search::store::{ElasticsearchConnector, ElasticsearchStore};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn store(url: &str) -> ElasticsearchStore {
    ElasticsearchStore::new(url, None, None, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_search_sends_boosted_multi_match_with_year_filter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Regex(r"^/apod/_search".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "from": 10,
            "size": 5,
            "query": {
                "bool": {
                    "must": [{
                        "multi_match": {
                            "query": "crab nebula",
                            "fields": ["title^2", "explanation"]
                        }
                    }],
                    "filter": [{
                        "range": { "date": { "gte": "2020-01-01", "lte": "2020-12-31" } }
                    }]
                }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": {
                    "total": { "value": 12, "relation": "eq" },
                    "hits": [{
                        "_score": 3.5,
                        "_source": {
                            "title": "Crab Nebula",
                            "explanation": "A supernova remnant.",
                            "date": "2020-03-14",
                            "image_url": "https://apod.nasa.gov/apod/image/crab.jpg"
                        }
                    }]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = store(&server.url());
    let request = QueryRequest::new("crab nebula")
        .with_page(10, 5)
        .with_year("2020");
    let result = search(&store, "apod", &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.max_pages, 3);
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].document.title, "Crab Nebula");
    assert_eq!(result.hits[0].score, 3.5);
}

#[tokio::test]
async fn test_histogram_reshapes_buckets() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", Matcher::Regex(r"^/apod/_search".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "size": 0,
            "aggs": {
                "docs_per_year": {
                    "date_histogram": { "calendar_interval": "year", "format": "yyyy" }
                }
            }
        })))
        .with_status(200)
        .with_body(
            json!({
                "hits": { "total": { "value": 3, "relation": "eq" } },
                "aggregations": {
                    "docs_per_year": {
                        "buckets": [
                            { "key_as_string": "2019", "key": 1546300800000u64, "doc_count": 2 },
                            { "key_as_string": "2020", "key": 1577836800000u64, "doc_count": 1 }
                        ]
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let histogram = year_histogram(&store(&server.url()), "apod", "galaxy")
        .await
        .unwrap();

    let pairs: Vec<(&str, u64)> = histogram.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(pairs, vec![("2019", 2), ("2020", 1)]);
}

#[tokio::test]
async fn test_histogram_error_is_generalised() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", Matcher::Regex(r"^/apod/_search".to_string()))
        .with_status(500)
        .with_body(r#"{"error":{"type":"search_phase_execution_exception","reason":"all shards failed"},"status":500}"#)
        .create_async()
        .await;

    let err = year_histogram(&store(&server.url()), "apod", "galaxy")
        .await
        .unwrap_err();

    assert!(!err.message.contains("shards"));
}

#[tokio::test]
async fn test_provision_deletes_then_creates_edge_ngram_index() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", Matcher::Regex(r"^/apod_ngram".to_string()))
        .with_status(200)
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let create = server
        .mock("PUT", "/apod_ngram")
        .match_body(Matcher::PartialJson(json!({
            "settings": {
                "analysis": {
                    "tokenizer": {
                        "edge_ngram_tokenizer": { "type": "edge_ngram", "min_gram": 1, "max_gram": 30 }
                    }
                }
            }
        })))
        .with_status(200)
        .with_body(r#"{"acknowledged":true,"index":"apod_ngram"}"#)
        .create_async()
        .await;

    provision(&store(&server.url()), "apod_ngram", &IndexSchema::edge_ngram())
        .await
        .unwrap();

    delete.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_connection_manager_pings_once_and_caches() {
    let mut server = mockito::Server::new_async().await;
    let _ping = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"{"cluster_name":"apod","version":{"number":"8.13.0"}}"#)
        .expect(1)
        .create_async()
        .await;

    let connector = ElasticsearchConnector::new(server.url(), None, None, Duration::from_secs(5));
    let manager = ConnectionManager::new(Arc::new(connector));
    let policy = ConnectionPolicy::new(3, Duration::from_millis(1));

    let first = manager.connect(&policy).await.unwrap();
    let second = manager.connect(&policy).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.backend_name(), "elasticsearch");
}
