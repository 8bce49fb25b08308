use super::*;
use crate::test_support::spawn_server;
use axum::{http::StatusCode, routing::post, Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_batching_small() {
    let batcher = Batcher::new(3);
    let items = vec![
        "chunk1".to_string(),
        "chunk2".to_string(),
        "chunk3".to_string(),
        "chunk4".to_string(),
        "chunk5".to_string(),
    ];

    let batches = batcher.split(&items);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[1].len(), 2);
}

#[test]
fn test_batching_empty() {
    let batcher = Batcher::new(100);
    let items: Vec<String> = vec![];

    let batches = batcher.split(&items);
    assert_eq!(batches.len(), 0);
}

#[test]
fn test_batching_zero_size() {
    let batcher = Batcher::new(0);
    let items = vec!["a".to_string(); 3];

    // Zero would make slice::chunks panic
    assert_eq!(batcher.split(&items).len(), 3);
}

#[test]
fn test_model_info_default() {
    let model = EmbeddingModelInfo::default();
    assert_eq!(model.name, "all-MiniLM-L6-v2");
    assert_eq!(model.dim, 384);
    assert_eq!(model.max_batch, 32);
}

#[test]
fn test_model_info_from_name() {
    let model = EmbeddingModelInfo::from_name("sentence-transformers/all-mpnet-base-v2");
    assert_eq!(model.name, "sentence-transformers/all-mpnet-base-v2");
    assert_eq!(model.dim, 768);

    let unknown = EmbeddingModelInfo::from_name("my-custom-model");
    assert!(!unknown.has_known_dim());
}

#[tokio::test]
async fn test_client_empty_input() {
    // Never reaches the network
    let client = EmbeddingClient::new("http://127.0.0.1:9");
    let result = client.embed(vec![]).await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().len(), 0);
}

#[test]
fn test_client_trims_endpoint() {
    let client = EmbeddingClient::new("http://localhost:18115/");
    assert_eq!(client.endpoint(), "http://localhost:18115");
}

fn fake_embed_server(calls: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/embed",
        post(move |Json(req): Json<EmbeddingRequest>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let embeddings = req
                    .texts
                    .iter()
                    .map(|t| vec![t.len() as f32, 1.0, 0.0])
                    .collect();
                Json(EmbeddingResponse { embeddings })
            }
        }),
    )
}

#[tokio::test]
async fn test_client_batches_requests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let url = spawn_server(fake_embed_server(calls.clone())).await;

    let client = EmbeddingClient::with_model(url, EmbeddingModelInfo::new("fake", 3, 2));
    let texts: Vec<String> = (0..5).map(|i| "x".repeat(i + 1)).collect();

    let embeddings = client.embed(texts).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(embeddings.len(), 5);
    // Order is preserved across batches
    let lengths: Vec<f32> = embeddings.iter().map(|v| v[0]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn test_client_embed_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let url = spawn_server(fake_embed_server(calls)).await;

    let client = EmbeddingClient::with_model(url, EmbeddingModelInfo::new("fake", 3, 32));
    let vector = client.embed_query("four").await.unwrap();

    assert_eq!(vector, vec![4.0, 1.0, 0.0]);
}

#[tokio::test]
async fn test_client_rejects_wrong_dimension() {
    let calls = Arc::new(AtomicUsize::new(0));
    let url = spawn_server(fake_embed_server(calls)).await;

    let client = EmbeddingClient::with_model(url, EmbeddingModelInfo::new("fake", 384, 32));
    let result = client.embed(vec!["text".to_string()]).await;

    assert!(matches!(
        result,
        Err(EmbedError::DimensionMismatch {
            expected: 384,
            got: 3
        })
    ));
}

#[tokio::test]
async fn test_client_rejects_short_response() {
    let app = Router::new().route(
        "/embed",
        post(|| async {
            Json(EmbeddingResponse {
                embeddings: vec![vec![0.0, 1.0]],
            })
        }),
    );
    let url = spawn_server(app).await;

    let client = EmbeddingClient::with_model(url, EmbeddingModelInfo::new("fake", 2, 32));
    let result = client
        .embed(vec!["one".to_string(), "two".to_string()])
        .await;

    assert!(matches!(
        result,
        Err(EmbedError::CountMismatch {
            expected: 2,
            got: 1
        })
    ));
}

#[tokio::test]
async fn test_client_server_error() {
    let app = Router::new().route(
        "/embed",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model still loading") }),
    );
    let url = spawn_server(app).await;

    let client = EmbeddingClient::new(url);
    let result = client.embed(vec!["text".to_string()]).await;

    match result {
        Err(EmbedError::ServerError { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "model still loading");
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

// Integration test - requires the embedding server running
#[tokio::test]
#[ignore]
async fn test_client_round_trip() {
    let client = EmbeddingClient::new(DEFAULT_EMBEDDING_ENDPOINT);
    let texts = vec![
        "This is a test sentence.".to_string(),
        "Another test sentence here.".to_string(),
    ];

    let embeddings = client.embed(texts).await.unwrap();
    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0].len(), 384);
}
