//! HTTP contract tests for the OpenAI-compatible remote backends, run
//! against a local mock server.

use httpmock::prelude::*;
use serde_json::json;

use ragweave::completion::{CompletionModel, OpenAiCompletion};
use ragweave::embeddings::{EmbeddingProvider, RemoteEmbedder};
use ragweave::types::RagError;

fn embedder_for(server: &MockServer) -> RemoteEmbedder {
    RemoteEmbedder::new(
        reqwest::Client::new(),
        format!("{}/v1", server.base_url()),
        "test-key",
        "test-embed-model",
    )
}

fn completion_for(server: &MockServer) -> OpenAiCompletion {
    OpenAiCompletion::new(
        reqwest::Client::new(),
        format!("{}/v1", server.base_url()),
        "test-key",
        "test-chat-model",
    )
}

#[tokio::test]
async fn embed_many_restores_input_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{ "model": "test-embed-model" }"#);
            then.status(200).json_body(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            }));
        })
        .await;

    let embedder = embedder_for(&server);
    let vectors = embedder
        .embed_many(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert_eq!(embedder.identity(), "remote:test-embed-model");
}

#[tokio::test]
async fn embed_many_rejects_short_responses() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(json!({
                "data": [{ "index": 0, "embedding": [1.0, 0.0] }]
            }));
        })
        .await;

    let embedder = embedder_for(&server);
    let err = embedder
        .embed_many(&["first".to_string(), "second".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
}

#[tokio::test]
async fn embed_one_surfaces_http_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(500).body("backend exploded");
        })
        .await;

    let embedder = embedder_for(&server);
    let err = embedder.embed_one("hello").await.unwrap_err();
    assert!(matches!(err, RagError::Http(_)));
}

#[tokio::test]
async fn completion_extracts_first_choice() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{ "model": "test-chat-model", "temperature": 0.0 }"#);
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "content": "- the sky is blue" } }
                ]
            }));
        })
        .await;

    let completion = completion_for(&server);
    let answer = completion.complete("What color is the sky?").await.unwrap();

    mock.assert_async().await;
    assert_eq!(answer, "- the sky is blue");
}

#[tokio::test]
async fn completion_failure_maps_to_generation_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("rate limited");
        })
        .await;

    let completion = completion_for(&server);
    let err = completion.complete("anything").await.unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));
}

#[tokio::test]
async fn completion_with_no_choices_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        })
        .await;

    let completion = completion_for(&server);
    let err = completion.complete("anything").await.unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));
}
