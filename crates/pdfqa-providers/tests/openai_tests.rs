use pdfqa_core::CapabilityError;
use pdfqa_providers::openai::{
    decode_completion, decode_embeddings, status_error, ChatCompletionResponse, EmbeddingResponse,
};
use reqwest::StatusCode;

fn embeddings(json: &str) -> EmbeddingResponse {
    serde_json::from_str(json).expect("embedding fixture")
}

fn completion(json: &str) -> ChatCompletionResponse {
    serde_json::from_str(json).expect("completion fixture")
}

#[test]
fn embeddings_are_reordered_by_index() {
    let body = embeddings(
        r#"{"object":"list","model":"m","data":[
            {"object":"embedding","index":2,"embedding":[0.0,0.3]},
            {"object":"embedding","index":0,"embedding":[0.1,0.0]},
            {"object":"embedding","index":1,"embedding":[0.2,0.0]}
        ]}"#,
    );
    let vectors = decode_embeddings(body, 3, 2).expect("decode");
    assert_eq!(vectors, vec![vec![0.1, 0.0], vec![0.2, 0.0], vec![0.0, 0.3]]);
}

#[test]
fn short_batch_is_invalid_response() {
    let body = embeddings(r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#);
    let err = decode_embeddings(body, 2, 2).unwrap_err();
    assert!(matches!(err, CapabilityError::InvalidResponse(ref m) if m.contains("expected 2 embeddings, got 1")));
}

#[test]
fn wrong_dimension_is_invalid_response() {
    let body = embeddings(r#"{"data":[{"index":0,"embedding":[1.0,0.0]},{"index":1,"embedding":[1.0]}]}"#);
    let err = decode_embeddings(body, 2, 2).unwrap_err();
    assert!(matches!(err, CapabilityError::InvalidResponse(ref m) if m.contains("dimension mismatch")));
}

#[test]
fn completion_takes_first_choice() {
    let body = completion(
        r#"{"id":"c1","choices":[
            {"index":0,"message":{"role":"assistant","content":"Stone Town"},"finish_reason":"stop"},
            {"index":1,"message":{"role":"assistant","content":"Zanzibar City"},"finish_reason":"stop"}
        ]}"#,
    );
    assert_eq!(decode_completion(body).expect("decode"), "Stone Town");
}

#[test]
fn empty_choices_is_invalid_response() {
    let err = decode_completion(completion(r#"{"choices":[]}"#)).unwrap_err();
    assert!(matches!(err, CapabilityError::InvalidResponse(_)));
}

#[test]
fn http_status_mapping() {
    assert_eq!(status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"), Some(CapabilityError::RateLimited));
    assert!(matches!(
        status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
        Some(CapabilityError::Request(ref m)) if m.contains("500") && m.contains("boom")
    ));
    assert_eq!(status_error(StatusCode::OK, ""), None);
}
