//! End-to-end session tests against a mock HTTP backend.

use lantern_client::{ClientConfig, QaRequest, SearchFilters, stream_qa, stream_query_validation};
use lantern_types::{StreamUpdate, Termination};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHANNEL_CAPACITY: usize = 1024;

async fn drain(mut rx: mpsc::Receiver<StreamUpdate>) -> Vec<StreamUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn qa_session_folds_a_full_response() {
    let server = MockServer::start().await;

    let body = concat!(
        r#"{"top_documents": [{"document_id": "doc-1", "semantic_identifier": "Runbook", "link": "https://wiki.internal/runbook", "blurb": "Restart procedure", "source_type": "confluence", "boost": 1, "hidden": false, "score": 0.92, "match_highlights": [], "updated_at": null}], "predicted_flow": "question-answer", "predicted_search": "hybrid"}"#,
        "\n",
        r#"{"query_event_id": 42}"#,
        "\n",
        r#"{"answer_piece": "Restart with"}"#,
        "\n",
        r#"{"answer_piece": " `systemctl restart indexer`"}"#,
        "\n",
        r#"{"answer_piece": null}"#,
        "\n",
        r#"{"relevant_chunk_indices": [0]}"#,
        "\n",
        r#"{"quotes": [{"quote": "run systemctl restart indexer", "document_id": "doc-1", "link": "https://wiki.internal/runbook", "source_type": "confluence", "semantic_identifier": "Runbook", "blurb": "Restart procedure"}]}"#,
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/stream-direct-qa"))
        .and(body_partial_json(serde_json::json!({
            "query": "how do I restart the indexer?",
            "search_type": "hybrid",
            "filters": {"source_type": ["confluence"]},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    let request = QaRequest::new("how do I restart the indexer?").with_filters(SearchFilters {
        source_type: Some(vec!["confluence".to_string()]),
        document_set: None,
        time_cutoff: None,
    });

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let outcome = stream_qa(&config, &request, tx).await;
    let updates = drain(rx).await;

    assert_eq!(outcome.termination, Termination::Complete);
    assert_eq!(
        outcome.snapshot.answer,
        "Restart with `systemctl restart indexer`."
    );

    let quotes = outcome.snapshot.quotes.unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].document_id, "doc-1");

    let documents = outcome.snapshot.documents.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].semantic_identifier, "Runbook");

    assert!(updates.contains(&StreamUpdate::QueryEventId(42)));
    assert!(updates.contains(&StreamUpdate::SelectedDocIndices(vec![0])));
    // The quote phase opens with an empty list before real quotes land.
    assert!(updates.contains(&StreamUpdate::Quotes(vec![])));

    // Answer updates always carry the full accumulated text.
    let answers: Vec<&str> = updates
        .iter()
        .filter_map(|u| match u {
            StreamUpdate::Answer(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        answers,
        vec![
            "Restart with",
            "Restart with `systemctl restart indexer`",
            "Restart with `systemctl restart indexer`.",
        ]
    );
}

#[tokio::test]
async fn validation_session_streams_reasoning_then_verdict() {
    let server = MockServer::start().await;

    let body = concat!(
        r#"{"answer_piece": "The query names a documented system, "}"#,
        "\n",
        r#"{"answer_piece": "so it can be answered."}"#,
        "\n",
        r#"{"answerable": true}"#,
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/stream-query-validation"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    let request = QaRequest::new("how do I restart the indexer?");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let outcome = stream_query_validation(&config, &request, tx).await;
    let updates = drain(rx).await;

    assert_eq!(outcome.termination, Termination::Complete);
    assert_eq!(
        outcome.snapshot.reasoning,
        "The query names a documented system, so it can be answered."
    );
    assert_eq!(outcome.snapshot.answerable, Some(true));
    assert!(updates.contains(&StreamUpdate::Answerable(true)));
}

#[tokio::test]
async fn http_error_surfaces_as_error_update_and_transport_termination() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/stream-direct-qa"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index unavailable"))
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    let request = QaRequest::new("anything");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let outcome = stream_qa(&config, &request, tx).await;
    let updates = drain(rx).await;

    assert!(matches!(outcome.termination, Termination::Transport(_)));
    assert_eq!(outcome.snapshot.answer, "");
    assert!(updates.iter().any(|u| matches!(
        u,
        StreamUpdate::Error(message) if message.contains("500") && message.contains("index unavailable")
    )));
}

#[tokio::test]
async fn truncated_body_keeps_partial_answer_and_reports_the_tail() {
    let server = MockServer::start().await;

    let body = concat!(
        r#"{"answer_piece": "Partial answer"}"#,
        "\n",
        r#"{"answer_piece": " cut of"#,
    );

    Mock::given(method("POST"))
        .and(path("/api/stream-direct-qa"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    let request = QaRequest::new("anything");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let outcome = stream_qa(&config, &request, tx).await;
    drop(rx);

    assert_eq!(outcome.termination, Termination::TruncatedTail);
    assert_eq!(outcome.snapshot.answer, "Partial answer");
}

#[tokio::test]
async fn backend_error_packet_degrades_but_does_not_abort() {
    let server = MockServer::start().await;

    let body = concat!(
        r#"{"answer_piece": "Here is what I found"}"#,
        "\n",
        r#"{"error": "quote extraction failed"}"#,
        "\n",
        r#"{"answer_piece": null}"#,
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/stream-direct-qa"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
    let request = QaRequest::new("anything");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let outcome = stream_qa(&config, &request, tx).await;
    let updates = drain(rx).await;

    assert_eq!(outcome.termination, Termination::Complete);
    assert_eq!(outcome.snapshot.answer, "Here is what I found.");
    assert!(updates.contains(&StreamUpdate::Error("quote extraction failed".to_string())));
}
