//! Wire packets and field-presence classification.
//!
//! The stream is a flat union, not a strict sum type: packets carry no type
//! tag and are distinguished only by which fields are present. Classification
//! therefore tests candidate fields in a fixed priority order - first match
//! wins - rather than iterating whatever key order the payload happens to
//! have. The order is:
//!
//! | Field | Packet |
//! |-------|--------|
//! | `answer_piece` (string) | [`Packet::AnswerToken`] |
//! | `answer_piece` (null) | [`Packet::AnswerEnd`] |
//! | `top_documents` | [`Packet::DocumentBundle`] |
//! | `relevant_chunk_indices` | [`Packet::RelevanceFilter`] |
//! | `quotes` | [`Packet::QuoteBundle`] |
//! | `query_event_id` | [`Packet::QueryIdentifier`] |
//! | `answerable` | [`Packet::ValidationVerdict`] |
//! | `error` | [`Packet::ErrorSignal`] |
//!
//! A record with none of these fields is unrecognized: the caller logs and
//! moves on. A discriminating field with a payload of the wrong type is a
//! parse error. `answer_piece` is the only field where null is meaningful
//! (the end-of-answer sentinel); any other discriminating field that is
//! present but null carries no payload and is dropped as unrecognized.

use lantern_types::{Quote, QueryFlow, SearchDoc, SearchType};
use serde::Deserialize;
use serde_json::Value;

/// One record failed structured parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("malformed `{field}` payload: {source}")]
    Payload {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// One classified packet from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Incremental answer text.
    AnswerToken(String),
    /// End-of-answer sentinel (`answer_piece: null`).
    AnswerEnd,
    /// Scored candidate documents plus optional routing hints.
    DocumentBundle(DocumentBundle),
    /// Document indices judged relevant by the secondary filter pass.
    RelevanceFilter(Vec<usize>),
    /// Supporting quotes, possibly empty.
    QuoteBundle(Vec<Quote>),
    /// Identifier correlating the stream to a logged query event.
    QueryIdentifier(i64),
    /// Answerability verdict (validation streams).
    ValidationVerdict(bool),
    /// Application-level error message.
    ErrorSignal(String),
}

/// Payload of a [`Packet::DocumentBundle`].
///
/// `top_documents` discriminates the packet but may itself be null; the
/// routing hints can ride along either way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentBundle {
    pub top_documents: Option<Vec<SearchDoc>>,
    #[serde(default)]
    pub predicted_flow: Option<QueryFlow>,
    #[serde(default)]
    pub predicted_search: Option<SearchType>,
}

fn typed<T>(field: &'static str, value: &Value) -> Result<Option<T>, ParseError>
where
    T: serde::de::DeserializeOwned,
{
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|source| ParseError::Payload { field, source })
}

/// Parse one complete record and classify it.
///
/// `Ok(None)` means the record was well formed but matched no known shape;
/// that is valid, not an error, and the caller must continue with the next
/// packet.
pub fn parse_packet(record: &str) -> Result<Option<Packet>, ParseError> {
    let value: Value = serde_json::from_str(record)?;
    let Value::Object(fields) = &value else {
        return Err(ParseError::NotAnObject);
    };

    if let Some(piece) = fields.get("answer_piece") {
        return Ok(Some(match typed::<String>("answer_piece", piece)? {
            Some(text) => Packet::AnswerToken(text),
            None => Packet::AnswerEnd,
        }));
    }

    if fields.contains_key("top_documents") {
        let bundle = serde_json::from_value(value.clone())
            .map_err(|source| ParseError::Payload {
                field: "top_documents",
                source,
            })?;
        return Ok(Some(Packet::DocumentBundle(bundle)));
    }

    if let Some(indices) = fields.get("relevant_chunk_indices") {
        return Ok(typed::<Vec<usize>>("relevant_chunk_indices", indices)?
            .map(Packet::RelevanceFilter));
    }

    if let Some(quotes) = fields.get("quotes") {
        return Ok(typed::<Vec<Quote>>("quotes", quotes)?.map(Packet::QuoteBundle));
    }

    if let Some(id) = fields.get("query_event_id") {
        return Ok(typed::<i64>("query_event_id", id)?.map(Packet::QueryIdentifier));
    }

    if let Some(verdict) = fields.get("answerable") {
        return Ok(typed::<bool>("answerable", verdict)?.map(Packet::ValidationVerdict));
    }

    if let Some(message) = fields.get("error") {
        return Ok(typed::<String>("error", message)?.map(Packet::ErrorSignal));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::{Packet, ParseError, parse_packet};

    fn parse(record: &str) -> Option<Packet> {
        parse_packet(record).unwrap()
    }

    #[test]
    fn classifies_answer_token() {
        assert_eq!(
            parse(r#"{"answer_piece": "The answer"}"#),
            Some(Packet::AnswerToken("The answer".to_string()))
        );
    }

    #[test]
    fn null_answer_piece_is_the_end_sentinel() {
        assert_eq!(parse(r#"{"answer_piece": null}"#), Some(Packet::AnswerEnd));
    }

    #[test]
    fn classifies_document_bundle_with_hints() {
        let record = r#"{
            "top_documents": [{
                "document_id": "doc-1",
                "semantic_identifier": "Runbook",
                "link": "https://wiki.internal/runbook",
                "blurb": "Restart procedure",
                "source_type": "confluence",
                "boost": 1,
                "hidden": false,
                "score": 0.92,
                "match_highlights": [],
                "updated_at": null
            }],
            "predicted_flow": "question-answer",
            "predicted_search": "hybrid",
            "time_cutoff": null,
            "favor_recent": false
        }"#;
        match parse(record) {
            Some(Packet::DocumentBundle(bundle)) => {
                assert_eq!(bundle.top_documents.unwrap().len(), 1);
                assert_eq!(
                    bundle.predicted_flow,
                    Some(lantern_types::QueryFlow::QuestionAnswer)
                );
                assert_eq!(
                    bundle.predicted_search,
                    Some(lantern_types::SearchType::Hybrid)
                );
            }
            other => panic!("expected DocumentBundle, got {other:?}"),
        }
    }

    #[test]
    fn document_bundle_with_null_list_keeps_hints() {
        let record = r#"{"top_documents": null, "predicted_flow": "search"}"#;
        match parse(record) {
            Some(Packet::DocumentBundle(bundle)) => {
                assert!(bundle.top_documents.is_none());
                assert_eq!(bundle.predicted_flow, Some(lantern_types::QueryFlow::Search));
            }
            other => panic!("expected DocumentBundle, got {other:?}"),
        }
    }

    #[test]
    fn classifies_relevance_filter() {
        assert_eq!(
            parse(r#"{"relevant_chunk_indices": [0, 2, 5]}"#),
            Some(Packet::RelevanceFilter(vec![0, 2, 5]))
        );
    }

    #[test]
    fn classifies_empty_quote_bundle() {
        assert_eq!(parse(r#"{"quotes": []}"#), Some(Packet::QuoteBundle(vec![])));
    }

    #[test]
    fn classifies_query_identifier_verdict_and_error() {
        assert_eq!(
            parse(r#"{"query_event_id": 42}"#),
            Some(Packet::QueryIdentifier(42))
        );
        assert_eq!(
            parse(r#"{"answerable": true}"#),
            Some(Packet::ValidationVerdict(true))
        );
        assert_eq!(
            parse(r#"{"error": "model overloaded"}"#),
            Some(Packet::ErrorSignal("model overloaded".to_string()))
        );
    }

    #[test]
    fn priority_order_breaks_field_ties() {
        // A payload carrying fields of two schemas classifies by the
        // documented order, not by key order in the object.
        assert_eq!(
            parse(r#"{"error": "boom", "answer_piece": "hi"}"#),
            Some(Packet::AnswerToken("hi".to_string()))
        );
        assert_eq!(
            parse(r#"{"answerable": false, "query_event_id": 9}"#),
            Some(Packet::QueryIdentifier(9))
        );
    }

    #[test]
    fn unrecognized_shape_is_not_an_error() {
        assert_eq!(parse(r#"{"unrelated_field": 123}"#), None);
        assert_eq!(parse("{}"), None);
    }

    #[test]
    fn null_payload_on_non_sentinel_field_is_dropped() {
        assert_eq!(parse(r#"{"quotes": null}"#), None);
        assert_eq!(parse(r#"{"query_event_id": null}"#), None);
        assert_eq!(parse(r#"{"error": null}"#), None);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            parse_packet("{\"answer_piece\": "),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn non_object_record_is_a_parse_error() {
        assert!(matches!(parse_packet("5"), Err(ParseError::NotAnObject)));
        assert!(matches!(
            parse_packet(r#"["answer_piece"]"#),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn wrong_payload_type_is_a_parse_error() {
        assert!(matches!(
            parse_packet(r#"{"answer_piece": 5}"#),
            Err(ParseError::Payload { field: "answer_piece", .. })
        ));
        assert!(matches!(
            parse_packet(r#"{"relevant_chunk_indices": "all"}"#),
            Err(ParseError::Payload { field: "relevant_chunk_indices", .. })
        ));
    }
}
