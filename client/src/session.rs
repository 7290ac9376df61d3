//! Session orchestration: request issuance and the decode loop.
//!
//! Each session is a single-threaded cooperative task whose only suspension
//! point is the read from the byte stream. Packets are folded strictly in
//! arrival order; multiple sessions share nothing. Cancellation is
//! caller-driven: dropping the update receiver stops the session at the
//! next update, and dropping the returned future aborts the underlying
//! read.

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use lantern_types::{StreamUpdate, Termination};
use tokio::sync::mpsc;

use crate::fold::{PacketFold, QaFold, ValidationFold};
use crate::split::RecordSplitter;
use crate::wire::parse_packet;
use crate::{
    ClientConfig, DecodePolicy, QA_STREAM_PATH, QaRequest, StreamOptions, VALIDATION_STREAM_PATH,
    http_client, read_capped_error_body, send_update, transport_fault,
};

/// Result of a question-answering session: the final state snapshot plus
/// how the stream ended. Sessions never raise; a failed session is a
/// partial snapshot with a non-clean [`Termination`].
#[derive(Debug, Clone, PartialEq)]
pub struct QaOutcome {
    pub snapshot: lantern_types::AnswerSnapshot,
    pub termination: Termination,
}

/// Result of a query-validation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub snapshot: lantern_types::ValidationSnapshot,
    pub termination: Termination,
}

/// Run one streaming question-answering session.
///
/// Updates are delivered over `tx` in fold order while the session runs;
/// the returned outcome carries the final answer, quotes, and documents for
/// callers that only need the end state.
pub async fn stream_qa(
    config: &ClientConfig,
    request: &QaRequest,
    tx: mpsc::Sender<StreamUpdate>,
) -> QaOutcome {
    let mut fold = QaFold::default();
    let termination = run_session(config, QA_STREAM_PATH, request, &mut fold, &tx).await;
    QaOutcome {
        snapshot: fold.state.snapshot(),
        termination,
    }
}

/// Run one streaming query-answerability validation session.
pub async fn stream_query_validation(
    config: &ClientConfig,
    request: &QaRequest,
    tx: mpsc::Sender<StreamUpdate>,
) -> ValidationOutcome {
    let mut fold = ValidationFold::default();
    let termination = run_session(config, VALIDATION_STREAM_PATH, request, &mut fold, &tx).await;
    ValidationOutcome {
        snapshot: fold.state.snapshot(),
        termination,
    }
}

async fn run_session<F: PacketFold>(
    config: &ClientConfig,
    path: &str,
    request: &QaRequest,
    fold: &mut F,
    tx: &mpsc::Sender<StreamUpdate>,
) -> Termination {
    let url = match config.endpoint(path) {
        Ok(url) => url,
        Err(e) => return transport_fault("invalid endpoint URL", e),
    };

    tracing::debug!(%url, "starting streaming session");

    let response = match http_client().post(url).json(request).send().await {
        Ok(response) => response,
        Err(e) => return transport_fault("request failed", e),
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = read_capped_error_body(response).await;
        let message = format!("API error {status}: {body}");
        tracing::warn!("{message}");
        let _ = send_update(tx, StreamUpdate::Error(message.clone())).await;
        return Termination::Transport(message);
    }

    fold_byte_stream(response.bytes_stream(), fold, tx, config.options()).await
}

/// Drive the read/split/classify/fold loop over any byte stream.
///
/// Generic over the fragment source so the decode pipeline can be exercised
/// under arbitrary re-chunkings of the same logical bytes.
pub async fn fold_byte_stream<S, E, F>(
    mut stream: S,
    fold: &mut F,
    tx: &mpsc::Sender<StreamUpdate>,
    options: &StreamOptions,
) -> Termination
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
    F: PacketFold,
{
    let mut splitter = RecordSplitter::new(options.max_record_bytes);

    loop {
        let Ok(next) = tokio::time::timeout(options.idle_timeout, stream.next()).await else {
            return transport_fault("stream idle timeout", options.idle_timeout.as_secs());
        };

        let Some(fragment) = next else { break };
        let fragment = match fragment {
            Ok(fragment) => fragment,
            Err(e) => return transport_fault("stream read failed", e),
        };

        let records = match splitter.push(&fragment) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(%e, "decode fault while splitting stream");
                return Termination::Decode(e.to_string());
            }
        };

        // Defensive stop: a read that produced nothing and left nothing
        // buffered means the source has degenerated into silence.
        if records.is_empty() && splitter.is_empty() {
            tracing::debug!("empty read with no buffered partial; stopping");
            return Termination::Complete;
        }

        for record in records {
            let packet = match parse_packet(&record) {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    tracing::warn!(
                        record_bytes = record.len(),
                        "dropping packet with unrecognized shape"
                    );
                    continue;
                }
                Err(e) => match options.decode_policy {
                    DecodePolicy::AbortSession => {
                        tracing::warn!(%e, "malformed record; aborting session");
                        return Termination::Decode(e.to_string());
                    }
                    DecodePolicy::SkipPacket => {
                        tracing::warn!(%e, "malformed record; skipping");
                        continue;
                    }
                },
            };

            for update in fold.apply(packet) {
                if !send_update(tx, update).await {
                    tracing::debug!("update receiver dropped; cancelling session");
                    return Termination::Cancelled;
                }
            }
        }
    }

    match splitter.finish() {
        Some(tail) => {
            tracing::warn!(
                tail_bytes = tail.len(),
                "stream ended mid-record; dropping unterminated tail"
            );
            Termination::TruncatedTail
        }
        None => Termination::Complete,
    }
}
