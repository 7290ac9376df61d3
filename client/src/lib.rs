//! Streaming client for a document question-answering service.
//!
//! # Architecture
//!
//! The crate is organized as a one-directional decode pipeline driven once
//! per session:
//!
//! - [`split`] - accumulates arbitrarily-chunked byte fragments and emits
//!   complete newline-delimited records
//! - [`wire`] - parses one record and classifies it into a [`wire::Packet`]
//!   by field presence
//! - [`fold`] - folds the ordered packet sequence into evolving session
//!   state, producing observable [`StreamUpdate`]s
//! - [`session`] - issues the outbound request and drives the
//!   read/split/classify/fold loop to completion
//!
//! Updates are delivered through a [`tokio::sync::mpsc::Sender<StreamUpdate>`]
//! channel, in fold order, while the session runs. The entry points
//! ([`stream_qa`], [`stream_query_validation`]) also return a final snapshot
//! for callers that only need the end state.
//!
//! # Error Handling
//!
//! No error crosses the session boundary as a `Result::Err`: transport and
//! decode faults end the loop, are logged, and are reported through the
//! [`Termination`] value alongside whatever partial state had accumulated.
//! Application-level errors reported by the backend arrive as ordinary
//! packets and surface as [`StreamUpdate::Error`] without stopping the fold.
//!
//! There is no retry logic here; retry policy belongs to the caller.

pub mod fold;
pub mod session;
pub mod split;
pub mod wire;

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

pub use lantern_types;
use lantern_types::{SearchType, StreamUpdate, Termination};

pub use session::{QaOutcome, ValidationOutcome, stream_qa, stream_query_validation};

/// Endpoint for streaming question answering, relative to the base URL.
pub const QA_STREAM_PATH: &str = "stream-direct-qa";
/// Endpoint for streaming query-answerability validation.
pub const VALIDATION_STREAM_PATH: &str = "stream-query-validation";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Cap on the carried partial-record buffer. A stream that never terminates
/// a record must not grow memory without bound.
const DEFAULT_MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

pub(crate) fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build tuned HTTP client: {e}. Using defaults.");
                reqwest::Client::new()
            })
    })
}

/// Read a capped amount of an error response body for diagnostics.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// What to do when a completed record fails structured parsing.
///
/// The backend stops emitting packets after a malformed record, so aborting
/// is the safe default; skipping is available for callers that prefer to
/// salvage whatever follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// End the session, returning the state accumulated so far.
    #[default]
    AbortSession,
    /// Drop the malformed record and keep decoding.
    SkipPacket,
}

/// Knobs for the decode loop, independent of any HTTP transport.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Maximum time to wait for the next fragment before giving up.
    pub idle_timeout: Duration,
    /// Maximum size of a single buffered record.
    pub max_record_bytes: usize,
    pub decode_policy: DecodePolicy,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            decode_policy: DecodePolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("base URL cannot be a base for endpoint paths")]
    CannotBeABase,
}

/// Connection settings for one backend, shared across sessions.
///
/// ```rust
/// use lantern_client::{ClientConfig, DecodePolicy};
///
/// let config = ClientConfig::new("http://localhost:8080/api")
///     .unwrap()
///     .with_decode_policy(DecodePolicy::SkipPacket);
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    options: StreamOptions,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase);
        }
        // Endpoint paths join relative to the final segment; keep it a
        // directory so "api" is not replaced by the endpoint name.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            base_url,
            options: StreamOptions::default(),
        })
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.options.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn with_max_record_bytes(mut self, max_record_bytes: usize) -> Self {
        self.options.max_record_bytes = max_record_bytes;
        self
    }

    #[must_use]
    pub fn with_decode_policy(mut self, decode_policy: DecodePolicy) -> Self {
        self.options.decode_policy = decode_policy;
        self
    }

    #[must_use]
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Retrieval filters for an outbound request. All fields are nullable;
/// `None` means "do not filter on this axis".
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    pub source_type: Option<Vec<String>>,
    pub document_set: Option<Vec<String>>,
    pub time_cutoff: Option<DateTime<Utc>>,
}

/// One outbound question, serialized as the request body of either
/// streaming endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QaRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_session_id: Option<i64>,
    pub filters: SearchFilters,
    pub search_type: SearchType,
    pub enable_auto_detect_filters: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favor_recent: Option<bool>,
    /// Real-time calls let the backend skip the slower reranking passes.
    pub real_time: bool,
    /// Pagination, in retrieval batches rather than document counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl QaRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            chat_session_id: None,
            filters: SearchFilters::default(),
            search_type: SearchType::Hybrid,
            enable_auto_detect_filters: true,
            favor_recent: None,
            real_time: true,
            offset: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, chat_session_id: i64) -> Self {
        self.chat_session_id = Some(chat_session_id);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

pub(crate) async fn send_update(
    tx: &tokio::sync::mpsc::Sender<StreamUpdate>,
    update: StreamUpdate,
) -> bool {
    tx.send(update).await.is_ok()
}

pub(crate) fn transport_fault(context: &str, detail: impl std::fmt::Display) -> Termination {
    let message = format!("{context}: {detail}");
    tracing::warn!("{message}");
    Termination::Transport(message)
}
