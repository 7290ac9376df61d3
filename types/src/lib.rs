//! Core domain types for Lantern.
//!
//! This crate holds the pure data model shared by the streaming client and
//! anything that renders its output: retrieved documents, supporting quotes,
//! routing hints, the per-session accumulation state, and the discriminated
//! update events a session emits while a response streams in.
//!
//! Nothing here performs IO or depends on an async runtime. The streaming
//! pipeline lives in `lantern-client`.

pub mod search;
pub mod state;

pub use search::{Quote, QueryFlow, SearchDoc, SearchType};
pub use state::{AnswerSnapshot, AnswerState, QuotePhase, ValidationSnapshot, ValidationState};

/// One observable field update emitted while a session streams.
///
/// Updates are delivered synchronously, in fold order, over a channel owned
/// by the caller. Text-bearing variants always carry the *entire* accumulated
/// text so far, never a delta - an observer can render any single update
/// without replaying the ones before it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// Full accumulated answer text.
    Answer(String),
    /// Current supporting quotes. An empty list is meaningful: it marks the
    /// moment answer generation finished and the quote phase began, before
    /// any quote has arrived.
    Quotes(Vec<Quote>),
    /// Candidate documents, replaced wholesale.
    Documents(Vec<SearchDoc>),
    /// Indices (into the document list) judged relevant by the filter pass.
    SelectedDocIndices(Vec<usize>),
    /// Routing hint: whether the query should have been a search or a QA flow.
    SuggestedFlow(QueryFlow),
    /// Routing hint: which retrieval mode the backend recommends.
    SuggestedSearchType(SearchType),
    /// Identifier correlating this stream to a logged query event.
    QueryEventId(i64),
    /// Application-level error reported by the backend. The session keeps
    /// folding packets already in flight after this fires.
    Error(String),
    /// Full accumulated answerability reasoning (validation sessions).
    Reasoning(String),
    /// Answerability verdict (validation sessions).
    Answerable(bool),
}

/// How a streaming session ended.
///
/// Sessions never raise: the orchestrator returns whatever state accumulated
/// together with one of these. Only [`Termination::Complete`] means the
/// stream was consumed to a clean end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Source exhausted with no partial record left behind.
    Complete,
    /// Source ended while an unterminated record was still buffered. The
    /// partial tail is reported, never silently parsed or dropped.
    TruncatedTail,
    /// The caller dropped the update receiver mid-stream.
    Cancelled,
    /// The request could not be issued or the read stream failed.
    Transport(String),
    /// A completed record could not be decoded and the session's decode
    /// policy aborts on such records.
    Decode(String),
}

impl Termination {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Complete)
    }
}
