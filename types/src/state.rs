//! Per-session accumulation state.
//!
//! A state value is created empty when a session starts, is mutated by the
//! fold in strict packet-arrival order, and is discarded (or returned as the
//! final snapshot) when the stream ends. State is never shared between
//! sessions.

use crate::search::{Quote, QueryFlow, SearchDoc, SearchType};

/// Where the session is in the answer-then-quotes lifecycle.
///
/// The distinction between "no quotes yet because the answer is still
/// streaming" and "answer done, quotes pending" is load-bearing for
/// observers, so it is a real enum rather than a null-vs-empty convention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuotePhase {
    /// Answer text is still streaming; the quote phase has not begun.
    #[default]
    NotStarted,
    /// The end-of-answer sentinel arrived; quotes have not yet.
    AwaitingQuotes,
    /// A quote bundle arrived (possibly empty).
    Received(Vec<Quote>),
}

impl QuotePhase {
    /// The quotes as observers see them: `None` until the quote phase
    /// begins, then the current (possibly empty) list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Quote]> {
        match self {
            Self::NotStarted => None,
            Self::AwaitingQuotes => Some(&[]),
            Self::Received(quotes) => Some(quotes),
        }
    }
}

/// Evolving state of one question-answering session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerState {
    /// Append-only until the end-of-answer sentinel is folded.
    pub answer: String,
    pub quotes: QuotePhase,
    pub documents: Option<Vec<SearchDoc>>,
    pub selected_doc_indices: Option<Vec<usize>>,
    pub suggested_flow: Option<QueryFlow>,
    pub suggested_search_type: Option<SearchType>,
    pub query_event_id: Option<i64>,
    /// Once set the session is degraded, but folding continues for packets
    /// already in flight.
    pub error: Option<String>,
}

impl AnswerState {
    #[must_use]
    pub fn snapshot(&self) -> AnswerSnapshot {
        AnswerSnapshot {
            answer: self.answer.clone(),
            quotes: self.quotes.as_list().map(<[Quote]>::to_vec),
            documents: self.documents.clone(),
        }
    }
}

/// Final result of a QA session, for callers that only need the end state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSnapshot {
    pub answer: String,
    pub quotes: Option<Vec<Quote>>,
    pub documents: Option<Vec<SearchDoc>>,
}

/// Evolving state of one query-validation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    /// Append-only explanatory reasoning text.
    pub reasoning: String,
    pub answerable: Option<bool>,
    pub error: Option<String>,
}

impl ValidationState {
    #[must_use]
    pub fn snapshot(&self) -> ValidationSnapshot {
        ValidationSnapshot {
            reasoning: self.reasoning.clone(),
            answerable: self.answerable,
        }
    }
}

/// Final result of a validation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSnapshot {
    pub reasoning: String,
    pub answerable: Option<bool>,
}
