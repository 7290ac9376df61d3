//! Folding the ordered packet sequence into session state.
//!
//! A fold is a state-transition function applied in strict packet-arrival
//! order: each packet mutates the session state and yields the list of
//! observable updates it caused. Folds never perform IO and never run
//! concurrently with themselves for the same session, which is what lets
//! the append-only / replace-wholesale rules below stand without locking.

use lantern_types::{AnswerState, QuotePhase, StreamUpdate, ValidationState};

use crate::wire::Packet;

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '?', '!'];

/// The per-session accumulation seam driven by the decode loop.
pub trait PacketFold {
    fn apply(&mut self, packet: Packet) -> Vec<StreamUpdate>;
}

/// Fold for a question-answering session.
#[derive(Debug, Default)]
pub struct QaFold {
    pub state: AnswerState,
}

impl PacketFold for QaFold {
    fn apply(&mut self, packet: Packet) -> Vec<StreamUpdate> {
        let state = &mut self.state;
        match packet {
            Packet::AnswerToken(piece) => {
                state.answer.push_str(&piece);
                vec![StreamUpdate::Answer(state.answer.clone())]
            }

            Packet::AnswerEnd => {
                let mut updates = Vec::new();

                // Entering the quote phase is observable even before any
                // quote arrives: the empty list tells the UI the answer is
                // done streaming.
                if state.quotes == QuotePhase::NotStarted {
                    state.quotes = QuotePhase::AwaitingQuotes;
                    updates.push(StreamUpdate::Quotes(Vec::new()));
                }

                // Close the sentence if the generator stopped without
                // terminal punctuation.
                if !state.answer.is_empty()
                    && !state.answer.ends_with(TERMINAL_PUNCTUATION)
                {
                    state.answer.push('.');
                    updates.push(StreamUpdate::Answer(state.answer.clone()));
                }

                updates
            }

            Packet::DocumentBundle(bundle) => {
                let mut updates = Vec::new();
                if let Some(documents) = bundle.top_documents {
                    state.documents = Some(documents.clone());
                    updates.push(StreamUpdate::Documents(documents));
                }
                if let Some(flow) = bundle.predicted_flow {
                    state.suggested_flow = Some(flow);
                    updates.push(StreamUpdate::SuggestedFlow(flow));
                }
                if let Some(search_type) = bundle.predicted_search {
                    state.suggested_search_type = Some(search_type);
                    updates.push(StreamUpdate::SuggestedSearchType(search_type));
                }
                updates
            }

            Packet::RelevanceFilter(indices) => {
                state.selected_doc_indices = Some(indices.clone());
                vec![StreamUpdate::SelectedDocIndices(indices)]
            }

            Packet::QuoteBundle(quotes) => {
                state.quotes = QuotePhase::Received(quotes.clone());
                vec![StreamUpdate::Quotes(quotes)]
            }

            Packet::QueryIdentifier(id) => {
                state.query_event_id = Some(id);
                vec![StreamUpdate::QueryEventId(id)]
            }

            Packet::ErrorSignal(message) => {
                state.error = Some(message.clone());
                vec![StreamUpdate::Error(message)]
            }

            Packet::ValidationVerdict(_) => {
                tracing::debug!("ignoring validation verdict in QA session");
                Vec::new()
            }
        }
    }
}

/// Fold for a query-answerability validation session.
#[derive(Debug, Default)]
pub struct ValidationFold {
    pub state: ValidationState,
}

impl PacketFold for ValidationFold {
    fn apply(&mut self, packet: Packet) -> Vec<StreamUpdate> {
        let state = &mut self.state;
        match packet {
            Packet::AnswerToken(piece) => {
                state.reasoning.push_str(&piece);
                vec![StreamUpdate::Reasoning(state.reasoning.clone())]
            }

            Packet::ValidationVerdict(answerable) => {
                state.answerable = Some(answerable);
                vec![StreamUpdate::Answerable(answerable)]
            }

            Packet::ErrorSignal(message) => {
                state.error = Some(message.clone());
                vec![StreamUpdate::Error(message)]
            }

            Packet::AnswerEnd => Vec::new(),

            other => {
                tracing::debug!(?other, "ignoring QA packet in validation session");
                Vec::new()
            }
        }
    }
}
