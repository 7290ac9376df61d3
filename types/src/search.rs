//! Retrieval-side domain types: documents, quotes, routing enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retrieval mode used (or recommended) by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Keyword,
    Semantic,
    Hybrid,
}

/// Which flow the backend predicts a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFlow {
    #[serde(rename = "search")]
    Search,
    #[serde(rename = "question-answer")]
    QuestionAnswer,
}

/// One scored candidate document from retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDoc {
    pub document_id: String,
    pub semantic_identifier: String,
    pub link: Option<String>,
    pub blurb: String,
    pub source_type: String,
    #[serde(default)]
    pub boost: i32,
    /// Hidden documents only surface in admin searches.
    #[serde(default)]
    pub hidden: bool,
    pub score: Option<f64>,
    /// Matched sections, with `<hi>` markers around highlighted words.
    #[serde(default)]
    pub match_highlights: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A quote from a source document supporting the generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub document_id: String,
    pub link: Option<String>,
    pub source_type: String,
    pub semantic_identifier: String,
    pub blurb: String,
}
