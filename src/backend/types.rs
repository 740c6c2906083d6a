//! Data exchanged with the knowledge-graph backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the episode body should be interpreted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeSource {
    /// Free text
    Text,
    /// JSON document
    Json,
}

impl EpisodeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeSource::Text => "text",
            EpisodeSource::Json => "json",
        }
    }
}

/// A unit of content submitted to the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub body: String,
    pub source: EpisodeSource,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    /// Identity that makes the write idempotent; writes without one are
    /// never retried
    pub dedup_key: Option<String>,
}

impl Episode {
    /// Text episode with `source_description = "user_input"`
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: content.into(),
            source: EpisodeSource::Text,
            source_description: "user_input".to_string(),
            reference_time: Utc::now(),
            dedup_key: None,
        }
    }

    /// JSON episode with `source_description = "structured_data"`
    ///
    /// Non-ASCII characters are kept as-is in the serialized body.
    pub fn json(name: impl Into<String>, data: &serde_json::Value) -> crate::error::Result<Self> {
        Ok(Self {
            name: name.into(),
            body: serde_json::to_string(data)?,
            source: EpisodeSource::Json,
            source_description: "structured_data".to_string(),
            reference_time: Utc::now(),
            dedup_key: None,
        })
    }

    pub fn with_source_description(mut self, description: impl Into<String>) -> Self {
        self.source_description = description.into();
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = reference_time;
        self
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    /// Whether replaying this write cannot duplicate data
    pub fn is_idempotent(&self) -> bool {
        self.dedup_key.is_some()
    }
}

/// Parameters of a fact search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    /// Personalises the search around a graph node
    pub center_node_id: Option<String>,
}

/// One fact returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub uuid: Option<String>,
    pub fact: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub source_node_id: Option<String>,
    pub target_node_id: Option<String>,
}

impl SearchHit {
    pub fn new(fact: impl Into<String>) -> Self {
        Self {
            uuid: None,
            fact: fact.into(),
            valid_from: None,
            valid_until: None,
            source_node_id: None,
            target_node_id: None,
        }
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }
}

/// Search results, in backend order
pub type ResultSet = Vec<SearchHit>;

/// One entity node returned by a node search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHit {
    pub uuid: String,
    pub name: String,
    pub summary: Option<String>,
}

/// Render hits as a numbered list, one fact per line
pub fn format_search_results(results: &[SearchHit]) -> String {
    if results.is_empty() {
        return "No search results found.".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut line = format!("{}. {}", i + 1, hit.fact);
            if let Some(from) = hit.valid_from {
                line.push_str(&format!(" (valid from: {})", from.format("%Y-%m-%d %H:%M:%S")));
            }
            if let Some(until) = hit.valid_until {
                line.push_str(&format!(" (valid until: {})", until.format("%Y-%m-%d %H:%M:%S")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
