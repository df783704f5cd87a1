//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the closed set of record classifications),
//! [`CollectionKind`] (which of the two collections a record lives in),
//! [`MemoryPayload`] (the stored non-vector fields), and [`SearchHit`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved scope value routing a record to the global collection.
pub const GLOBAL_SCOPE: &str = "global";

/// Collection holding every record with `scope == "global"`.
pub const GLOBAL_COLLECTION: &str = "cairn_global";

/// Collection holding every other record, partitioned by the `scope` payload field.
pub const WORKSPACE_COLLECTION: &str = "cairn_workspace";

/// Payload fields carrying a keyword index in both collections.
pub const INDEXED_FIELDS: [&str; 3] = ["scope", "agent", "type"];

/// Classification of a memory record. Used as an optional search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Decision,
    Context,
    Api,
    Error,
    Doc,
    Note,
    Memory,
    Person,
    Event,
}

impl MemoryType {
    pub const ALL: [MemoryType; 9] = [
        Self::Decision,
        Self::Context,
        Self::Api,
        Self::Error,
        Self::Doc,
        Self::Note,
        Self::Memory,
        Self::Person,
        Self::Event,
    ];

    /// Payload-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Context => "context",
            Self::Api => "api",
            Self::Error => "error",
            Self::Doc => "doc",
            Self::Note => "note",
            Self::Memory => "memory",
            Self::Person => "person",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown memory type: {s} (expected one of: {})", valid.join(", "))
            })
    }
}

/// Which of the two collections a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Global,
    #[default]
    Workspace,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [Self::Global, Self::Workspace];

    /// A record's scope fixes its collection for its whole lifetime.
    pub fn for_scope(scope: &str) -> Self {
        if scope == GLOBAL_SCOPE {
            Self::Global
        } else {
            Self::Workspace
        }
    }

    /// Name of the backing collection in the vector store.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::Global => GLOBAL_COLLECTION,
            Self::Workspace => WORKSPACE_COLLECTION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "workspace" => Ok(Self::Workspace),
            _ => Err(format!("unknown collection: {s} (expected 'global' or 'workspace')")),
        }
    }
}

/// Input to a store operation.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub text: String,
    pub scope: String,
    pub agent: String,
    pub memory_type: MemoryType,
    pub tags: Vec<String>,
}

/// Non-vector fields stored with each point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPayload {
    /// Original content, stored verbatim.
    pub text: String,
    pub scope: String,
    pub agent: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// RFC 3339, fixed at first write.
    pub created_at: String,
    /// RFC 3339, present only once the record has been updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl MemoryPayload {
    pub fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // a struct of strings always serializes to an object
            _ => Map::new(),
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Map<String, Value>,
}

impl SearchHit {
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }

    pub fn scope(&self) -> Option<&str> {
        self.payload.get("scope").and_then(Value::as_str)
    }

    /// Typed view of the payload, if it has the expected shape.
    pub fn memory_payload(&self) -> Option<MemoryPayload> {
        serde_json::from_value(Value::Object(self.payload.clone())).ok()
    }
}
