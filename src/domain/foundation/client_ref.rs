//! How a client is addressed across the notification pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ClientId;

/// A reference to a client, resolved once at the boundary.
///
/// Some clients are known by their account id, others only by the document
/// number written on the sample form. Downstream code matches on the variant
/// instead of guessing from the shape of a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ClientRef {
    ById(ClientId),
    ByDocument(String),
}

impl ClientRef {
    /// Storage discriminator used by the SQL adapters.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientRef::ById(_) => "id",
            ClientRef::ByDocument(_) => "document",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ClientRef::ById(id) => id.as_str(),
            ClientRef::ByDocument(doc) => doc,
        }
    }

    /// Rebuilds a reference from its stored `(kind, value)` pair.
    pub fn from_parts(kind: &str, value: &str) -> Option<Self> {
        match kind {
            "id" => ClientId::new(value).ok().map(ClientRef::ById),
            "document" if !value.is_empty() => Some(ClientRef::ByDocument(value.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}
