//! Type-safe identifier wrappers.
//!
//! Simulation and sweep identifiers are opaque strings: callers may supply
//! their own (the sweep engine derives point ids from the sweep id and the
//! swept values), and freshly generated ones are UUID v4 strings.
//!
//! [`NodeId`] is the key of a node in the graph topology. Upstream graph
//! exports use either string or numeric node ids, so deserialization accepts
//! both and normalizes to the string form.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh identifier (UUID v4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id! {
    /// Unique identifier of a single simulation run.
    SimulationId
}

define_id! {
    /// Unique identifier of a parameter sweep.
    SweepId
}

/// Identifier of a node in the graph topology (and of the agent placed on it).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodeId(pub String);

impl NodeId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Wire forms accepted for a node id.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = match RawNodeId::deserialize(deserializer)? {
            RawNodeId::Text(s) => s,
            RawNodeId::Signed(n) => n.to_string(),
            RawNodeId::Unsigned(n) => n.to_string(),
            RawNodeId::Float(n) => n.to_string(),
        };
        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = SimulationId::generate();
        let b = SimulationId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = SweepId::new("sweep-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sweep-1\"");
        let back: SweepId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn node_id_accepts_numbers() {
        let ids: Vec<NodeId> = serde_json::from_str(r#"["a", 7, -3]"#).unwrap();
        assert_eq!(ids, vec![NodeId::from("a"), NodeId::from("7"), NodeId::from("-3")]);
    }
}
