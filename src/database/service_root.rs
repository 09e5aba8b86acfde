//! Service root: the endpoint map a server advertises at its root URL

use serde::{Deserialize, Serialize};

use crate::transport::join_url;

/// Endpoints advertised by the server.
///
/// Only `transaction`, `batch` and `node` are used by the core; the rest is
/// kept for callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRoot {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub reference_node: Option<String>,
    #[serde(default)]
    pub node_index: String,
    #[serde(default)]
    pub relationship_index: String,
    #[serde(default)]
    pub relationship_types: String,
    #[serde(default)]
    pub extensions_info: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub cypher: String,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub neo4j_version: String,
}

impl ServiceRoot {
    /// Conventional endpoint layout under `base`, for servers that are not
    /// asked for their service root
    pub fn at(base: &str) -> Self {
        Self {
            node: join_url(&[base, "node"]),
            reference_node: None,
            node_index: join_url(&[base, "index/node"]),
            relationship_index: join_url(&[base, "index/relationship"]),
            relationship_types: join_url(&[base, "relationship/types"]),
            extensions_info: join_url(&[base, "ext"]),
            batch: join_url(&[base, "batch"]),
            cypher: join_url(&[base, "cypher"]),
            transaction: join_url(&[base, "transaction"]),
            neo4j_version: String::new(),
        }
    }

    /// Fills endpoints the server did not advertise with their
    /// conventional location under `base`
    pub(crate) fn fill_missing(&mut self, base: &str) {
        let defaults = Self::at(base);
        for (field, default) in [
            (&mut self.node, defaults.node),
            (&mut self.batch, defaults.batch),
            (&mut self.cypher, defaults.cypher),
            (&mut self.transaction, defaults.transaction),
        ] {
            if field.is_empty() {
                *field = default;
            }
        }
    }

    /// Autocommit endpoint: begin and commit in one request
    pub fn autocommit_url(&self) -> String {
        join_url(&[&self.transaction, "commit"])
    }
}
