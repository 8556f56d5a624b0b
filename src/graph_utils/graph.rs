use serde::{Deserialize, Serialize};

// Node identities are stable keys assigned by the data-supplying collaborator.
pub type NodeId = String;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub group: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: NodeId,
    pub target: NodeId,
}

/// One cluster as delivered by the data-supplying collaborator: an id, a
/// display name, and the cluster's own node and link collections. The
/// records are not validated here; a link naming an unknown node is a
/// collaborator error and is skipped at layout construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

impl ClusterRecord {
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.id == id)
    }
}
