//! Ordered pools of nodes of one type.
//!
//! The miner pool of the active magic block decides rank computation: a
//! node's `set_index` indexes the round's rank permutation, and the pool
//! size is the permutation length.

use {
    crate::{
        error::{NodeError, Result},
        node::{Node, NodeId, NodeInfo, NodeType},
    },
    std::{collections::HashMap, sync::Arc},
};

/// An immutable, ordered set of nodes of a single type.
///
/// Pools are replaced wholesale when membership changes, so a pool handed
/// out as `Arc<NodePool>` never changes under the reader.
#[derive(Debug, Clone)]
pub struct NodePool {
    node_type: NodeType,
    /// Nodes sorted by `set_index`.
    nodes: Vec<Arc<Node>>,
    index: HashMap<NodeId, usize>,
}

impl NodePool {
    /// Build a pool from existing nodes, ordered by their `set_index`.
    /// Nodes of other types are ignored.
    pub fn new(node_type: NodeType, nodes: impl IntoIterator<Item = Arc<Node>>) -> Self {
        let mut nodes: Vec<Arc<Node>> = nodes
            .into_iter()
            .filter(|n| n.node_type() == node_type)
            .collect();
        nodes.sort_by(|a, b| {
            a.set_index()
                .cmp(&b.set_index())
                .then_with(|| a.id().cmp(b.id()))
        });
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().clone(), i))
            .collect();
        Self {
            node_type,
            nodes,
            index,
        }
    }

    /// Build a pool from raw infos, assigning `set_index` by position.
    pub fn from_infos(node_type: NodeType, infos: Vec<NodeInfo>) -> Self {
        let nodes = infos.into_iter().enumerate().map(|(i, mut info)| {
            info.set_index = i;
            Arc::new(Node::new(info))
        });
        Self::new(node_type, nodes)
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<Node>> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Like [`NodePool::get`] but an unknown id is an error.
    pub fn require(&self, id: &NodeId) -> Result<&Arc<Node>> {
        self.get(id).ok_or_else(|| NodeError::UnknownNode(id.clone()))
    }

    /// A copy of the node list, safe to sort or filter by the caller.
    pub fn copy_nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id().clone()).collect()
    }
}
