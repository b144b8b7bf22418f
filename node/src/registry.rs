//! Registry of every node this process knows about.
//!
//! The registry is read on every inbound message (sender validation) and
//! written only on membership changes.  Readers take a cheap snapshot
//! (`Arc` clone of the whole map) and iterate without holding the lock;
//! writers build a new map and swap it in.

use {
    crate::node::{Node, NodeId, NodeType},
    log::{debug, info},
    parking_lot::RwLock,
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
    },
};

/// Snapshot of the registry contents.
pub type NodeMap = HashMap<NodeId, Arc<Node>>;

/// Copy-on-write registry of known nodes.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<Arc<NodeMap>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.  The returned map never changes.
    pub fn snapshot(&self) -> Arc<NodeMap> {
        self.nodes.read().clone()
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.read().get(id).cloned()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Register a node.  A node re-registering under the same id keeps the
    /// livemetrics of its previous entry.
    pub fn register(&self, node: Arc<Node>) {
        let mut guard = self.nodes.write();
        let mut next = NodeMap::clone(&guard);
        if let Some(old) = next.get(node.id()) {
            debug!("re-registering node {}", node.id());
            node.inherit_stats(old);
        } else {
            info!("registering {} {}", node.node_type(), node.id());
        }
        next.insert(node.id().clone(), node);
        *guard = Arc::new(next);
    }

    /// Register several nodes under one swap.
    pub fn register_all(&self, nodes: impl IntoIterator<Item = Arc<Node>>) {
        let mut guard = self.nodes.write();
        let mut next = NodeMap::clone(&guard);
        for node in nodes {
            if let Some(old) = next.get(node.id()) {
                node.inherit_stats(old);
            }
            next.insert(node.id().clone(), node);
        }
        *guard = Arc::new(next);
    }

    pub fn deregister(&self, id: &NodeId) -> Option<Arc<Node>> {
        let mut guard = self.nodes.write();
        if !guard.contains_key(id) {
            return None;
        }
        let mut next = NodeMap::clone(&guard);
        let removed = next.remove(id);
        *guard = Arc::new(next);
        info!("deregistered node {id}");
        removed
    }

    /// Drop every node not in `keep`, replacing the whole map at once.
    pub fn retain_only(&self, keep: &HashSet<NodeId>) {
        let mut guard = self.nodes.write();
        let next: NodeMap = guard
            .iter()
            .filter(|(id, _)| keep.contains(*id))
            .map(|(id, node)| (id.clone(), node.clone()))
            .collect();
        info!("node registry pruned: {} → {} nodes", guard.len(), next.len());
        *guard = Arc::new(next);
    }

    /// Ids of all registered miners, sorted.
    pub fn miner_ids(&self) -> Vec<NodeId> {
        let snapshot = self.snapshot();
        let mut ids: Vec<NodeId> = snapshot
            .values()
            .filter(|n| n.node_type() == NodeType::Miner)
            .map(|n| n.id().clone())
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::node::tests::test_info};

    fn node(id: &str, node_type: NodeType) -> Arc<Node> {
        Arc::new(Node::new(test_info(id, node_type, 0)))
    }

    #[test]
    fn test_register_and_get() {
        let registry = NodeRegistry::new();
        registry.register(node("m1", NodeType::Miner));
        registry.register(node("s1", NodeType::Sharder));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&NodeId::from("m1")));
        assert_eq!(registry.miner_ids(), vec![NodeId::from("m1")]);
    }

    #[test]
    fn test_snapshot_is_stable_across_writes() {
        let registry = NodeRegistry::new();
        registry.register(node("m1", NodeType::Miner));
        let before = registry.snapshot();
        registry.register(node("m2", NodeType::Miner));
        registry.deregister(&NodeId::from("m1"));
        assert_eq!(before.len(), 1);
        assert!(before.contains_key(&NodeId::from("m1")));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&NodeId::from("m2")));
    }

    #[test]
    fn test_reregister_keeps_metrics() {
        let registry = NodeRegistry::new();
        let first = node("m1", NodeType::Miner);
        first.record_received();
        first.record_received();
        registry.register(first);
        registry.register(node("m1", NodeType::Miner));
        assert_eq!(registry.get(&NodeId::from("m1")).unwrap().received(), 2);
    }

    #[test]
    fn test_retain_only() {
        let registry = NodeRegistry::new();
        registry.register_all(vec![
            node("m1", NodeType::Miner),
            node("m2", NodeType::Miner),
            node("m3", NodeType::Miner),
        ]);
        let keep: HashSet<NodeId> = [NodeId::from("m2")].into_iter().collect();
        registry.retain_only(&keep);
        assert_eq!(registry.miner_ids(), vec![NodeId::from("m2")]);
        assert!(registry.deregister(&NodeId::from("m1")).is_none());
    }
}
