//! Node identity and per-node livemetrics.
//!
//! A [`Node`] is shared (`Arc<Node>`) between the registry, the miner pool
//! and every task that talks to the peer.  Identity fields are immutable;
//! counters and timers live behind the node's own lock so that updating
//! them never contends with the registry lock.

use {
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fmt,
        net::SocketAddr,
        sync::atomic::{AtomicU64, Ordering},
        time::{Duration, Instant},
    },
};

/// Identity of a node on the network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Miner,
    Sharder,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Miner => write!(f, "Miner"),
            NodeType::Sharder => write!(f, "Sharder"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Active,
    Inactive,
}

/// Static identity and network address of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Address the node accepts N2N frames on.
    pub n2n_addr: SocketAddr,
    /// Position of the node within its pool; indexes the round's rank
    /// permutation.
    pub set_index: usize,
    pub description: String,
}

// ── Protocol statistics ─────────────────────────────────────────────────────

/// Consensus counters kept for a miner peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinerStats {
    pub vrf_shares: u64,
    pub verification_requests: u64,
    pub verification_tickets: u64,
    pub notarized_blocks: u64,
    pub finalized_blocks: u64,
}

/// Counters kept for a sharder peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharderStats {
    pub lfb_tickets: u64,
    pub latest_ticket_round: i64,
}

/// Role-specific statistics attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolStats {
    Miner(MinerStats),
    Sharder(SharderStats),
}

// ── Livemetrics ─────────────────────────────────────────────────────────────

/// Running mean of a series of observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanTracker {
    count: u64,
    total: f64,
}

impl MeanTracker {
    pub fn observe(&mut self, value: f64) {
        self.count = self.count.saturating_add(1);
        self.total += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Livemetrics {
    sent: u64,
    send_errors: u64,
    received: u64,
    error_count: u64,
    last_active: Option<Instant>,
    status: NodeStatus,
    /// Send duration per URI, in milliseconds.
    timers_by_uri: HashMap<String, MeanTracker>,
    /// Payload size per URI, in bytes.
    sizes_by_uri: HashMap<String, MeanTracker>,
    protocol_stats: Option<ProtocolStats>,
}

/// A known peer together with its livemetrics.
#[derive(Debug)]
pub struct Node {
    info: NodeInfo,
    metrics: RwLock<Livemetrics>,
    /// f64 bits, milliseconds.
    large_message_send_time: AtomicU64,
    /// f64 bits, milliseconds.
    small_message_send_time: AtomicU64,
}

impl Node {
    pub fn new(info: NodeInfo) -> Self {
        Self {
            info,
            metrics: RwLock::new(Livemetrics::default()),
            large_message_send_time: AtomicU64::new(0f64.to_bits()),
            small_message_send_time: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.info.id
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn node_type(&self) -> NodeType {
        self.info.node_type
    }

    pub fn n2n_addr(&self) -> SocketAddr {
        self.info.n2n_addr
    }

    pub fn set_index(&self) -> usize {
        self.info.set_index
    }

    pub fn is_miner(&self) -> bool {
        self.info.node_type == NodeType::Miner
    }

    // ── Counters ────────────────────────────────────────────────────────

    /// Record a completed send of `size` bytes to `uri` that took `elapsed`.
    pub fn record_sent(&self, uri: &str, elapsed: Duration, size: usize) {
        let mut m = self.metrics.write();
        m.sent = m.sent.saturating_add(1);
        m.timers_by_uri
            .entry(uri.to_string())
            .or_default()
            .observe(elapsed.as_secs_f64() * 1_000.0);
        m.sizes_by_uri
            .entry(uri.to_string())
            .or_default()
            .observe(size as f64);
    }

    pub fn add_send_errors(&self, num: u64) {
        let mut m = self.metrics.write();
        m.send_errors = m.send_errors.saturating_add(num);
    }

    /// Record that we received a message from this node.
    pub fn record_received(&self) {
        let mut m = self.metrics.write();
        m.received = m.received.saturating_add(1);
        m.last_active = Some(Instant::now());
    }

    pub fn add_error_count(&self, delta: u64) {
        let mut m = self.metrics.write();
        m.error_count = m.error_count.saturating_add(delta);
    }

    pub fn set_error_count(&self, count: u64) {
        self.metrics.write().error_count = count;
    }

    pub fn sent(&self) -> u64 {
        self.metrics.read().sent
    }

    pub fn send_errors(&self) -> u64 {
        self.metrics.read().send_errors
    }

    pub fn received(&self) -> u64 {
        self.metrics.read().received
    }

    pub fn error_count(&self) -> u64 {
        self.metrics.read().error_count
    }

    pub fn last_active(&self) -> Option<Instant> {
        self.metrics.read().last_active
    }

    pub fn status(&self) -> NodeStatus {
        self.metrics.read().status
    }

    pub fn set_status(&self, status: NodeStatus) {
        self.metrics.write().status = status;
    }

    pub fn is_active(&self) -> bool {
        self.status() == NodeStatus::Active
    }

    /// Mean send time for `uri` in milliseconds, 0 if never sent.
    pub fn send_time(&self, uri: &str) -> f64 {
        self.metrics
            .read()
            .timers_by_uri
            .get(uri)
            .map(MeanTracker::mean)
            .unwrap_or(0.0)
    }

    // ── Send-time estimates ─────────────────────────────────────────────

    /// Recompute the small/large message send-time estimates.
    ///
    /// The small estimate is the fastest URI whose mean payload is below
    /// `large_message_threshold`; the large estimate is the URI with the most
    /// large payloads.  When only one side has samples, it stands in for the
    /// other.
    pub fn update_message_timings(&self, large_message_threshold: usize) {
        let m = self.metrics.read();
        let mut min_small = f64::MAX;
        let mut max_large = 0.0f64;
        let mut max_large_count = 0u64;
        for (uri, timer) in m.timers_by_uri.iter() {
            if timer.count() == 0 {
                continue;
            }
            let Some(sizer) = m.sizes_by_uri.get(uri) else {
                continue;
            };
            if (sizer.mean() as usize) < large_message_threshold {
                min_small = min_small.min(timer.mean());
            } else if sizer.count() > max_large_count {
                max_large = timer.mean();
                max_large_count = sizer.count();
            }
        }
        drop(m);

        if min_small > max_large {
            if min_small != f64::MAX {
                max_large = min_small;
            } else {
                min_small = max_large;
            }
        }
        self.large_message_send_time
            .store(max_large.to_bits(), Ordering::Relaxed);
        self.small_message_send_time
            .store(min_small.to_bits(), Ordering::Relaxed);
    }

    /// Estimated large message send time in milliseconds.
    pub fn large_message_send_time(&self) -> f64 {
        f64::from_bits(self.large_message_send_time.load(Ordering::Relaxed))
    }

    /// Estimated small message send time in milliseconds.
    pub fn small_message_send_time(&self) -> f64 {
        f64::from_bits(self.small_message_send_time.load(Ordering::Relaxed))
    }

    // ── Protocol stats ──────────────────────────────────────────────────

    pub fn protocol_stats(&self) -> Option<ProtocolStats> {
        self.metrics.read().protocol_stats.clone()
    }

    pub fn set_protocol_stats(&self, stats: ProtocolStats) {
        self.metrics.write().protocol_stats = Some(stats);
    }

    /// Update miner counters, creating them on first use.  Returns false if
    /// the node already carries sharder stats.
    pub fn update_miner_stats(&self, f: impl FnOnce(&mut MinerStats)) -> bool {
        let mut m = self.metrics.write();
        match m
            .protocol_stats
            .get_or_insert_with(|| ProtocolStats::Miner(MinerStats::default()))
        {
            ProtocolStats::Miner(stats) => {
                f(stats);
                true
            }
            ProtocolStats::Sharder(_) => false,
        }
    }

    /// Update sharder counters, creating them on first use.  Returns false
    /// if the node already carries miner stats.
    pub fn update_sharder_stats(&self, f: impl FnOnce(&mut SharderStats)) -> bool {
        let mut m = self.metrics.write();
        match m
            .protocol_stats
            .get_or_insert_with(|| ProtocolStats::Sharder(SharderStats::default()))
        {
            ProtocolStats::Sharder(stats) => {
                f(stats);
                true
            }
            ProtocolStats::Miner(_) => false,
        }
    }

    /// Carry livemetrics and protocol stats over from a previous
    /// registration of the same node.
    pub fn inherit_stats(&self, old: &Node) {
        if std::ptr::eq(self, old) {
            return;
        }
        let snapshot = old.metrics.read().clone();
        *self.metrics.write() = snapshot;
        self.large_message_send_time
            .store(old.large_message_send_time.load(Ordering::Relaxed), Ordering::Relaxed);
        self.small_message_send_time
            .store(old.small_message_send_time.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}
