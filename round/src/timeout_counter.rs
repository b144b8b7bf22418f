//! Per-round timeout escalation by peer vote.
//!
//! When a round times out, every miner bumps its timeout count and tells
//! its peers.  Peers are ordered by a permutation derived from the previous
//! round's seed; a miner only adopts a higher count voted by a peer ranked
//! ahead of itself, and only the first such vote.  Otherwise it increments by
//! one, so the count always moves while a single low-ranked peer cannot push
//! everybody to an arbitrary value.

use {
    crate::permutation::permutation,
    log::debug,
    parking_lot::Mutex,
    std::collections::HashMap,
    zcn_node::{NodeId, NodePool},
};

#[derive(Debug, Default)]
struct CounterState {
    /// Previous round's seed the ranking was computed from.
    prrs: i64,
    /// Miners in vote-priority order, highest first.
    perm: Vec<NodeId>,
    count: u32,
    votes: HashMap<NodeId, u32>,
}

/// Timeout count of one round plus the votes received for it.
#[derive(Debug)]
pub struct TimeoutCounter {
    self_id: NodeId,
    /// Zero means uncapped.
    cap: u32,
    state: Mutex<CounterState>,
}

impl TimeoutCounter {
    pub fn new(self_id: NodeId, cap: u32) -> Self {
        Self {
            self_id,
            cap,
            state: Mutex::new(CounterState::default()),
        }
    }

    /// Record `voter`'s proposed count, replacing any earlier vote of theirs.
    pub fn add_timeout_vote(&self, count: u32, voter: NodeId) {
        self.state.lock().votes.insert(voter, count);
    }

    /// Escalate the timeout count after a local timeout.
    ///
    /// With votes pending, miners are scanned in the rank order derived from
    /// `prrs` and the first vote above the current count is adopted.  The
    /// scan stops at self, so only miners ranked ahead of self can raise the
    /// count.  The top-ranked miner therefore never adopts a peer vote and
    /// always increments by one.  Pending votes are cleared either way.
    ///
    /// Does nothing without a previous round seed.
    pub fn increment_timeout_count(&self, prrs: i64, miners: &NodePool) {
        if prrs == 0 {
            return;
        }

        let mut state = self.state.lock();
        if state.votes.is_empty() {
            state.count = state.count.saturating_add(1);
            state.count = self.capped(state.count);
            return;
        }

        if state.perm.is_empty() || state.prrs != prrs {
            state.perm = rank_miners(prrs, miners);
            state.prrs = prrs;
        }

        let from = state.count;
        let mut adopted = None;
        for miner in state.perm.iter() {
            if *miner == self.self_id {
                break;
            }
            if let Some(&vote) = state.votes.get(miner) {
                if vote > from {
                    adopted = Some((miner.clone(), vote));
                    break;
                }
            }
        }
        state.votes.clear();

        match adopted {
            Some((miner, vote)) => {
                debug!("adopting timeout count {vote} voted by {miner} (was {from})");
                state.count = vote;
            }
            None => state.count = from.saturating_add(1),
        }
        state.count = self.capped(state.count);
    }

    /// Adopt `count` if it is higher than the current count.
    pub fn set_timeout_count(&self, count: u32) -> bool {
        let count = self.capped(count);
        let mut state = self.state.lock();
        if count <= state.count {
            return false;
        }
        state.count = count;
        true
    }

    pub fn get_timeout_count(&self) -> u32 {
        self.state.lock().count
    }

    pub fn reset_votes(&self) {
        self.state.lock().votes.clear();
    }

    pub fn vote_count(&self) -> usize {
        self.state.lock().votes.len()
    }

    fn capped(&self, count: u32) -> u32 {
        if self.cap > 0 && count > self.cap {
            self.cap
        } else {
            count
        }
    }
}

/// Miner ids in vote-priority order for the given previous round seed.
pub fn rank_miners(prrs: i64, miners: &NodePool) -> Vec<NodeId> {
    let mut ids = miners.ids();
    ids.sort();
    permutation(prrs, ids.len())
        .into_iter()
        .map(|i| ids[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::net::SocketAddr,
        zcn_node::{NodeInfo, NodeType},
    };

    fn pool(ids: &[&str]) -> NodePool {
        let infos = ids
            .iter()
            .map(|id| NodeInfo {
                id: NodeId::from(*id),
                node_type: NodeType::Miner,
                n2n_addr: SocketAddr::from(([127, 0, 0, 1], 7171)),
                set_index: 0,
                description: String::new(),
            })
            .collect();
        NodePool::from_infos(NodeType::Miner, infos)
    }

    const PRRS: i64 = 1234;

    #[test]
    fn test_zero_prrs_does_nothing() {
        let tc = TimeoutCounter::new(NodeId::from("a"), 0);
        tc.increment_timeout_count(0, &pool(&["a", "b"]));
        assert_eq!(tc.get_timeout_count(), 0);
    }

    #[test]
    fn test_no_votes_increments_by_one() {
        let tc = TimeoutCounter::new(NodeId::from("a"), 0);
        let miners = pool(&["a", "b", "c"]);
        for expected in 1..=5 {
            tc.increment_timeout_count(PRRS, &miners);
            assert_eq!(tc.get_timeout_count(), expected);
        }
    }

    #[test]
    fn test_cap_applies() {
        let tc = TimeoutCounter::new(NodeId::from("a"), 2);
        let miners = pool(&["a", "b"]);
        for _ in 0..5 {
            tc.increment_timeout_count(PRRS, &miners);
        }
        assert_eq!(tc.get_timeout_count(), 2);
        assert!(!tc.set_timeout_count(10));
        assert_eq!(tc.get_timeout_count(), 2);
    }

    #[test]
    fn test_low_priority_vote_does_not_run_away() {
        let miners = pool(&["a", "b", "c"]);
        let order = rank_miners(PRRS, &miners);
        // Self ranked first, only the last-ranked peer votes high.
        let tc = TimeoutCounter::new(order[0].clone(), 0);
        tc.add_timeout_vote(100, order[2].clone());
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 1);
        assert_eq!(tc.vote_count(), 0);
    }

    #[test]
    fn test_first_higher_priority_vote_wins() {
        let miners = pool(&["a", "b", "c", "d"]);
        let order = rank_miners(PRRS, &miners);
        let tc = TimeoutCounter::new(order[3].clone(), 0);
        tc.add_timeout_vote(4, order[0].clone());
        tc.add_timeout_vote(9, order[1].clone());
        tc.add_timeout_vote(0, order[2].clone());
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 4);
    }

    #[test]
    fn test_top_ranked_miner_never_adopts_votes() {
        let miners = pool(&["a", "b", "c", "d"]);
        let order = rank_miners(PRRS, &miners);
        let tc = TimeoutCounter::new(order[0].clone(), 0);
        for (count, voter) in [(5, &order[1]), (6, &order[2]), (7, &order[3])] {
            tc.add_timeout_vote(count, voter.clone());
        }
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 1);

        // Ranked second, only the leader's vote counts.
        let tc = TimeoutCounter::new(order[1].clone(), 0);
        tc.add_timeout_vote(9, order[2].clone());
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 1);
        tc.add_timeout_vote(9, order[2].clone());
        tc.add_timeout_vote(4, order[0].clone());
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 4);
    }

    #[test]
    fn test_vote_not_above_count_falls_back_to_increment() {
        let miners = pool(&["a", "b", "c"]);
        let order = rank_miners(PRRS, &miners);
        let tc = TimeoutCounter::new(order[2].clone(), 0);
        assert!(tc.set_timeout_count(3));
        tc.add_timeout_vote(2, order[0].clone());
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 4);
    }

    #[test]
    fn test_last_vote_per_voter_wins() {
        let miners = pool(&["a", "b"]);
        let order = rank_miners(PRRS, &miners);
        let tc = TimeoutCounter::new(order[1].clone(), 0);
        tc.add_timeout_vote(7, order[0].clone());
        tc.add_timeout_vote(3, order[0].clone());
        assert_eq!(tc.vote_count(), 1);
        tc.increment_timeout_count(PRRS, &miners);
        assert_eq!(tc.get_timeout_count(), 3);
    }

    #[test]
    fn test_set_timeout_count_only_increases() {
        let tc = TimeoutCounter::new(NodeId::from("a"), 0);
        assert!(tc.set_timeout_count(2));
        assert!(!tc.set_timeout_count(2));
        assert!(!tc.set_timeout_count(1));
        assert_eq!(tc.get_timeout_count(), 2);
    }

    #[test]
    fn test_reset_votes() {
        let tc = TimeoutCounter::new(NodeId::from("a"), 0);
        tc.add_timeout_vote(1, NodeId::from("b"));
        tc.reset_votes();
        assert_eq!(tc.vote_count(), 0);
    }

    #[test]
    fn test_rank_miners_ignores_pool_order() {
        let a = rank_miners(PRRS, &pool(&["a", "b", "c"]));
        let b = rank_miners(PRRS, &pool(&["c", "a", "b"]));
        assert_eq!(a, b);
    }
}
