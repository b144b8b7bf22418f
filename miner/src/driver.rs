//! Finalization worker.
//!
//! Rounds arrive on the finalized-rounds channel in the order the processor
//! finalized them.  Each one is finalized and persisted on its own task under
//! a deadline.  A round that misses the deadline is left to finish in the
//! background and the worker moves on to the next.

use {
    crate::{chain::MinerChain, error::Result},
    async_trait::async_trait,
    log::{debug, error, info, warn},
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, sync::Arc, time::Duration},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    zcn_round::Round,
};

/// Applies a finalized round downstream (state, storage, notifications).
#[async_trait]
pub trait RoundFinalizer: Send + Sync {
    async fn finalize_round(&self, round: Arc<Round>) -> Result<()>;
}

/// Persists per-round summaries.
pub trait RoundInfoStore: Send + Sync {
    fn update_round_info(&self, info: RoundInfo) -> Result<()>;
}

/// Summary of a finalized round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub number: i64,
    pub random_seed: i64,
    pub block_hash: Option<String>,
    pub timeout_count: u32,
    pub notarized_blocks: usize,
}

impl RoundInfo {
    pub fn from_round(round: &Round) -> Self {
        Self {
            number: round.number(),
            random_seed: round.random_seed(),
            block_hash: round.block_hash(),
            timeout_count: round.timeout_counter().get_timeout_count(),
            notarized_blocks: round.notarized_blocks().len(),
        }
    }
}

/// [`RoundInfoStore`] keeping everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoundInfoStore {
    rounds: RwLock<BTreeMap<i64, RoundInfo>>,
}

impl InMemoryRoundInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, number: i64) -> Option<RoundInfo> {
        self.rounds.read().get(&number).cloned()
    }

    pub fn len(&self) -> usize {
        self.rounds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.read().is_empty()
    }

    /// Highest stored round.
    pub fn latest(&self) -> Option<RoundInfo> {
        self.rounds.read().values().next_back().cloned()
    }
}

impl RoundInfoStore for InMemoryRoundInfoStore {
    fn update_round_info(&self, info: RoundInfo) -> Result<()> {
        self.rounds.write().insert(info.number, info);
        Ok(())
    }
}

pub struct FinalizeRoundWorker {
    chain: Arc<MinerChain>,
    finalizer: Arc<dyn RoundFinalizer>,
    store: Arc<dyn RoundInfoStore>,
    timeout: Duration,
}

impl FinalizeRoundWorker {
    pub fn new(
        chain: Arc<MinerChain>,
        finalizer: Arc<dyn RoundFinalizer>,
        store: Arc<dyn RoundInfoStore>,
    ) -> Self {
        let timeout = chain.config().finalize_timeout();
        Self {
            chain,
            finalizer,
            store,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(self, mut rx: mpsc::Receiver<Arc<Round>>, cancel: CancellationToken) {
        info!("finalize round worker started, timeout {:?}", self.timeout);
        loop {
            let round = tokio::select! {
                _ = cancel.cancelled() => break,
                round = rx.recv() => match round {
                    Some(round) => round,
                    None => break,
                },
            };
            let number = round.number();
            let task = tokio::spawn(finalize_and_update(
                self.chain.clone(),
                self.finalizer.clone(),
                self.store.clone(),
                round,
            ));

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = tokio::time::timeout(self.timeout, task) => match result {
                    Ok(Ok(Ok(()))) => debug!("round {number} finalized"),
                    Ok(Ok(Err(e))) => warn!("finalizing round {number} failed: {e}"),
                    Ok(Err(e)) => error!("finalize task of round {number} aborted: {e}"),
                    Err(_) => warn!(
                        "finalizing round {number} timed out after {:?}, moving on",
                        self.timeout
                    ),
                },
            }
        }
        info!("finalize round worker stopped");
    }
}

async fn finalize_and_update(
    chain: Arc<MinerChain>,
    finalizer: Arc<dyn RoundFinalizer>,
    store: Arc<dyn RoundInfoStore>,
    round: Arc<Round>,
) -> Result<()> {
    finalizer.finalize_round(round.clone()).await?;
    store.update_round_info(RoundInfo::from_round(&round))?;
    if let Some(block) = round.best_block() {
        chain.set_latest_finalized_block(block);
    }
    chain.prune_rounds();
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::{
            chain::tests::{block, test_chain},
            error::MinerError,
        },
        std::time::Instant,
    };

    /// Finalizer that marks the round's block state as computed and can be
    /// told to stall or fail on a given round.
    #[derive(Default)]
    pub(crate) struct TestFinalizer {
        pub(crate) stall_round: Option<i64>,
        pub(crate) fail_round: Option<i64>,
    }

    #[async_trait]
    impl RoundFinalizer for TestFinalizer {
        async fn finalize_round(&self, round: Arc<Round>) -> Result<()> {
            if self.stall_round == Some(round.number()) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail_round == Some(round.number()) {
                return Err(MinerError::Finalize {
                    round: round.number(),
                    reason: "state computation failed".into(),
                });
            }
            if let Some(block) = round.best_block() {
                block.set_state_status(zcn_round::StateStatus::Successful);
            }
            Ok(())
        }
    }

    fn finalized_round(chain: &MinerChain, number: i64) -> Arc<Round> {
        let mr = chain.get_or_create_round(number);
        let b = block(number, "m1", 0, number.saturating_add(100));
        mr.add_notarized_block(b.clone()).unwrap();
        mr.finalize(b);
        mr
    }

    async fn wait_until(deadline: Duration, f: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if f() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        f()
    }

    #[test]
    fn test_round_info_from_round() {
        let (chain, _rx) = test_chain("m0", &["m0", "m1"]);
        let mr = finalized_round(&chain, 4);
        let info = RoundInfo::from_round(&mr);
        assert_eq!(info.number, 4);
        assert_eq!(info.notarized_blocks, 1);
        assert_eq!(info.block_hash, mr.block_hash());

        let store = InMemoryRoundInfoStore::new();
        assert!(store.is_empty());
        store.update_round_info(info.clone()).unwrap();
        store
            .update_round_info(RoundInfo { number: 2, ..info.clone() })
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.latest(), Some(info));
    }

    #[tokio::test]
    async fn test_finalizes_and_advances_chain() {
        let (chain, rx) = test_chain("m0", &["m0", "m1"]);
        let store = Arc::new(InMemoryRoundInfoStore::new());
        let worker = FinalizeRoundWorker::new(
            chain.clone(),
            Arc::new(TestFinalizer::default()),
            store.clone(),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(rx.finalized_rounds, cancel.clone()));

        let r1 = finalized_round(&chain, 1);
        chain.push_finalized_round(r1.clone()).await.unwrap();
        assert!(wait_until(Duration::from_secs(2), || store.get(1).is_some()).await);
        assert!(wait_until(Duration::from_secs(2), || chain.latest_finalized_round() == 1).await);
        assert_eq!(
            r1.best_block().unwrap().state_status(),
            zcn_round::StateStatus::Successful
        );

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stalled_round_does_not_block_next() {
        let (chain, rx) = test_chain("m0", &["m0", "m1"]);
        let store = Arc::new(InMemoryRoundInfoStore::new());
        let finalizer = TestFinalizer {
            stall_round: Some(1),
            fail_round: Some(2),
        };
        let worker = FinalizeRoundWorker::new(chain.clone(), Arc::new(finalizer), store.clone())
            .with_timeout(Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(rx.finalized_rounds, cancel.clone()));

        for n in 1..=3 {
            chain.push_finalized_round(finalized_round(&chain, n)).await.unwrap();
        }
        assert!(wait_until(Duration::from_secs(3), || store.get(3).is_some()).await);
        assert!(store.get(1).is_none());
        assert!(store.get(2).is_none());
        assert_eq!(chain.latest_finalized_round(), 3);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let (chain, rx) = test_chain("m0", &["m0", "m1"]);
        let finalizer = TestFinalizer {
            stall_round: Some(1),
            fail_round: None,
        };
        let worker = FinalizeRoundWorker::new(
            chain.clone(),
            Arc::new(finalizer),
            Arc::new(InMemoryRoundInfoStore::new()),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(rx.finalized_rounds, cancel.clone()));

        chain.push_finalized_round(finalized_round(&chain, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
