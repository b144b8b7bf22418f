//! Miner service: wires the transport, router, processor and finalization
//! worker together under one cancellation token.

use {
    crate::{
        chain::MinerChain,
        config::MinerConfig,
        driver::{FinalizeRoundWorker, RoundFinalizer, RoundInfoStore},
        error::Result,
        processor::BlockMessageProcessor,
        router::BlockMessageRouter,
        sender::EntitySender,
    },
    log::{info, warn},
    std::{net::SocketAddr, sync::Arc},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    zcn_node::{transport::TransportListener, NodeId, NodePool, NodeRegistry},
};

pub struct MinerService {
    chain: Arc<MinerChain>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl MinerService {
    /// Validate `config`, bind the N2N listener and spawn the worker loops.
    pub async fn start(
        self_id: NodeId,
        config: MinerConfig,
        registry: Arc<NodeRegistry>,
        miners: NodePool,
        sender: Arc<dyn EntitySender>,
        finalizer: Arc<dyn RoundFinalizer>,
        store: Arc<dyn RoundInfoStore>,
    ) -> Result<Self> {
        config.validate()?;
        let listener = TransportListener::new(config.n2n.clone());
        let (chain, receivers) = MinerChain::new(self_id, config, registry, miners);
        let transport = listener.start().await?;
        let cancel = CancellationToken::new();

        let router = BlockMessageRouter::new(chain.clone(), sender);
        let processor = BlockMessageProcessor::new(chain.clone());
        let worker = FinalizeRoundWorker::new(chain.clone(), finalizer, store);

        let handles = vec![
            tokio::spawn(router.serve(transport.inbound_rx, cancel.clone())),
            tokio::spawn(processor.run(receivers.block_messages, cancel.clone())),
            tokio::spawn(worker.run(receivers.finalized_rounds, cancel.clone())),
        ];
        info!(
            "miner {} started on {} with {} miners",
            chain.self_id(),
            transport.local_addr,
            chain.miners().size()
        );

        Ok(Self {
            chain,
            local_addr: transport.local_addr,
            cancel,
            handles,
        })
    }

    pub fn chain(&self) -> &Arc<MinerChain> {
        &self.chain
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every loop and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("miner task ended abnormally: {e}");
            }
        }
        info!("miner {} stopped", self.chain.self_id());
    }
}
