//! Outbound entity sends.

use {
    crate::{
        error::Result,
        message::{Envelope, N2NEntity},
    },
    async_trait::async_trait,
    log::debug,
    std::time::Instant,
    zcn_node::{transport, N2NConfig, Node, NodeId},
};

/// Sends an entity to one peer.
#[async_trait]
pub trait EntitySender: Send + Sync {
    async fn send_to(&self, to: &Node, entity: &N2NEntity) -> Result<()>;
}

/// [`EntitySender`] over the N2N TCP transport.
///
/// Every send is recorded in the receiving node's livemetrics: timing and
/// size per endpoint on success, a send error otherwise.
pub struct TcpSender {
    self_id: NodeId,
    config: N2NConfig,
}

impl TcpSender {
    pub fn new(self_id: NodeId, config: N2NConfig) -> Self {
        Self { self_id, config }
    }
}

#[async_trait]
impl EntitySender for TcpSender {
    async fn send_to(&self, to: &Node, entity: &N2NEntity) -> Result<()> {
        let options = entity.send_options();
        let frame = Envelope::new(self.self_id.clone(), entity.clone())
            .encode(self.config.max_message_size)?;

        let start = Instant::now();
        match transport::send_frame(to.n2n_addr(), &frame, self.config.timeout(options.class)).await {
            Ok(()) => {
                to.record_sent(entity.uri(), start.elapsed(), frame.len());
                to.update_message_timings(self.config.large_message_threshold);
                Ok(())
            }
            Err(e) => {
                debug!("sending {} to {} failed: {e}", entity.uri(), to.id());
                to.add_send_errors(1);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{net::SocketAddr, time::Duration},
        zcn_node::{transport::TransportListener, NodeInfo, NodeType},
        zcn_round::VrfShare,
    };

    fn peer(addr: SocketAddr) -> Node {
        Node::new(NodeInfo {
            id: NodeId::from("peer"),
            node_type: NodeType::Miner,
            n2n_addr: addr,
            set_index: 0,
            description: String::new(),
        })
    }

    #[tokio::test]
    async fn test_send_records_livemetrics() {
        let config = N2NConfig::dev_default();
        let mut handle = TransportListener::new(config.clone()).start().await.unwrap();
        let to = peer(handle.local_addr);
        let sender = TcpSender::new(NodeId::from("me"), config);

        let entity = N2NEntity::VrfShare(VrfShare::new(3, 0, "share"));
        sender.send_to(&to, &entity).await.unwrap();

        let inbound = tokio::time::timeout(Duration::from_secs(2), handle.inbound_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let envelope = Envelope::decode(&inbound.frame).unwrap();
        assert_eq!(envelope.sender, NodeId::from("me"));
        assert_eq!(envelope.entity, entity);
        assert_eq!(to.sent(), 1);
        assert!(to.small_message_send_time() >= 0.0);
    }

    #[tokio::test]
    async fn test_failed_send_counts_error() {
        let addr = {
            let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let to = peer(addr);
        let sender = TcpSender::new(NodeId::from("me"), N2NConfig::dev_default());
        let entity = N2NEntity::VrfShare(VrfShare::new(3, 0, "share"));
        assert!(sender.send_to(&to, &entity).await.is_err());
        assert_eq!(to.send_errors(), 1);
        assert_eq!(to.sent(), 0);
    }
}
