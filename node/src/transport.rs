//! TCP transport for N2N frames.
//!
//! Every frame on the wire is produced by [`crate::codec::encode_framed`].
//! The listener reads the header, checks the length against
//! `max_message_size`, reads exactly that many bytes and hands the complete
//! frame to whoever consumes the inbound channel.  Decoding the payload into
//! an entity is left to that consumer.

use {
    crate::{
        codec::{self, FRAME_HEADER_LEN},
        config::N2NConfig,
        error::{NodeError, Result},
    },
    log::{debug, error, info, warn},
    std::{net::SocketAddr, time::Duration},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        sync::mpsc,
    },
};

/// A received frame together with the address it came from.
#[derive(Debug)]
pub struct InboundFrame {
    /// Header and payload, as produced by `encode_framed`.
    pub frame: Vec<u8>,
    pub from: SocketAddr,
}

/// Handle returned by [`TransportListener::start`].
pub struct TransportHandle {
    /// Every complete inbound frame.
    pub inbound_rx: mpsc::Receiver<InboundFrame>,
    /// The local address the listener is bound to (useful when port = 0).
    pub local_addr: SocketAddr,
}

/// Listens for inbound TCP connections and delivers frames.
pub struct TransportListener {
    config: N2NConfig,
}

impl TransportListener {
    pub fn new(config: N2NConfig) -> Self {
        Self { config }
    }

    /// Bind and start accepting connections, one Tokio task per connection.
    pub async fn start(self) -> Result<TransportHandle> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("n2n transport listening on {local_addr}");

        let (tx, rx) = mpsc::channel::<InboundFrame>(self.config.channel_buffer_size);
        let max_msg = self.config.max_message_size;

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("accepted n2n connection from {addr}");
                        if tx.is_closed() {
                            break;
                        }
                        tokio::spawn(Self::handle_connection(stream, addr, tx.clone(), max_msg));
                    }
                    Err(e) => {
                        error!("accept error: {e}");
                    }
                }
            }
            info!("n2n listener on {local_addr} stopped");
        });

        Ok(TransportHandle {
            inbound_rx: rx,
            local_addr,
        })
    }

    /// Read frames from `stream` until EOF or error.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        tx: mpsc::Sender<InboundFrame>,
        max_message_size: usize,
    ) {
        let mut header = [0u8; FRAME_HEADER_LEN];

        loop {
            if let Err(e) = stream.read_exact(&mut header).await {
                if e.kind() != std::io::ErrorKind::UnexpectedEof {
                    warn!("header read error from {addr}: {e}");
                }
                break;
            }

            let len = match codec::read_header(&header) {
                Ok((len, _)) => len,
                Err(e) => {
                    warn!("bad frame header from {addr}: {e}, dropping connection");
                    break;
                }
            };
            if len > max_message_size {
                warn!(
                    "peer {addr} sent oversized frame ({len} > {max_message_size}), dropping connection"
                );
                break;
            }

            let mut frame = vec![0u8; FRAME_HEADER_LEN.saturating_add(len)];
            frame[..FRAME_HEADER_LEN].copy_from_slice(&header);
            if let Err(e) = stream.read_exact(&mut frame[FRAME_HEADER_LEN..]).await {
                warn!("payload read error from {addr}: {e}");
                break;
            }

            if tx.send(InboundFrame { frame, from: addr }).await.is_err() {
                info!("inbound channel closed, stopping reader for {addr}");
                break;
            }
        }

        debug!("connection to {addr} closed");
    }
}

/// Send one frame to `addr` over a new connection, bounded by `timeout`.
pub async fn send_frame(addr: SocketAddr, frame: &[u8], timeout: Duration) -> Result<()> {
    let send = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(frame).await?;
        stream.flush().await?;
        Ok::<(), std::io::Error>(())
    };
    match tokio::time::timeout(timeout, send).await {
        Ok(result) => result.map_err(NodeError::from),
        Err(_) => Err(NodeError::Timeout(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
