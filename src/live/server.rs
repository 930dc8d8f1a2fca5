//! WebSocket endpoint for live subscribers.
//!
//! Each accepted connection gets a bounded outbound queue drained by a
//! writer task. The queue sender is what the [`Broadcaster`] holds, so a
//! slow socket never blocks a broadcast; a peer that lets its queue fill up
//! is evicted. Inbound frames are read only to notice pings and the close
//! handshake. Accept errors are logged and retried after a short pause.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::broadcaster::{Broadcaster, DeliveryFailure, Subscriber};
use crate::error::Result;

/// Frames buffered per connection before the peer counts as too slow.
const OUTBOUND_QUEUE: usize = 64;
/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop bound to one address.
pub struct LiveServer {
    listener: TcpListener,
    broadcaster: Broadcaster,
}

impl LiveServer {
    pub async fn bind(addr: SocketAddr, broadcaster: Broadcaster) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Live server listening on ws://{}", listener.local_addr()?);
        Ok(Self { listener, broadcaster })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped or aborted.
    pub async fn run(self) {
        accept_loop(&self.listener, &self.broadcaster).await;
    }
}

/// Source of inbound connections.
#[async_trait]
trait Incoming: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Incoming for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

async fn accept_loop<I: Incoming + ?Sized>(incoming: &I, broadcaster: &Broadcaster) {
    loop {
        let (stream, peer) = match incoming.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed, retrying in {ACCEPT_BACKOFF:?}: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, peer, broadcaster).await {
                warn!(%peer, "Connection ended with error: {e:#}");
            }
        });
    }
}

/// Subscriber backed by a connection's outbound queue.
struct ChannelSubscriber {
    tx: mpsc::Sender<Message>,
    evict: Arc<Notify>,
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn send(&self, frame: &str) -> std::result::Result<(), DeliveryFailure> {
        match self.tx.try_send(Message::Text(frame.to_string())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.evict.notify_one();
                Err(DeliveryFailure::closed("outbound queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryFailure::closed("connection closed")),
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, broadcaster: Broadcaster) -> anyhow::Result<()> {
    let ws = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    debug!(%peer, "WebSocket handshake complete");

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let evict = Arc::new(Notify::new());

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(message).await {
                debug!("Write failed, closing writer: {e}");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let subscriber = ChannelSubscriber {
        tx: tx.clone(),
        evict: evict.clone(),
    };
    let id = match broadcaster.add(Arc::new(subscriber)).await {
        Ok(id) => id,
        Err(e) => {
            writer.abort();
            return Err(e).context("Registering subscriber failed");
        }
    };

    let mut evicted = false;
    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Ping(data))) => {
                    let _ = tx.try_send(Message::Pong(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(%peer, "Client closed: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%peer, "Receive failed: {e}");
                    break;
                }
                None => break,
            },
            () = evict.notified() => {
                warn!(%peer, "Dropping subscriber that stopped reading");
                evicted = true;
                break;
            }
        }
    }

    broadcaster.remove(id).await;
    drop(tx);
    if evicted {
        writer.abort();
    } else {
        let _ = writer.await;
    }
    Ok(())
}
