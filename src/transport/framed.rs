use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::{ChannelSender, Inbound, RECV_QUEUE_DEPTH, SEND_QUEUE_DEPTH};
use crate::error::TransportError;
use crate::message::{MessageCodec, MessageProtocol, Request};

/// Open a raw TCP channel carrying newline-delimited JSON
pub async fn connect(addr: &str) -> Result<(ChannelSender, Inbound), TransportError> {
    let stream = TcpStream::connect(addr).await?;
    info!("Connected to backend at {}", addr);
    Ok(spawn(stream))
}

/// Frame an already open byte stream and start its reader and writer tasks
pub fn spawn<S>(stream: S) -> (ChannelSender, Inbound)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut sink, mut frames) = MessageProtocol::new(stream, MessageCodec::new()).split();
    let (queue_tx, mut queue_rx) = mpsc::channel::<Request>(SEND_QUEUE_DEPTH);
    let (inbound_tx, inbound_rx) = mpsc::channel(RECV_QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(request) = queue_rx.recv().await {
            let kind = request.kind();
            if let Err(err) = sink.send(request).await {
                warn!("Failed to write {}: {}", kind, err);
                break;
            }
            trace!("Wrote {}", kind);
        }
        // Dropping the queue receiver fails every later send with Closed
        debug!("Channel writer stopped");
    });

    tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            let item = match frame {
                Ok(item) => item,
                Err(err) => {
                    warn!("Channel read failed: {}", err);
                    break;
                }
            };
            if inbound_tx.send(item).await.is_err() {
                break;
            }
        }
        debug!("Channel reader stopped");
    });

    (ChannelSender { queue: queue_tx }, inbound_rx)
}
