use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{ChannelSender, Inbound, RECV_QUEUE_DEPTH, SEND_QUEUE_DEPTH};
use crate::error::TransportError;
use crate::message::{decode_event, Request};

/// Open a WebSocket channel, one JSON envelope per text message
pub async fn connect(url: &str) -> Result<(ChannelSender, Inbound), TransportError> {
    let (stream, _) = connect_async(url).await?;
    info!("Connected to backend at {}", url);

    let (mut sink, mut messages) = stream.split();
    let (queue_tx, mut queue_rx) = mpsc::channel::<Request>(SEND_QUEUE_DEPTH);
    let (inbound_tx, inbound_rx) = mpsc::channel(RECV_QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(request) = queue_rx.recv().await {
            let kind = request.kind();
            let text = match serde_json::to_string(&request) {
                Ok(text) => text,
                Err(err) => {
                    warn!("Failed to encode {}: {}", kind, err);
                    continue;
                }
            };
            if let Err(err) = sink.send(Message::Text(text)).await {
                warn!("Failed to write {}: {}", kind, err);
                break;
            }
            trace!("Wrote {}", kind);
        }
        // Dropping the queue receiver fails every later send with Closed
        let _ = sink.close().await;
        debug!("Channel writer stopped");
    });

    tokio::spawn(async move {
        while let Some(message) = messages.next().await {
            let item = match message {
                Ok(Message::Text(text)) => decode_event(text.as_bytes()),
                Ok(Message::Binary(data)) => decode_event(&data),
                Ok(Message::Close(_)) => break,
                // Pings are answered by the protocol layer
                Ok(_) => continue,
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

    Ok((ChannelSender { queue: queue_tx }, inbound_rx))
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;
    use crate::error::ProtocolError;
    use crate::message::{CreateRequest, Event};
    use crate::transport::Transport;

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let backend = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"InitData","data":{"routerId":"192.0.2.10","listenIp":"192.0.2.10"}}"#
                    .to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text("not json".to_string())).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"FSMUpdate","data":{"state":"Active"}}"#.to_string(),
            ))
            .await
            .unwrap();
            let received = ws.next().await.unwrap().unwrap();
            received.into_text().unwrap()
        });

        let (sender, mut inbound) = connect(&format!("ws://{}/ws/", addr)).await.unwrap();
        let first = inbound.recv().await.unwrap().unwrap();
        assert!(matches!(first, Event::InitData(_)));
        let second = inbound.recv().await.unwrap();
        assert!(matches!(second, Err(ProtocolError::Decode(_))));
        let third = inbound.recv().await.unwrap().unwrap();
        assert_eq!(third.kind(), "FSMUpdate");

        let request = Request::CreateRequest(CreateRequest {
            peer_asn: 65001,
            peer_ip: "192.0.2.1".to_string(),
            local_asn: 65000,
        });
        sender.send(request.clone()).await.unwrap();
        let text = backend.await.unwrap();
        assert_eq!(serde_json::from_str::<Request>(&text).unwrap(), request);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = connect(&format!("ws://{}/ws/", addr)).await.unwrap_err();
        assert!(matches!(err, TransportError::WebSocket(_)));
    }
}
