use std::borrow::Cow;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{Connector, FrameReader, FrameWriter, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials `ws://` and `wss://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        address: &str,
    ) -> Result<(Box<dyn FrameWriter>, Box<dyn FrameReader>), TransportError> {
        let (stream, response) =
            connect_async(address)
                .await
                .map_err(|e| TransportError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(status = response.status().as_u16(), %address, "websocket handshake complete");

        let (sink, stream) = stream.split();
        Ok((
            Box::new(WebSocketWriter { sink }),
            Box::new(WebSocketReader { stream }),
        ))
    }
}

/// Read half of a WebSocket connection.
pub struct WebSocketReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for WebSocketReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(Some(text)),
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "peer closed websocket");
                    return Ok(None);
                }
                None => return Ok(None),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Binary(_))) => {
                    warn!("ignoring binary websocket frame (chat is text-only)");
                    continue;
                }
                Some(Ok(WsMessage::Frame(_))) => continue,
                Some(Err(e)) => return Err(TransportError::WebSocket(e)),
            }
        }
    }
}

/// Write half of a WebSocket connection.
pub struct WebSocketWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl FrameWriter for WebSocketWriter {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink.send(WsMessage::Text(frame)).await?;
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        match self.sink.send(WsMessage::Close(Some(frame))).await {
            Ok(()) => {}
            Err(tungstenite::Error::AlreadyClosed) | Err(tungstenite::Error::ConnectionClosed) => {
                return Ok(())
            }
            Err(e) => return Err(e.into()),
        }
        match self.sink.close().await {
            Ok(())
            | Err(tungstenite::Error::AlreadyClosed)
            | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
