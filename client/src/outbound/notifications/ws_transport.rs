//! `awc`-backed notification socket.
//!
//! Keeps WebSocket framing and heartbeats at the edge: pings are answered
//! with pongs, close frames end the connection, and frames that cannot be
//! decoded are logged and skipped so a noisy server cannot tear the feed
//! down.

use std::sync::Arc;
use std::time::Duration;

use actix_codec::Framed;
use async_trait::async_trait;
use awc::BoxedSocket;
use awc::http::header;
use awc::ws::{CloseCode, Codec, Frame, Message};
use futures_util::{SinkExt, StreamExt};
use mockable::Clock;
use tracing::{debug, warn};
use url::Url;

use super::dto::{decode_event, encode_mark_as_read};
use crate::domain::ports::{
    NotificationConnection, NotificationTransport, NotificationTransportError,
};
use crate::domain::{AccessToken, Notification, NotificationId};

/// Notification transport speaking JSON envelopes over a WebSocket.
pub struct WsNotificationTransport {
    url: Url,
    handshake_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl WsNotificationTransport {
    /// Build a transport for the socket at `url` (`ws://` or `wss://`).
    ///
    /// `clock` stamps notifications that arrive without a timestamp.
    pub fn new(url: Url, handshake_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            url,
            handshake_timeout,
            clock,
        }
    }
}

#[async_trait(?Send)]
impl NotificationTransport for WsNotificationTransport {
    async fn connect(
        &self,
        token: &AccessToken,
    ) -> Result<Box<dyn NotificationConnection>, NotificationTransportError> {
        let client = awc::Client::builder()
            .timeout(self.handshake_timeout)
            .finish();
        let (response, socket) = client
            .ws(self.url.as_str())
            .set_header(header::AUTHORIZATION, format!("Bearer {}", token.expose()))
            .connect()
            .await
            .map_err(|error| NotificationTransportError::handshake(error.to_string()))?;
        debug!(status = %response.status(), url = %self.url, "notification socket open");

        Ok(Box::new(WsNotificationConnection {
            socket,
            clock: Arc::clone(&self.clock),
            closed: false,
        }))
    }
}

struct WsNotificationConnection {
    socket: Framed<BoxedSocket, Codec>,
    clock: Arc<dyn Clock>,
    closed: bool,
}

impl WsNotificationConnection {
    async fn send(&mut self, message: Message) -> Result<(), NotificationTransportError> {
        self.socket
            .send(message)
            .await
            .map_err(|error| NotificationTransportError::transport(error.to_string()))
    }
}

#[async_trait(?Send)]
impl NotificationConnection for WsNotificationConnection {
    async fn next_notification(
        &mut self,
    ) -> Result<Option<Notification>, NotificationTransportError> {
        loop {
            let Some(frame) = self.socket.next().await else {
                return Ok(None);
            };
            let frame =
                frame.map_err(|error| NotificationTransportError::transport(error.to_string()))?;

            match frame {
                Frame::Text(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    match decode_event(&text, self.clock.utc()) {
                        Ok(Some(notification)) => return Ok(Some(notification)),
                        Ok(None) => debug!("ignoring unsupported socket event"),
                        Err(error) => warn!(error = %error, "rejected malformed socket payload"),
                    }
                }
                Frame::Ping(payload) => self.send(Message::Pong(payload)).await?,
                Frame::Close(reason) => {
                    debug!(?reason, "server closed the notification socket");
                    self.closed = true;
                    return Ok(None);
                }
                Frame::Pong(_) | Frame::Binary(_) | Frame::Continuation(_) => {}
            }
        }
    }

    async fn acknowledge_read(
        &mut self,
        id: &NotificationId,
    ) -> Result<(), NotificationTransportError> {
        let body = encode_mark_as_read(id)
            .map_err(|error| NotificationTransportError::transport(error.to_string()))?;
        self.send(Message::Text(body.into())).await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.send(Message::Close(Some(CloseCode::Normal.into()))).await {
            debug!(error = %error, "notification socket already gone");
        }
    }
}
