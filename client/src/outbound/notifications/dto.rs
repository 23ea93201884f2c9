//! JSON envelopes carried in notification socket text frames.
//!
//! Every frame is `{ "event": <name>, "data": <payload> }`. Inbound events
//! other than `notification` are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Notification, NotificationId, NotificationKind};
use crate::outbound::wire::IdDto;

pub(super) const NOTIFICATION_EVENT: &str = "notification";
pub(super) const MARK_AS_READ_EVENT: &str = "markAsRead";

#[derive(Debug, Deserialize)]
struct InboundEnvelopeDto {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct NotificationDto {
    id: IdDto,
    #[serde(rename = "type")]
    kind: NotificationKind,
    message: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct OutboundEnvelopeDto<'a, T> {
    pub(super) event: &'a str,
    pub(super) data: T,
}

#[derive(Debug, Serialize)]
pub(super) struct MarkAsReadDto<'a> {
    pub(super) id: &'a str,
}

/// Decode one text frame.
///
/// `Ok(None)` means the frame is a well-formed envelope for an event this
/// client does not consume. A missing timestamp is filled with `now`.
pub(super) fn decode_event(text: &str, now: DateTime<Utc>) -> Result<Option<Notification>, String> {
    let envelope: InboundEnvelopeDto =
        serde_json::from_str(text).map_err(|error| format!("invalid envelope: {error}"))?;
    if envelope.event != NOTIFICATION_EVENT {
        return Ok(None);
    }

    let dto: NotificationDto = serde_json::from_value(envelope.data)
        .map_err(|error| format!("invalid notification payload: {error}"))?;
    let id = NotificationId::new(dto.id.into_string()).map_err(|error| error.to_string())?;
    Notification::new(id, dto.kind, dto.message, dto.timestamp.unwrap_or(now))
        .map(Some)
        .map_err(|error| error.to_string())
}

/// Encode a read acknowledgement.
pub(super) fn encode_mark_as_read(id: &NotificationId) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundEnvelopeDto {
        event: MARK_AS_READ_EVENT,
        data: MarkAsReadDto { id: id.as_ref() },
    })
}
