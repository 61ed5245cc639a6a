//! Engine.IO v4 / Socket.IO v5 text packets over WebSocket.
//!
//! Only the packets the notification server sends are understood: the
//! Engine.IO handshake and heartbeat, and Socket.IO `CONNECT`, `DISCONNECT`,
//! `EVENT` and `CONNECT_ERROR` on the default namespace. Binary packets are
//! never used by the server.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Engine.IO `pong`, the reply to every server `ping`.
pub const PONG: &str = "3";
/// Socket.IO `CONNECT` to the default namespace.
pub const CONNECT: &str = "40";
/// Socket.IO `DISCONNECT` from the default namespace.
pub const DISCONNECT: &str = "41";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownPacket(char),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid socket URL: {0}")]
    InvalidUrl(String),
}

/// Engine.IO open handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Heartbeat window used until the server announces its own.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(25_000 + 20_000);

impl Handshake {
    /// How long the connection may stay silent before a ping is overdue.
    pub fn heartbeat_window(&self) -> Duration {
        let window = self.ping_interval.saturating_add(self.ping_timeout);
        if window == 0 {
            DEFAULT_HEARTBEAT
        } else {
            Duration::from_millis(window)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    Ack,
    ConnectError(Value),
}

/// Decodes one WebSocket text frame.
///
/// # Errors
/// Returns [`ProtocolError`] for frames that are not valid Engine.IO packets.
pub fn decode(frame: &str) -> Result<EnginePacket, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();
    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|e| ProtocolError::Malformed(format!("open: {e}"))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn decode_socket(packet: &str) -> Result<SocketPacket, ProtocolError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let body = skip_ack_id(skip_namespace(chars.as_str()));
    match kind {
        '0' => {
            if body.trim().is_empty() {
                Ok(SocketPacket::Connect(None))
            } else {
                parse_json(body, "connect").map(|v| SocketPacket::Connect(Some(v)))
            }
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => decode_event(body),
        '3' => Ok(SocketPacket::Ack),
        '4' => parse_json(body, "connect_error").map(SocketPacket::ConnectError),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<SocketPacket, ProtocolError> {
    let value = parse_json(body, "event")?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::Malformed("event payload is not an array".into()));
    };
    if items.is_empty() {
        return Err(ProtocolError::Malformed("event without a name".into()));
    }
    let name = match items.remove(0) {
        Value::String(name) => name,
        other => {
            return Err(ProtocolError::Malformed(format!(
                "event name is not a string: {other}"
            )));
        }
    };
    let data = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };
    Ok(SocketPacket::Event { name, data })
}

fn parse_json(body: &str, what: &str) -> Result<Value, ProtocolError> {
    serde_json::from_str(body).map_err(|e| ProtocolError::Malformed(format!("{what}: {e}")))
}

/// Encodes a Socket.IO `EVENT` on the default namespace.
pub fn encode_event(name: &str, data: &Value) -> String {
    let payload = Value::Array(vec![Value::String(name.to_string()), data.clone()]);
    format!("42{payload}")
}

/// WebSocket endpoint for a Socket.IO server base URL.
///
/// # Errors
/// Returns an error if the base URL cannot be parsed or has an unsupported scheme.
pub fn socket_url(base: &str) -> Result<url::Url, ProtocolError> {
    let mut url =
        url::Url::parse(base.trim()).map_err(|e| ProtocolError::InvalidUrl(format!("{base}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ProtocolError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| ProtocolError::InvalidUrl(format!("cannot use scheme {scheme}")))?;
    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_open() {
        let packet =
            decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
                .unwrap();
        assert_eq!(
            packet,
            EnginePacket::Open(Handshake {
                sid: "abc".into(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn test_heartbeat_window() {
        let handshake = Handshake {
            sid: "abc".into(),
            ping_interval: 25000,
            ping_timeout: 20000,
        };
        assert_eq!(handshake.heartbeat_window(), Duration::from_secs(45));

        let silent = Handshake {
            sid: "abc".into(),
            ping_interval: 0,
            ping_timeout: 0,
        };
        assert_eq!(silent.heartbeat_window(), DEFAULT_HEARTBEAT);
    }

    #[test]
    fn test_decode_heartbeat_and_connect() {
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping);
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::Connect(Some(json!({"sid": "xyz"}))))
        );
        assert_eq!(
            decode("40").unwrap(),
            EnginePacket::Message(SocketPacket::Connect(None))
        );
        assert_eq!(decode("41").unwrap(), EnginePacket::Message(SocketPacket::Disconnect));
    }

    #[test]
    fn test_decode_event_with_cyrillic_payload() {
        let packet =
            decode(r#"42["new_event_added",{"eventId":5,"eventTitle":"Турнир"}]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "new_event_added".into(),
                data: json!({"eventId": 5, "eventTitle": "Турнир"}),
            })
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = decode(r#"42/admin,7["auth_success"]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "auth_success".into(),
                data: Value::Null,
            })
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(""), Err(ProtocolError::Empty));
        assert_eq!(decode("9"), Err(ProtocolError::UnknownPacket('9')));
        assert!(matches!(decode("42{}"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode("42[1]"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(
            encode_event("authenticate_user", &json!({"token": "T"})),
            r#"42["authenticate_user",{"token":"T"}]"#
        );
    }

    #[test]
    fn test_socket_url() {
        assert_eq!(
            socket_url("http://localhost:5000").unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://pulse.example/base/").unwrap().as_str(),
            "wss://pulse.example/base/socket.io/?EIO=4&transport=websocket"
        );
        assert!(socket_url("ftp://x").is_err());
    }
}
