//! Frames exchanged on the log-streaming websocket.
//!
//! Server to client:
//!
//! - the plain-text [`WELCOME_MESSAGE`], sent once per subscription;
//! - `{"log": "...", "timestamp": "..."}` for each published line;
//! - `{"type": "heartbeat_response"}` answering a client heartbeat.
//!
//! Client to server: `{"type": "heartbeat"}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// First frame every new subscriber receives.
pub const WELCOME_MESSAGE: &str = "Connected to Hirewatch log stream";

/// Interval between client heartbeats and between server liveness checks.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Close code reported when the transport dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// A published log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFrame {
    pub log: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Control frames, tagged by `"type"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Heartbeat,
    HeartbeatResponse,
}

/// A parsed server-to-client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Welcome,
    Log(LogFrame),
    HeartbeatResponse,
}

/// Why an inbound frame could not be understood.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected frame type: {0:?}")]
    Unexpected(ControlFrame),
}

/// Serialize a log line as sent to subscribers.
pub fn encode_log(message: &str, timestamp: Option<&str>) -> String {
    let frame = LogFrame {
        log: message.to_string(),
        timestamp: timestamp.map(str::to_string),
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Serialize a control frame.
pub fn encode_control(frame: ControlFrame) -> String {
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Parse a text frame received by the client.
///
/// Returns `Err` for anything that is neither the welcome text, a log
/// frame, nor a heartbeat response. Callers should log and continue.
pub fn parse_server_frame(text: &str) -> Result<ServerFrame, FrameError> {
    if text == WELCOME_MESSAGE {
        return Ok(ServerFrame::Welcome);
    }

    if let Ok(frame) = serde_json::from_str::<LogFrame>(text) {
        return Ok(ServerFrame::Log(frame));
    }

    match serde_json::from_str::<ControlFrame>(text)? {
        ControlFrame::HeartbeatResponse => Ok(ServerFrame::HeartbeatResponse),
        other => Err(FrameError::Unexpected(other)),
    }
}

/// Parse a text frame received by the server.
pub fn parse_client_frame(text: &str) -> Result<ControlFrame, FrameError> {
    match serde_json::from_str::<ControlFrame>(text)? {
        ControlFrame::Heartbeat => Ok(ControlFrame::Heartbeat),
        other => Err(FrameError::Unexpected(other)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn heartbeat_wire_format() {
        assert_eq!(encode_control(ControlFrame::Heartbeat), r#"{"type":"heartbeat"}"#);
        assert_eq!(
            encode_control(ControlFrame::HeartbeatResponse),
            r#"{"type":"heartbeat_response"}"#
        );
    }

    #[test]
    fn log_frame_without_timestamp_omits_field() {
        assert_eq!(encode_log("hi", None), r#"{"log":"hi"}"#);
    }

    #[test]
    fn parse_welcome() {
        assert_matches!(parse_server_frame(WELCOME_MESSAGE), Ok(ServerFrame::Welcome));
    }

    #[test]
    fn parse_log_with_and_without_timestamp() {
        let frame = parse_server_frame(r#"{"log":"found 3 jobs"}"#).unwrap();
        assert_eq!(
            frame,
            ServerFrame::Log(LogFrame {
                log: "found 3 jobs".into(),
                timestamp: None
            })
        );

        let encoded = encode_log("x", Some("2024-01-01T00:00:00.000Z"));
        assert_matches!(
            parse_server_frame(&encoded),
            Ok(ServerFrame::Log(LogFrame { timestamp: Some(_), .. }))
        );
    }

    #[test]
    fn parse_heartbeat_response() {
        assert_matches!(
            parse_server_frame(r#"{"type":"heartbeat_response"}"#),
            Ok(ServerFrame::HeartbeatResponse)
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert_matches!(parse_server_frame("not json"), Err(FrameError::Malformed(_)));
        assert_matches!(parse_server_frame(r#"{"log":42}"#), Err(FrameError::Malformed(_)));
        assert_matches!(
            parse_server_frame(r#"{"type":"heartbeat"}"#),
            Err(FrameError::Unexpected(ControlFrame::Heartbeat))
        );
    }

    #[test]
    fn client_frames() {
        assert_matches!(
            parse_client_frame(r#"{"type":"heartbeat"}"#),
            Ok(ControlFrame::Heartbeat)
        );
        assert_matches!(parse_client_frame("{}"), Err(FrameError::Malformed(_)));
        assert_matches!(
            parse_client_frame(r#"{"type":"heartbeat_response"}"#),
            Err(FrameError::Unexpected(_))
        );
    }
}
