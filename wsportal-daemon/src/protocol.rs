//! Newline-delimited JSON control protocol over the daemon's Unix socket.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

/// JSON newline-delimited request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Send one JSON request to the daemon socket and return one response.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| io_err(&socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(&socket, e))?;
    stream.flush().map_err(|e| io_err(&socket, e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }

    let response: DaemonResponse = serde_json::from_str(line.trim_end())?;
    Ok(response)
}

fn response_into_data(response: DaemonResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Protocol(
            response
                .error
                .unwrap_or_else(|| "daemon reported an unknown error".to_string()),
        ))
    }
}

/// Query the daemon's runtime status.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let request = DaemonRequest {
        cmd: "status".to_string(),
        region: None,
    };
    response_into_data(send_request(home, &request)?)
}

/// Trigger an immediate import (optionally scoped to one region) and wait
/// for its report.
pub fn request_sync(home: &Path, region: Option<String>) -> Result<Value, DaemonError> {
    let request = DaemonRequest {
        cmd: "sync".to_string(),
        region,
    };
    response_into_data(send_request(home, &request)?)
}

/// Ask the daemon to shut down.
pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    let request = DaemonRequest {
        cmd: "stop".to_string(),
        region: None,
    };
    send_request(home, &request).map(|_| ())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serde_roundtrip() {
        let request = DaemonRequest {
            cmd: "sync".to_string(),
            region: Some("eu-west-1".to_string()),
        };
        let json = serde_json::to_string(&request).expect("serialize");
        let back: DaemonRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.cmd, "sync");
        assert_eq!(back.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn request_omits_absent_region() {
        let request = DaemonRequest {
            cmd: "status".to_string(),
            region: None,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert_eq!(json, r#"{"cmd":"status"}"#);
    }

    #[test]
    fn error_response_converts_to_protocol_error() {
        let response = DaemonResponse::error("no such region");
        let err = response_into_data(response).expect_err("must fail");
        assert!(err.to_string().contains("no such region"));
    }

    #[test]
    fn ok_response_yields_payload() {
        let response = DaemonResponse::ok(serde_json::json!({"running": true}));
        let data = response_into_data(response).expect("payload");
        assert_eq!(data["running"], serde_json::json!(true));
    }
}
