//! Wire protocol envelope for the LSRM command server.
//!
//! One JSON object per message, each terminated by `\r\n`. Requests carry a
//! `command` plus an optional `arguments` mapping; responses echo the
//! command, carry a `result` flag and, on success, a `data` mapping.
//! Failed responses omit `data` entirely.

use crate::error::McaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Incoming request envelope.
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Command name, e.g. `"getmcaspectrum"`.
    pub command: String,
    /// Command arguments; absent for `getmcalist`.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Request {
    /// The `McaId` argument, if present and a string.
    pub fn mca_id(&self) -> Option<&str> {
        self.arguments.get("McaId").and_then(Value::as_str)
    }
}

/// Parse one request line.
///
/// Malformed JSON is a connection-local [`McaError::Protocol`]; the caller
/// answers with an error envelope instead of dropping the connection.
pub fn parse_request(line: &str) -> Result<Request, McaError> {
    serde_json::from_str(line).map_err(|err| McaError::Protocol(err.to_string()))
}

/// Outgoing response envelope.
#[derive(Debug, Serialize, PartialEq)]
pub struct Response {
    /// Echoed command name.
    pub command: String,
    /// Whether the command succeeded.
    pub result: bool,
    /// Response payload; omitted when `result` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// Successful response with a payload (possibly the empty mapping).
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            result: true,
            data: Some(data),
        }
    }

    /// Failed response; carries no `data` key.
    pub fn error(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            result: false,
            data: None,
        }
    }

    /// Serialize as one `\r\n`-terminated wire line.
    pub fn encode_line(&self) -> String {
        let mut line = serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"command":"","result":false}"#.to_string());
        line.push_str("\r\n");
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_with_arguments() {
        let req =
            parse_request(r#"{"command":"getmcastatus","arguments":{"McaId":"effcalc_mca"}}"#)
                .expect("valid request");
        assert_eq!(req.command, "getmcastatus");
        assert_eq!(req.mca_id(), Some("effcalc_mca"));
    }

    #[test]
    fn test_parse_request_without_arguments() {
        let req = parse_request(r#"{"command":"getmcalist"}"#).expect("valid request");
        assert_eq!(req.command, "getmcalist");
        assert_eq!(req.mca_id(), None);
    }

    #[test]
    fn test_parse_request_rejects_malformed_json() {
        assert!(matches!(
            parse_request("this is not json"),
            Err(McaError::Protocol(_))
        ));
        assert!(matches!(
            parse_request(r#"{"arguments":{}}"#),
            Err(McaError::Protocol(_))
        ));
    }

    #[test]
    fn test_error_response_omits_data_key() {
        let line = Response::error("getmcastatus").encode_line();
        assert_eq!(line, "{\"command\":\"getmcastatus\",\"result\":false}\r\n");
    }

    #[test]
    fn test_ok_response_wire_shape() {
        let line = Response::ok("getmcalist", json!({ "McaList": ["effcalc_mca"] })).encode_line();
        assert_eq!(
            line,
            "{\"command\":\"getmcalist\",\"result\":true,\"data\":{\"McaList\":[\"effcalc_mca\"]}}\r\n"
        );
    }
}
