//! Response payload parsing
//!
//! Body data read with `AT+SQNHTTPRCV` arrives as `<<<` followed by the
//! content and the final `OK`, all concatenated by the engine. Event lines
//! carry comma separated fields after the tag, e.g.
//! `+SQNHTTPRING: 1,200,"application/json",245`.

use serde_json::Value;

use super::{ModemError, OK_MARKER};

/// Leading marker in front of HTTP body data
pub const BODY_MARKER: char = '<';

/// Prefix shared by the Sequans event tags
const EVENT_PREFIX: &str = "+SQN";

/// HTTP status meaning success
pub const HTTP_STATUS_OK: u16 = 200;

/// Socket states reported by `AT+SQNSS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// 0: closed
    Closed,
    /// 1: active data transfer
    ActiveTransfer,
    /// 2: suspended, nothing pending
    SuspendedNoPendingData,
    /// 3: suspended with pending data
    SuspendedPendingData,
    /// 4: listening
    Listening,
    /// 5: incoming connection being accepted
    IncomingConnection,
    /// 6: opening
    Opening,
}

impl TryFrom<u8> for SocketState {
    type Error = ModemError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => SocketState::Closed,
            1 => SocketState::ActiveTransfer,
            2 => SocketState::SuspendedNoPendingData,
            3 => SocketState::SuspendedPendingData,
            4 => SocketState::Listening,
            5 => SocketState::IncomingConnection,
            6 => SocketState::Opening,
            other => {
                return Err(ModemError::MalformedPayload(format!(
                    "unknown socket state {}",
                    other
                )))
            }
        })
    }
}

/// Remove the trailing `OK` and the leading `<<<` run
pub fn strip_framing(text: &str) -> Result<&str, ModemError> {
    let body = strip_ok(text)?;
    Ok(body.trim_start_matches(BODY_MARKER))
}

/// Remove the trailing `OK` (and whitespace before it)
pub fn strip_ok(text: &str) -> Result<&str, ModemError> {
    text.trim_end()
        .strip_suffix(OK_MARKER)
        .map(str::trim_end)
        .ok_or_else(|| ModemError::MalformedPayload(format!("missing trailing OK in '{}'", text)))
}

/// Parse a stripped body as JSON
pub fn decode_json(text: &str) -> Result<Value, ModemError> {
    serde_json::from_str(text)
        .map_err(|e| ModemError::MalformedPayload(format!("invalid JSON body: {}", e)))
}

/// HTTP status from a `+SQNHTTPRING: <profile>,<status>,...` report
pub fn parse_ring_status(text: &str) -> Result<u16, ModemError> {
    let field = event_field(text, 1)?;
    field
        .parse()
        .map_err(|_| ModemError::MalformedPayload(format!("invalid HTTP status '{}'", field)))
}

/// Result code from an event such as `+SQNSMQTTONCONNECT: 0,<rc>`
pub fn parse_result_code(text: &str) -> Result<i32, ModemError> {
    let field = event_field(text, 1)?;
    field
        .parse()
        .map_err(|_| ModemError::MalformedPayload(format!("invalid result code '{}'", field)))
}

/// Socket states from newline separated `+SQNSS: <id>,<state>,...` lines
pub fn parse_socket_states(text: &str) -> Result<Vec<(u8, SocketState)>, ModemError> {
    let mut states = Vec::new();
    for line in text.lines().filter(|l| l.trim_start().starts_with("+SQNSS:")) {
        let mut fields = fields_after_tag(line);
        let id = fields.next().and_then(|f| f.parse::<u8>().ok());
        let state = fields.next().and_then(|f| f.parse::<u8>().ok());
        match (id, state) {
            (Some(id), Some(state)) => states.push((id, SocketState::try_from(state)?)),
            _ => {
                return Err(ModemError::MalformedPayload(format!(
                    "invalid socket status '{}'",
                    line
                )))
            }
        }
    }
    Ok(states)
}

/// Field `index` of the last event line in `text`
fn event_field(text: &str, index: usize) -> Result<&str, ModemError> {
    let event = text.rfind(EVENT_PREFIX).map_or(text, |at| &text[at..]);
    fields_after_tag(event)
        .nth(index)
        .ok_or_else(|| ModemError::MalformedPayload(format!("missing field {} in '{}'", index, event)))
}

fn fields_after_tag(line: &str) -> impl Iterator<Item = &str> {
    let args = line.split_once(':').map_or(line, |(_, rest)| rest);
    args.split(',').map(|f| f.trim().trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_body_round_trip() {
        let body = strip_framing("<<<{\"a\":1}OK").unwrap();
        assert_eq!(body, "{\"a\":1}");
        assert_eq!(decode_json(body).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_strip_framing_requires_ok() {
        assert!(matches!(
            strip_framing("<<<{\"a\":1}"),
            Err(ModemError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_strip_ok_keeps_body() {
        assert_eq!(strip_ok("hello\nOK").unwrap(), "hello");
        assert_eq!(strip_ok("OK").unwrap(), "");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_json("{not json"),
            Err(ModemError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_ring_status() {
        assert_eq!(
            parse_ring_status("+SQNHTTPRING: 1,200,\"application/json\",245").unwrap(),
            200
        );
        assert_eq!(parse_ring_status("junk+SQNHTTPRING: 1,404,\"\",0").unwrap(), 404);
        assert!(parse_ring_status("+SQNHTTPRING: 1").is_err());
        assert!(parse_ring_status("+SQNHTTPRING: 1,abc").is_err());
    }

    #[test]
    fn test_result_code() {
        assert_eq!(parse_result_code("+SQNSMQTTONCONNECT:0,0").unwrap(), 0);
        assert_eq!(parse_result_code("+SQNSMQTTONCONNECT: 0,-3").unwrap(), -3);
    }

    #[test]
    fn test_socket_states() {
        let report = "+SQNSS: 1,2,\"100.111.25.78\",64675,\"203.0.113.7\",12345,1\n+SQNSS: 2,0\nOK";
        assert_eq!(
            parse_socket_states(report).unwrap(),
            vec![
                (1, SocketState::SuspendedNoPendingData),
                (2, SocketState::Closed)
            ]
        );
        assert!(parse_socket_states("+SQNSS: 1,9").is_err());
    }
}
