//! Wire parser.
//!
//! Classifies decoded JSON values into JSON-RPC 2.0 items: requests,
//! notifications, client responses to server-originated requests, and
//! invalid envelopes with whatever request id could be recovered. Batch
//! arrays are validated element-wise; elements that fail validation
//! without a usable id are dropped silently, per JSON-RPC batch semantics.

use serde_json::Value;

use crate::codec::DecodeError;
use crate::error_codes;
use crate::jsonrpc::{JsonRpcError, RequestId};

/// One classified inbound item.
#[derive(Debug, Clone)]
pub enum ParsedItem {
    /// A request expecting exactly one response.
    Request {
        /// Method name.
        method: String,
        /// Parameters, if any.
        params: Option<Value>,
        /// Request identifier to echo in the response.
        id: RequestId,
    },
    /// A notification; never answered.
    Notification {
        /// Method name.
        method: String,
        /// Parameters, if any.
        params: Option<Value>,
    },
    /// The client answering a server-originated request.
    ClientResponse {
        /// Id of the server-originated request being answered.
        id: RequestId,
        /// Success payload.
        result: Option<Value>,
        /// Error payload.
        error: Option<JsonRpcError>,
    },
    /// An envelope that failed validation but is still reportable.
    Invalid {
        /// The protocol error to emit.
        error: JsonRpcError,
        /// Recovered request id, when the envelope carried a usable one.
        id: Option<RequestId>,
    },
}

/// Output of one parse pass over a message text.
#[derive(Debug, Clone)]
pub enum Parsed {
    /// Nothing actionable; the input is dropped without a response.
    Empty,
    /// A single envelope.
    Single(ParsedItem),
    /// A batch array; responses are collected into one array reply.
    Batch(Vec<ParsedItem>),
}

fn invalid_request(message: &str) -> JsonRpcError {
    JsonRpcError::new(error_codes::INVALID_REQUEST, format!("Invalid Request: {message}"))
}

/// Parse the outcome of a codec decode into classified items.
pub fn parse(decoded: Result<Value, DecodeError>) -> Parsed {
    let value = match decoded {
        Ok(value) => value,
        Err(e) => {
            return Parsed::Single(ParsedItem::Invalid {
                error: JsonRpcError::new(
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e.message),
                ),
                id: None,
            });
        }
    };

    match value {
        Value::Array(items) if items.is_empty() => Parsed::Single(ParsedItem::Invalid {
            error: invalid_request("empty batch"),
            id: None,
        }),
        Value::Array(items) => {
            let classified = items
                .into_iter()
                .filter_map(classify)
                // Element failures without a recoverable id are not reported.
                .filter(|item| !matches!(item, ParsedItem::Invalid { id: None, .. }))
                .collect();
            Parsed::Batch(classified)
        }
        other => match classify(other) {
            Some(item) => Parsed::Single(item),
            None => Parsed::Empty,
        },
    }
}

/// Recovered id state of an envelope.
enum IdField {
    Absent,
    Usable(RequestId),
    Malformed,
}

fn read_id(value: &Value) -> IdField {
    match value.get("id") {
        // An explicit null id cannot be correlated; treat it as absent.
        None | Some(Value::Null) => IdField::Absent,
        Some(Value::String(s)) => IdField::Usable(RequestId::String(s.clone())),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => IdField::Usable(RequestId::Number(i)),
            None => IdField::Malformed,
        },
        Some(_) => IdField::Malformed,
    }
}

/// Classify a single decoded envelope. `None` means the envelope failed
/// validation without a recoverable id and is dropped silently.
fn classify(value: Value) -> Option<ParsedItem> {
    if !value.is_object() {
        return Some(ParsedItem::Invalid {
            error: invalid_request("expected an object"),
            id: None,
        });
    }

    let id = read_id(&value);

    if value.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        let id = match id {
            IdField::Usable(id) => Some(id),
            _ => None,
        };
        return Some(ParsedItem::Invalid {
            error: invalid_request("missing or mismatched jsonrpc version"),
            id,
        });
    }

    // An id alongside a result or error marks the envelope as the client's
    // answer to a server-originated request.
    if let IdField::Usable(id) = &id {
        let has_result = value.get("result").is_some();
        let error_field = value.get("error");
        if has_result || error_field.is_some() {
            let error = error_field.map(|e| {
                serde_json::from_value(e.clone()).unwrap_or_else(|_| {
                    JsonRpcError::new(
                        error_codes::INTERNAL_ERROR,
                        "malformed error object in client response",
                    )
                })
            });
            return Some(ParsedItem::ClientResponse {
                id: id.clone(),
                result: value.get("result").cloned(),
                error,
            });
        }
    }

    if matches!(id, IdField::Malformed) {
        return Some(ParsedItem::Invalid {
            error: invalid_request("id must be a string, number, or null"),
            id: None,
        });
    }

    let method = match value.get("method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => {
            return match id {
                IdField::Usable(id) => Some(ParsedItem::Invalid {
                    error: invalid_request("method must be a string"),
                    id: Some(id),
                }),
                _ => None,
            };
        }
    };

    let params = value.get("params").cloned();
    if let Some(p) = &params {
        if !p.is_object() && !p.is_array() {
            return match id {
                IdField::Usable(id) => Some(ParsedItem::Invalid {
                    error: invalid_request("params must be an array or object"),
                    id: Some(id),
                }),
                _ => None,
            };
        }
    }

    match id {
        IdField::Usable(id) => Some(ParsedItem::Request { method, params, id }),
        _ => Some(ParsedItem::Notification { method, params }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_value(value: Value) -> Parsed {
        parse(Ok(value))
    }

    #[test]
    fn decode_failure_yields_parse_error_with_null_id() {
        let parsed = parse(Err(DecodeError::new("unexpected token")));
        match parsed {
            Parsed::Single(ParsedItem::Invalid { error, id }) => {
                assert_eq!(error.code, -32700);
                assert!(id.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        match parse_value(json!([])) {
            Parsed::Single(ParsedItem::Invalid { error, id }) => {
                assert_eq!(error.code, -32600);
                assert!(id.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn request_and_notification_classification() {
        match parse_value(json!({"jsonrpc": "2.0", "method": "ping", "id": 1})) {
            Parsed::Single(ParsedItem::Request { method, id, .. }) => {
                assert_eq!(method, "ping");
                assert_eq!(id, RequestId::Number(1));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match parse_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})) {
            Parsed::Single(ParsedItem::Notification { method, .. }) => {
                assert_eq!(method, "notifications/initialized");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_echoes_id() {
        match parse_value(json!({"jsonrpc": "1.0", "method": "ping", "id": "x"})) {
            Parsed::Single(ParsedItem::Invalid { error, id }) => {
                assert_eq!(error.code, -32600);
                assert_eq!(id, Some(RequestId::String("x".into())));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn response_envelope_is_client_response() {
        match parse_value(json!({"jsonrpc": "2.0", "id": 42, "result": {"roots": []}})) {
            Parsed::Single(ParsedItem::ClientResponse { id, result, error }) => {
                assert_eq!(id, RequestId::Number(42));
                assert!(result.is_some());
                assert!(error.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
        match parse_value(json!({
            "jsonrpc": "2.0", "id": 43,
            "error": {"code": -1, "message": "no"}
        })) {
            Parsed::Single(ParsedItem::ClientResponse { error: Some(e), .. }) => {
                assert_eq!(e.code, -1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_id_is_invalid_without_echo() {
        match parse_value(json!({"jsonrpc": "2.0", "method": "ping", "id": {"a": 1}})) {
            Parsed::Single(ParsedItem::Invalid { error, id }) => {
                assert_eq!(error.code, -32600);
                assert!(id.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_method_with_id_is_reported_without_id_dropped() {
        match parse_value(json!({"jsonrpc": "2.0", "id": 9, "params": {}})) {
            // id + no result/error + no method
            Parsed::Single(ParsedItem::Invalid { id, .. }) => {
                assert_eq!(id, Some(RequestId::Number(9)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            parse_value(json!({"jsonrpc": "2.0", "params": {}})),
            Parsed::Empty
        ));
    }

    #[test]
    fn scalar_params_are_rejected() {
        match parse_value(json!({"jsonrpc": "2.0", "method": "m", "params": 5, "id": 1})) {
            Parsed::Single(ParsedItem::Invalid { id, .. }) => {
                assert_eq!(id, Some(RequestId::Number(1)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            parse_value(json!({"jsonrpc": "2.0", "method": "m", "params": 5})),
            Parsed::Empty
        ));
    }

    #[test]
    fn batch_drops_idless_failures() {
        let parsed = parse_value(json!([
            {"jsonrpc": "2.0", "method": "ping", "id": 1},
            {"jsonrpc": "2.0"},
            "not an envelope",
            {"jsonrpc": "2.0", "method": "notifications/initialized"}
        ]));
        match parsed {
            Parsed::Batch(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], ParsedItem::Request { .. }));
                assert!(matches!(items[1], ParsedItem::Notification { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn null_id_is_treated_as_absent() {
        match parse_value(json!({"jsonrpc": "2.0", "method": "m", "id": null})) {
            Parsed::Single(ParsedItem::Notification { method, .. }) => assert_eq!(method, "m"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
