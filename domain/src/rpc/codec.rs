//! Line codec: one request or response per line of JSON.
//!
//! The codec is stateless. Encoders never emit a raw newline (compact JSON
//! escapes them inside strings), so a line is always a whole message.

use super::envelope::{
    ErrorCode, JSONRPC_VERSION, Method, Request, RequestId, Response, ResponseError,
};
use crate::core::error::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a request line could not be turned into a [`Request`].
///
/// Carries the request id when one could be recovered, so the server can
/// still correlate its error response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestDecodeError {
    #[error("malformed request: {reason}")]
    Malformed {
        id: Option<RequestId>,
        reason: String,
    },

    #[error("unsupported method '{method}'")]
    UnknownMethod { id: RequestId, method: String },

    #[error("request params must be an object")]
    InvalidParams { id: RequestId },
}

impl RequestDecodeError {
    /// Id to echo in the error response (`null` when none was recoverable).
    pub fn id(&self) -> RequestId {
        match self {
            RequestDecodeError::Malformed { id, .. } => id.clone().unwrap_or_else(RequestId::null),
            RequestDecodeError::UnknownMethod { id, .. }
            | RequestDecodeError::InvalidParams { id } => id.clone(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RequestDecodeError::Malformed { .. } => ErrorCode::MalformedRequest,
            RequestDecodeError::UnknownMethod { .. } => ErrorCode::MethodNotFound,
            RequestDecodeError::InvalidParams { .. } => ErrorCode::InvalidParams,
        }
    }

    /// The failure response the server writes for this error.
    pub fn to_response(&self) -> Response {
        Response::failure(self.id(), ResponseError::new(self.code(), self.to_string()))
    }
}

/// Outgoing request line.
#[derive(Serialize)]
struct RequestFrame<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    method: Method,
    params: &'a Map<String, Value>,
}

/// Outgoing response line. Exactly one of `result` and `error` is set.
#[derive(Serialize)]
struct ResponseFrame<'a> {
    id: &'a RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

/// Incoming request line, before validation.
#[derive(Deserialize)]
struct IncomingRequest {
    #[serde(default, deserialize_with = "present")]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
}

/// Incoming response line, before validation.
#[derive(Deserialize)]
struct IncomingResponse {
    #[serde(default, deserialize_with = "present")]
    id: Option<RequestId>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    error: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
}

/// A field that is present is `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub fn encode_request(request: &Request) -> String {
    serde_json::to_string(&RequestFrame {
        jsonrpc: JSONRPC_VERSION,
        id: &request.id,
        method: request.method,
        params: &request.params,
    })
    .unwrap_or_default()
}

pub fn encode_response(response: &Response) -> String {
    let frame = match &response.outcome {
        Ok(result) => ResponseFrame {
            id: &response.id,
            result: Some(result),
            error: None,
            code: None,
        },
        Err(error) => ResponseFrame {
            id: &response.id,
            result: None,
            error: Some(error.message.as_str()),
            code: error.code,
        },
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Parse one line as a JSON object and deserialize it into a frame.
///
/// Arrays are rejected up front; derived struct deserializers would
/// otherwise accept them positionally.
fn parse_frame<T: DeserializeOwned>(line: &str) -> Result<T, String> {
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(object @ Value::Object(_)) => {
            serde_json::from_value(object).map_err(|e| format!("invalid message: {}", e))
        }
        Ok(_) => Err("message must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

pub fn decode_request(line: &str) -> Result<Request, RequestDecodeError> {
    let frame: IncomingRequest =
        parse_frame(line).map_err(|reason| RequestDecodeError::Malformed { id: None, reason })?;

    let id = frame.id.ok_or_else(|| RequestDecodeError::Malformed {
        id: None,
        reason: "request must include id".to_string(),
    })?;

    let method = match frame.method.as_ref().and_then(Value::as_str).map(str::trim) {
        Some(method) if !method.is_empty() => method.to_string(),
        _ => {
            return Err(RequestDecodeError::Malformed {
                id: Some(id),
                reason: "request must include non-empty method".to_string(),
            });
        }
    };
    let method = match method.parse::<Method>() {
        Ok(method) => method,
        Err(_) => return Err(RequestDecodeError::UnknownMethod { id, method }),
    };

    let params = match frame.params {
        Some(Value::Object(params)) => params,
        None | Some(Value::Null) => Map::new(),
        Some(_) => return Err(RequestDecodeError::InvalidParams { id }),
    };

    Ok(Request { id, method, params })
}

pub fn decode_response(line: &str) -> Result<Response, TransportError> {
    let frame: IncomingResponse = parse_frame(line).map_err(TransportError::MalformedMessage)?;

    let id = frame
        .id
        .ok_or_else(|| TransportError::malformed("response must include id"))?;

    match (frame.result, frame.error) {
        (Some(_), Some(_)) => Err(TransportError::malformed(
            "response contains both result and error",
        )),
        (None, None) => Err(TransportError::malformed(
            "response contains neither result nor error",
        )),
        (Some(result), None) => Ok(Response::success(id, result)),
        (None, Some(error)) => {
            let message = match error {
                Value::String(s) => s,
                // JSON-RPC style error objects from foreign peers.
                Value::Object(obj) => match obj.get("message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => Value::Object(obj).to_string(),
                },
                other => other.to_string(),
            };
            let code = frame
                .code
                .as_ref()
                .and_then(Value::as_str)
                .and_then(ErrorCode::parse);
            Ok(Response::failure(id, ResponseError { message, code }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_is_single_line() {
        let mut params = Map::new();
        params.insert("summary".into(), json!("line one\nline two"));
        let request = Request::new(7, Method::ToolsCall, params);

        let line = encode_request(&request);
        assert!(!line.contains('\n'));

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "tools/call");
        assert_eq!(value["params"]["summary"], "line one\nline two");
    }

    #[test]
    fn test_decode_request_defaults_params() {
        let request = decode_request(r#"{"id": "a1", "method": "tools/list"}"#).unwrap();
        assert_eq!(request.id, RequestId::new(json!("a1")));
        assert_eq!(request.method, Method::ToolsList);
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_decode_request_without_id_is_malformed() {
        let err = decode_request(r#"{"method": "tools/list"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedRequest);
        assert_eq!(err.id(), RequestId::null());
    }

    #[test]
    fn test_decode_request_unknown_method_keeps_id() {
        let err = decode_request(r#"{"id": 3, "method": "tools/delete"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MethodNotFound);
        assert_eq!(err.id(), RequestId::from(3));

        let response = err.to_response();
        assert_eq!(response.id, RequestId::from(3));
        assert!(!response.is_success());
    }

    #[test]
    fn test_decode_request_rejects_non_object_params() {
        let err = decode_request(r#"{"id": 3, "method": "tools/call", "params": [1]}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);
    }

    #[test]
    fn test_decode_request_rejects_garbage() {
        assert!(decode_request("not json").is_err());
        assert!(decode_request("[1, 2]").is_err());
    }

    #[test]
    fn test_decode_response_success_with_null_result() {
        let response = decode_response(r#"{"id": 1, "result": null}"#).unwrap();
        assert_eq!(response.outcome, Ok(Value::Null));
    }

    #[test]
    fn test_null_id_is_present() {
        let request = decode_request(r#"{"id": null, "method": "tools/list"}"#).unwrap();
        assert_eq!(request.id, RequestId::null());

        let response = decode_response(r#"{"id": null, "error": "bad line"}"#).unwrap();
        assert_eq!(response.id, RequestId::null());
    }

    #[test]
    fn test_encode_response_success_keeps_null_result() {
        let line = encode_response(&Response::success(RequestId::from(4), Value::Null));
        assert_eq!(line, r#"{"id":4,"result":null}"#);
    }

    #[test]
    fn test_decode_response_failure_with_code() {
        let response =
            decode_response(r#"{"id": 1, "error": "nope", "code": "unknown_tool"}"#).unwrap();
        let error = response.outcome.unwrap_err();
        assert_eq!(error.message, "nope");
        assert_eq!(error.code, Some(ErrorCode::UnknownTool));
    }

    #[test]
    fn test_decode_response_accepts_jsonrpc_error_object() {
        let response =
            decode_response(r#"{"id": 1, "error": {"code": -32601, "message": "no such method"}}"#)
                .unwrap();
        let error = response.outcome.unwrap_err();
        assert_eq!(error.message, "no such method");
        assert_eq!(error.code, None);
    }

    #[test]
    fn test_decode_response_rejects_ambiguous_messages() {
        assert!(matches!(
            decode_response(r#"{"id": 1, "result": 1, "error": "x"}"#),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            decode_response(r#"{"id": 1}"#),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            decode_response(r#"{"result": 1}"#),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            decode_response("{"),
            Err(TransportError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_encode_response_failure_carries_code() {
        let response = Response::failure(
            RequestId::from(9),
            ResponseError::new(ErrorCode::Unauthorized, "denied"),
        );
        let value: Value = serde_json::from_str(&encode_response(&response)).unwrap();
        assert_eq!(value["id"], 9);
        assert_eq!(value["error"], "denied");
        assert_eq!(value["code"], "unauthorized");
        assert!(value.get("result").is_none());
    }
}
