//! DevTools wire types: the `/json/*` HTTP documents and the JSON-RPC
//! envelope spoken over a page WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::CdpEvent;

/// `GET /json/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

/// `PUT /json/new` and the entries of `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub target_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CdpCommand<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct CdpResponseError {
    pub code: i64,
    pub message: String,
}

/// A decoded page WebSocket frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Incoming {
    Response(CdpResponse),
    Event(CdpEvent),
}

/// Classifies a frame: messages carrying an `id` answer a command,
/// messages with only a `method` are events. Anything else is ignored.
pub(crate) fn parse_incoming(text: &str) -> Option<Incoming> {
    let json: Value = serde_json::from_str(text).ok()?;

    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(Incoming::Response(CdpResponse {
            id,
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }));
    }

    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(Incoming::Event(CdpEvent { method, params }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_serializes_as_json_rpc() {
        let cmd = CdpCommand {
            id: 7,
            method: "DOM.getOuterHTML",
            params: json!({ "nodeId": 1 }),
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            value,
            json!({ "id": 7, "method": "DOM.getOuterHTML", "params": { "nodeId": 1 } })
        );
    }

    #[test]
    fn parses_success_response() {
        let parsed = parse_incoming(r#"{"id":3,"result":{"frameId":"F"}}"#).unwrap();
        match parsed {
            Incoming::Response(resp) => {
                assert_eq!(resp.id, 3);
                assert_eq!(resp.result, Some(json!({ "frameId": "F" })));
                assert!(resp.error.is_none());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn parses_error_response() {
        let parsed =
            parse_incoming(r#"{"id":4,"error":{"code":-32000,"message":"No node with given id found"}}"#)
                .unwrap();
        let Incoming::Response(resp) = parsed else {
            panic!("expected response");
        };
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "No node with given id found");
    }

    #[test]
    fn parses_event_without_params() {
        let parsed = parse_incoming(r#"{"method":"Page.loadEventFired"}"#).unwrap();
        assert_eq!(
            parsed,
            Incoming::Event(CdpEvent {
                method: "Page.loadEventFired".to_string(),
                params: Value::Null,
            })
        );
    }

    #[test]
    fn ignores_garbage_and_unknown_shapes() {
        assert!(parse_incoming("not json").is_none());
        assert!(parse_incoming(r#"{"params":{}}"#).is_none());
    }

    #[test]
    fn target_info_deserializes_devtools_shape() {
        let target: TargetInfo = serde_json::from_value(json!({
            "description": "",
            "devtoolsFrontendUrl": "/devtools/inspector.html?ws=localhost:9222/devtools/page/ABC",
            "id": "ABC",
            "title": "about:blank",
            "type": "page",
            "url": "about:blank",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/ABC"
        }))
        .unwrap();
        assert_eq!(target.id, "ABC");
        assert_eq!(target.target_type, "page");
        assert_eq!(
            target.web_socket_debugger_url.as_deref(),
            Some("ws://localhost:9222/devtools/page/ABC")
        );
    }

    #[test]
    fn browser_version_deserializes_devtools_shape() {
        let version: BrowserVersion = serde_json::from_value(json!({
            "Browser": "HeadlessChrome/120.0.6099.109",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/xyz"
        }))
        .unwrap();
        assert_eq!(version.browser, "HeadlessChrome/120.0.6099.109");
        assert_eq!(version.protocol_version, "1.3");
    }
}
