//! Gateway WebSocket protocol types (connect, skill operations).

use serde::{Deserialize, Serialize};

/// Wire request: `{ "type": "req", "id", "method", "params" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsRequest {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Wire response: `{ "type": "res", "id", "ok", "payload" or "error" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsResponse {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client connect params (subset needed for handshake).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: Option<u32>,
    pub max_protocol: Option<u32>,
    #[serde(default)]
    pub client: ConnectClient,
    #[serde(default)]
    pub auth: ConnectAuth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectClient {
    pub id: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAuth {
    pub token: Option<String>,
}

/// Server hello-ok payload after successful connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloOk {
    #[serde(rename = "type")]
    pub typ: String,
    pub protocol: u32,
}

/// Params for WS method "skills.describe".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeParams {
    pub skill_name: String,
}

/// Params for WS method "skills.run": script name may omit the extension;
/// argv is passed to the script verbatim; stdin is piped when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub skill_name: String,
    pub script_name: String,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(default)]
    pub stdin: Option<String>,
}

impl WsResponse {
    pub fn ok(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            typ: "res".to_string(),
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            typ: "res".to_string(),
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_params_default_argv_and_stdin() {
        let params: RunParams =
            serde_json::from_str(r#"{"skillName": "cal", "scriptName": "main"}"#).unwrap();
        assert_eq!(params.skill_name, "cal");
        assert_eq!(params.script_name, "main");
        assert!(params.argv.is_empty());
        assert!(params.stdin.is_none());
    }

    #[test]
    fn response_frames_omit_unused_fields() {
        let ok = serde_json::to_value(WsResponse::ok("1", serde_json::json!({"x": 1}))).unwrap();
        assert_eq!(ok["type"], "res");
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(WsResponse::err("2", "Skill not found: cal")).unwrap();
        assert_eq!(err["error"], "Skill not found: cal");
        assert!(err.get("payload").is_none());
    }
}
