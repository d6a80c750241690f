use serde::{Deserialize, Serialize};

/// A single HTTP header as HAR represents it: a flat name/value pair, not
/// the ordered-list-of-tuples shape the event pipeline uses internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    pub mime_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,
    pub headers: Vec<NameValue>,
    #[serde(default)]
    pub query_string: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
    pub headers_size: i64,
    pub body_size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub size: i64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    pub status: u16,
    pub status_text: String,
    pub http_version: String,
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,
    pub headers: Vec<NameValue>,
    pub content: Content,
    pub redirect_url: String,
    pub headers_size: i64,
    pub body_size: i64,
}

/// One recorded request/response exchange, per HAR 1.2 §entries (spec.md
/// §6's archive file format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub started_date_time: String,
    pub time: f64,
    pub request: HarRequest,
    pub response: HarResponse,
}

impl HarRequest {
    /// Builds the request side of an entry for a JSON body, forcing
    /// `stream: false` into the serialized text per spec.md §6 ("Request's
    /// `postData.text` is the JSON body with `stream:false`").
    pub fn json(method: impl Into<String>, url: impl Into<String>, headers: Vec<NameValue>, body: &serde_json::Value) -> Self {
        let text = serde_json::to_string(body).unwrap_or_default();
        Self {
            method: method.into(),
            url: url.into(),
            http_version: "HTTP/1.1".to_string(),
            cookies: Vec::new(),
            headers,
            query_string: Vec::new(),
            post_data: Some(PostData { mime_type: "application/json".to_string(), text: text.clone() }),
            headers_size: -1,
            body_size: text.len() as i64,
        }
    }
}

impl HarResponse {
    /// Builds the response side of a synthesized entry: status/headers
    /// normalized to `application/json`, `content.text` the reconstructed
    /// complete message (spec.md §6).
    pub fn json(status: u16, headers: Vec<NameValue>, body: &serde_json::Value) -> Self {
        let text = serde_json::to_string(body).unwrap_or_default();
        Self {
            status,
            status_text: status_text(status).to_string(),
            http_version: "HTTP/1.1".to_string(),
            cookies: Vec::new(),
            headers,
            content: Content { size: text.len() as i64, mime_type: "application/json".to_string(), text: Some(text.clone()) },
            redirect_url: String::new(),
            headers_size: -1,
            body_size: text.len() as i64,
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
