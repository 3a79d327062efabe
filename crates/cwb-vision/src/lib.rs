//! Clinic waiting-room portal adapter.
//!
//! Resolves a clinic's public waiting-room page into the two tokens the
//! portal's status service needs (`vcode` and the portal id), then asks that
//! service which number is currently being served.

use std::{sync::OnceLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use cwb_core::{
    errors::Error,
    status::{RemoteStatus, StatusError, StatusSource},
    Result,
};

/// `RTime` placeholder the portal reports outside business hours.
pub const CLOSED_SENTINEL: &str = "XXXX";

/// Tokens scraped from a clinic's waiting-room page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalTokens {
    pub vcode: String,
    pub portal_id: String,
}

#[derive(Clone, Debug)]
pub struct VisionClient {
    endpoint: String,
    http: reqwest::Client,
}

impl VisionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// GET the waiting-room page and pull the status tokens out of it.
    pub async fn resolve(&self, target_url: &str) -> std::result::Result<PortalTokens, StatusError> {
        let resp = self
            .http
            .get(target_url)
            .header("Content-Type", "text/html; charset=utf-8")
            .send()
            .await
            .map_err(map_request_error)?;

        if !resp.status().is_success() {
            return Err(StatusError::Transport(format!(
                "waiting-room page returned {}",
                resp.status()
            )));
        }

        let html = resp.text().await.map_err(map_request_error)?;
        extract_tokens(&html)
    }

    /// POST the tokens to the status service and interpret the reply.
    pub async fn query(&self, tokens: &PortalTokens) -> std::result::Result<RemoteStatus, StatusError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/plain")
            .body(query_body(tokens))
            .send()
            .await
            .map_err(map_request_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StatusError::Transport(format!(
                "status service returned {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| StatusError::Data(format!("status json error: {e}")))?;
        parse_wait_info(&v)
    }
}

#[async_trait]
impl StatusSource for VisionClient {
    async fn fetch_status(&self, target_url: &str) -> std::result::Result<RemoteStatus, StatusError> {
        let tokens = self.resolve(target_url).await?;
        debug!(portal_id = %tokens.portal_id, "resolved waiting-room tokens");
        self.query(&tokens).await
    }
}

fn map_request_error(e: reqwest::Error) -> StatusError {
    if e.is_timeout() {
        return StatusError::Timeout;
    }
    if e.is_builder() {
        // reqwest rejects the URL before any I/O.
        return StatusError::Resolution(format!("invalid url: {e}"));
    }
    StatusError::Transport(e.to_string())
}

fn vcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<table\b[^>]*?\bvcode\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    })
}

fn portal_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"C__PortalID\s*=\s*'([^']+?)'").expect("valid regex"))
}

/// Pull `vcode` (from a `<table vcode="...">`) and the portal id (from a
/// `C__PortalID = '...'` script assignment) out of a waiting-room page.
pub fn extract_tokens(html: &str) -> std::result::Result<PortalTokens, StatusError> {
    let vcode = vcode_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StatusError::Resolution("page has no table[vcode]".to_string()))?;

    let portal_id = portal_id_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StatusError::Resolution("page has no C__PortalID".to_string()))?;

    Ok(PortalTokens { vcode, portal_id })
}

/// Request body understood by the status service.
///
/// The service expects this exact shape (note the unquoted `ReqFmt` key), so
/// it is written by hand rather than serialized.
pub fn query_body(tokens: &PortalTokens) -> String {
    format!(
        r#"{{"PortalID":"{}","Vcode":"{}",ReqFmt:"LIST"}}"#,
        escape_json_str(&tokens.portal_id),
        escape_json_str(&tokens.vcode)
    )
}

fn escape_json_str(s: &str) -> String {
    let quoted = serde_json::Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Interpret `Infos[0].RTime` from a status reply.
pub fn parse_wait_info(v: &serde_json::Value) -> std::result::Result<RemoteStatus, StatusError> {
    let rtime = v
        .get("Infos")
        .and_then(|infos| infos.get(0))
        .and_then(|info| info.get("RTime"))
        .ok_or_else(|| StatusError::Data("missing Infos[0].RTime".to_string()))?;

    let text = match rtime {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(StatusError::Data(format!("unexpected RTime value: {other}")));
        }
    };

    if text.is_empty() {
        return Err(StatusError::Data("empty RTime".to_string()));
    }
    if text == CLOSED_SENTINEL {
        return Ok(RemoteStatus::Closed);
    }

    // Leading digits only, the way the portal's own page reads the field.
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<u32>()
        .map(RemoteStatus::Serving)
        .map_err(|_| StatusError::Data(format!("non-numeric RTime: {text}")))
}
