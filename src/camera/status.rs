//! Camera web-stream status

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::url::resolve_stream_url;

/// Last known state of the camera's web stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStreamStatus {
    pub enabled: bool,

    /// Resolved displayable URL; always `None` while disabled
    pub stream_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Camera fields carried by a status response or update event.
///
/// `None` means the field was missing or not validly typed, in which case
/// the previous value is retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraUpdate {
    pub enabled: Option<bool>,
    pub frame_rate: Option<u32>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub stream_url: Option<String>,
}

impl CameraUpdate {
    /// Decode from either the REST body (`frameRate`, `streamUrl`) or the
    /// event payload (`frame_rate`)
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let frame_rate = payload
            .get("frameRate")
            .and_then(parse_frame_rate)
            .or_else(|| payload.get("frame_rate").and_then(parse_frame_rate));

        Self {
            enabled: payload.get("enabled").and_then(Value::as_bool),
            frame_rate,
            port: payload.get("port").and_then(parse_port),
            path: payload
                .get("path")
                .and_then(Value::as_str)
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            stream_url: payload
                .get("streamUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl CameraStreamStatus {
    /// Merge an update over the previous status, filling missing fields from
    /// the previous value and recomputing the stream URL
    pub fn merged(previous: Option<&CameraStreamStatus>, update: &CameraUpdate, page: &Url) -> Self {
        let enabled = update
            .enabled
            .or(previous.map(|p| p.enabled))
            .unwrap_or(false);
        let frame_rate = update.frame_rate.or(previous.and_then(|p| p.frame_rate));
        let port = update.port.or(previous.and_then(|p| p.port));
        let path = update
            .path
            .clone()
            .or_else(|| previous.and_then(|p| p.path.clone()));

        let stream_url = resolve_stream_url(
            enabled,
            update.stream_url.as_deref(),
            port,
            path.as_deref(),
            page,
        );

        Self {
            enabled,
            stream_url,
            frame_rate,
            port,
            path,
        }
    }
}

/// Port as a number or numeric string in 1..=65535
fn parse_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0)? as u64,
        },
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(port).ok().filter(|p| *p != 0)
}

fn parse_frame_rate(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    match n.as_u64() {
        Some(v) => u32::try_from(v).ok(),
        None => {
            let f = n.as_f64()?;
            (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64)
                .then_some(f as u32)
        }
    }
}
