// src/surface/bridge.rs
//
// Adapter for the live app: a small bridge script inside the browser session
// exposes the page's DOM over HTTP. One call = one JSON request/response.
//
//   → {"op":"query","scope":17,"selector":".leg"}
//   ← {"ok":true,"handles":[21,22,23]}
//
// Handles are whatever ids the bridge assigns to DOM nodes; we never
// interpret them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Handle, Slot, Surface, SurfaceError};
use crate::config::consts::{BRIDGE_PATH, BRIDGE_TIMEOUT_MS};
use crate::config::options::SelectorMap;
use crate::core::net;

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Query { scope: Option<u64>, selector: &'a str },
    Text { handle: u64 },
    Trigger { handle: u64 },
    Restore,
}

#[derive(Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    handles: Vec<u64>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    error: Option<String>,
}

pub struct BridgeSurface {
    host: String,
    port: u16,
    selectors: SelectorMap,
    timeout: Duration,
}

impl BridgeSurface {
    pub fn new(host: impl Into<String>, port: u16, selectors: SelectorMap) -> Self {
        Self {
            host: host.into(),
            port,
            selectors,
            timeout: Duration::from_millis(BRIDGE_TIMEOUT_MS),
        }
    }

    /// Parse "host:port".
    pub fn from_addr(addr: &str, selectors: SelectorMap) -> Result<Self, SurfaceError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| SurfaceError::Transport(format!("expected host:port, got '{addr}'")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| SurfaceError::Transport(format!("bad port in '{addr}'")))?;
        Ok(Self::new(host, port, selectors))
    }

    fn call(&self, req: &Request<'_>) -> Result<Response, SurfaceError> {
        let body = serde_json::to_string(req).map_err(|e| SurfaceError::Protocol(e.to_string()))?;
        let raw = net::http_post_json(&self.host, self.port, BRIDGE_PATH, &body, self.timeout)?;
        let resp: Response = serde_json::from_str(&raw)
            .map_err(|e| SurfaceError::Protocol(format!("{e}: {}", raw.chars().take(120).collect::<String>())))?;
        if !resp.ok {
            let msg = resp.error.unwrap_or_else(|| s!("bridge reported failure"));
            return Err(SurfaceError::Protocol(msg));
        }
        Ok(resp)
    }

    fn select(&self, scope: Option<Handle>, selector: &str) -> Result<Vec<Handle>, SurfaceError> {
        let resp = self.call(&Request::Query { scope: scope.map(|h| h.0), selector })?;
        Ok(resp.handles.into_iter().map(Handle).collect())
    }
}

impl Surface for BridgeSurface {
    fn query(&self, scope: Option<Handle>, slot: Slot) -> Result<Vec<Handle>, SurfaceError> {
        self.select(scope, self.selectors.css(slot))
    }

    fn text(&self, handle: Handle) -> Result<String, SurfaceError> {
        Ok(self.call(&Request::Text { handle: handle.0 })?.text)
    }

    fn trigger(&self, handle: Handle) -> Result<(), SurfaceError> {
        self.call(&Request::Trigger { handle: handle.0 }).map(|_| ())
    }

    fn open_panels(&self) -> Result<Vec<Handle>, SurfaceError> {
        // One selector list keeps document order across both panel kinds.
        let union = join!(self.selectors.css(Slot::DayPanel), ", ", self.selectors.css(Slot::CrewPanel));
        self.select(None, &union)
    }

    fn restore(&self) -> Result<(), SurfaceError> {
        self.call(&Request::Restore).map(|_| ())
    }
}
