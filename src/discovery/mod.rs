//! Local-network discovery and pairing
//!
//! Viewers on other devices need an address to reach the relay. This module
//! enumerates the URLs the relay is likely reachable at and renders one of
//! them as a scannable QR code.

pub mod addrs;
pub mod qr;

use serde::Serialize;

use crate::error::{RelayError, Result};
use crate::event::now_rfc3339;

pub use addrs::{collect_urls, interface_addrs, local_hostname, local_urls, InterfaceAddr};
pub use qr::{render_png, sanitize_target, DEFAULT_QR_SIZE};

/// Body of `GET /api/info`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryInfo {
    pub hostname: String,
    pub urls: Vec<String>,
    pub generated_at: String,
}

/// Discovery service bound to the relay's advertised port
#[derive(Debug, Clone)]
pub struct Discovery {
    port: u16,
    qr_size: u32,
}

impl Discovery {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            qr_size: DEFAULT_QR_SIZE,
        }
    }

    /// Set the rendered QR image size in pixels
    pub fn qr_size(mut self, size: u32) -> Self {
        self.qr_size = size;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Ordered, de-duplicated URLs this host can be reached at
    pub fn list_local_urls(&self) -> Vec<String> {
        local_urls(self.port)
    }

    /// Hostname plus reachable URLs, stamped with the current time
    pub fn info(&self) -> DiscoveryInfo {
        DiscoveryInfo {
            hostname: local_hostname().unwrap_or_default(),
            urls: self.list_local_urls(),
            generated_at: now_rfc3339(),
        }
    }

    /// Render a PNG QR code for `target`, or for the first discovered URL
    ///
    /// A blank target counts as absent.
    pub fn render_code(&self, target: Option<&str>) -> Result<Vec<u8>> {
        match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => {
                let url = sanitize_target(target)?;
                render_png(url.as_str(), self.qr_size)
            }
            None => {
                let first = self
                    .list_local_urls()
                    .into_iter()
                    .next()
                    .ok_or_else(|| RelayError::not_found("no LAN URLs found"))?;
                render_png(&first, self.qr_size)
            }
        }
    }
}
