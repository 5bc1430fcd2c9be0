//! Reachable address enumeration
//!
//! Order: localhost, hostname, `hostname.local` (mDNS), then every usable
//! IPv4 address bound to an interface that is up and not loopback. Failures
//! are never fatal; a partial list is still useful for pairing.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

/// One address bound to a local interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub ip: IpAddr,
    /// Interface is administratively up
    pub up: bool,
    pub loopback: bool,
}

impl InterfaceAddr {
    /// Address on an interface that is up and not loopback
    pub fn up(ip: impl Into<IpAddr>) -> Self {
        Self {
            ip: ip.into(),
            up: true,
            loopback: false,
        }
    }

    /// Address on an interface that is down
    pub fn down(ip: impl Into<IpAddr>) -> Self {
        Self {
            up: false,
            ..Self::up(ip)
        }
    }

    fn is_candidate(&self) -> bool {
        self.up && !self.loopback
    }
}

/// Local hostname, if the OS reports one
pub fn local_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => name.into_string().ok().filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Hostname lookup failed");
            None
        }
    }
}

/// Every IPv4 address bound to a local interface, with its interface flags
#[cfg(unix)]
pub fn interface_addrs() -> io::Result<Vec<InterfaceAddr>> {
    use std::net::SocketAddrV4;

    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;

    let addrs = getifaddrs().map_err(io::Error::from)?;
    Ok(addrs
        .filter_map(|ifa| {
            let sin = *ifa.address.as_ref()?.as_sockaddr_in()?;
            Some(InterfaceAddr {
                ip: IpAddr::V4(*SocketAddrV4::from(sin).ip()),
                up: ifa.flags.contains(InterfaceFlags::IFF_UP),
                loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
            })
        })
        .collect())
}

/// Every address bound to a local interface
///
/// Only operational adapters are reported here, so every entry counts as up.
#[cfg(not(unix))]
pub fn interface_addrs() -> io::Result<Vec<InterfaceAddr>> {
    Ok(if_addrs::get_if_addrs()?
        .into_iter()
        .map(|iface| InterfaceAddr {
            ip: iface.ip(),
            up: true,
            loopback: iface.is_loopback(),
        })
        .collect())
}

/// URLs this host is likely reachable at on `port`
pub fn local_urls(port: u16) -> Vec<String> {
    let hostname = local_hostname();
    let addrs = interface_addrs().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Network interface enumeration failed");
        Vec::new()
    });

    collect_urls(port, hostname.as_deref(), addrs)
}

/// Build the ordered, de-duplicated URL list from raw inputs
pub fn collect_urls(
    port: u16,
    hostname: Option<&str>,
    addrs: impl IntoIterator<Item = InterfaceAddr>,
) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    let mut add = |url: String| {
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    };

    add(format!("http://localhost:{}", port));

    if let Some(host) = hostname.map(str::trim).filter(|h| !h.is_empty()) {
        add(format!("http://{}:{}", host, port));
        add(format!("http://{}.local:{}", host, port));
    }

    for addr in addrs.into_iter().filter(InterfaceAddr::is_candidate) {
        if let IpAddr::V4(ip) = addr.ip {
            if is_usable_ipv4(&ip) {
                add(format!("http://{}:{}", ip, port));
            }
        }
    }

    urls
}

/// Private or globally routable unicast
fn is_usable_ipv4(ip: &Ipv4Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast())
}
