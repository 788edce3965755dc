use crate::constants::{DEFAULT_IV, DEFAULT_KEY, DISCOVERY_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Default time to wait for a single response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default discovery collection window
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(3);

/// Protocol-wide settings shared by discovery and every device session.
///
/// The key, IV and port are fixed by the protocol. Every field can be
/// overridden to target a device on another address or port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Key used before authorization
    pub default_key: [u8; 16],
    /// CBC initialization vector used for every payload
    pub iv: [u8; 16],
    /// Destination port of the discovery probe
    pub discovery_port: u16,
    /// Destination address of the discovery probe
    pub broadcast_addr: Ipv4Addr,
    /// Local endpoint every exchange socket is bound to
    pub local_addr: SocketAddr,
    /// Bounded wait for a response datagram
    pub timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_key: DEFAULT_KEY,
            iv: DEFAULT_IV,
            discovery_port: DISCOVERY_PORT,
            broadcast_addr: Ipv4Addr::BROADCAST,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProtocolConfig {
    /// Config bound to a specific local address
    pub fn with_local_addr(local_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            ..Self::default()
        }
    }

    /// Builder-style override of the response timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style override of the discovery target
    pub fn broadcast(mut self, addr: Ipv4Addr, port: u16) -> Self {
        self.broadcast_addr = addr;
        self.discovery_port = port;
        self
    }

    /// Find the IPv4 address of the interface that routes to the internet.
    ///
    /// Connecting a UDP socket only selects a route; no packet is sent.
    pub async fn detect_local_ip() -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 53)).await.ok()?;
        match socket.local_addr().ok()?.ip() {
            IpAddr::V4(ip) => {
                debug!(%ip, "Detected local address");
                Some(ip)
            }
            IpAddr::V6(ip) => ip.to_ipv4_mapped(),
        }
    }
}
