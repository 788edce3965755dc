use crate::config::ProtocolConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::device::DeviceRecord;
use crate::error::BLError;
use crate::packet::{DiscoveryResponse, build_discovery_probe, standard_offset};
use crate::session::Device;
use chrono::{Datelike, Local};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

/// Broadcast a discovery probe and collect the devices that answer.
///
/// Waits for the whole `window` unless `stop_after_first` is set, in which
/// case it returns as soon as one device has answered. No answers is not an
/// error.
pub async fn discover(
    config: &ProtocolConfig,
    window: Duration,
    stop_after_first: bool,
) -> Result<Vec<Device>, BLError> {
    let socket = UdpSocket::bind(config.local_addr).await?;
    socket.set_broadcast(true)?;

    let local = probe_source(&socket).await?;
    let now = Local::now();
    let probe = build_discovery_probe(local, &now.fixed_offset(), standard_offset(&Local, now.year()));
    let target = SocketAddrV4::new(config.broadcast_addr, config.discovery_port);

    debug!(%target, %local, bytes = hex::encode(probe), "Sending discovery probe");
    socket.send_to(&probe, target).await?;

    let deadline = Instant::now() + window;
    let mut devices: Vec<Device> = Vec::new();
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let (len, from) = match timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => break,
        };

        let response = match DiscoveryResponse::try_from(&buf[..len]) {
            Ok(response) => response,
            Err(e) => {
                warn!(%from, "Ignoring malformed discovery response: {e}");
                continue;
            }
        };
        if devices.iter().any(|d| d.record().addr() == from) {
            debug!(%from, "Duplicate discovery response");
            continue;
        }

        let record = DeviceRecord::new(from, response.device_type, response.mac);
        info!(device = %record, kind = %record.kind(), "Discovered device");
        devices.push(Device::new(record, config.clone()));

        if stop_after_first {
            break;
        }
    }

    info!("Discovery finished, {} device(s) found", devices.len());
    Ok(devices)
}

/// Address announced in the probe: the bound socket, with an unspecified
/// IP replaced by the detected outward-facing one.
async fn probe_source(socket: &UdpSocket) -> Result<SocketAddrV4, BLError> {
    let bound = socket.local_addr()?;
    let ip = match bound {
        SocketAddr::V4(v4) if !v4.ip().is_unspecified() => *v4.ip(),
        SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
            Some(ip) => ip,
            None => {
                return Err(BLError::Argument(format!(
                    "discovery needs an IPv4 local address, got {}",
                    IpAddr::V6(*v6.ip())
                )));
            }
        },
        _ => ProtocolConfig::detect_local_ip().await.unwrap_or(Ipv4Addr::UNSPECIFIED),
    };
    Ok(SocketAddrV4::new(ip, bound.port()))
}
