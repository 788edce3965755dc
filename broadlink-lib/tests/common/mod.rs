//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use broadlink_lib::constants::{DEFAULT_IV, DEFAULT_KEY};
#[allow(unused_imports)]
pub use broadlink_lib::crypto;
#[allow(unused_imports)]
pub use broadlink_lib::error::BLError;
#[allow(unused_imports)]
pub use broadlink_lib::packet::{CommandCode, ControlCode, Packet, build_command_packet, checksum};
#[allow(unused_imports)]
pub use broadlink_lib::signal::{LearnedSignal, SignalType};
#[allow(unused_imports)]
pub use broadlink_lib::{Device, DeviceKind, DeviceRecord, ProtocolConfig};
#[allow(unused_imports)]
pub use bytes::Bytes;

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Device id handed out by the simulated device
#[allow(dead_code)]
pub const SIM_DEVICE_ID: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

/// Session key handed out by the simulated device
#[allow(dead_code)]
pub const SIM_SESSION_KEY: [u8; 16] = [0u8; 16];

#[allow(dead_code)]
pub const SIM_MAC: [u8; 6] = [0x34, 0xea, 0x34, 0xb4, 0x0a, 0x01];

/// Learned-signal bytes (type, repeat, length, pulses) returned by the simulated device
#[allow(dead_code)]
pub const SIM_SIGNAL: &[u8] = &[0x26, 0x00, 0x08, 0x00, 0x9a, 0x4d, 0x13, 0x13, 0x00, 0x0d, 0x05, 0x13];

/// Route library logs to the test output. Set `RUST_LOG=debug` to see datagrams.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing every socket at localhost with a short timeout
#[allow(dead_code)]
pub fn local_config() -> ProtocolConfig {
    ProtocolConfig::with_local_addr("127.0.0.1:0".parse().unwrap()).timeout(Duration::from_millis(500))
}

/// Build a device response: 56-byte header plus `payload` encrypted with `key`.
#[allow(dead_code)]
pub fn response_packet(command: u16, error_code: u16, payload: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let mut packet = vec![0u8; 0x38];
    packet[0x00..0x08].copy_from_slice(&[0x5a, 0xa5, 0xaa, 0x55, 0x5a, 0xa5, 0xaa, 0x55]);
    packet[0x22..0x24].copy_from_slice(&error_code.to_le_bytes());
    packet[0x26..0x28].copy_from_slice(&command.to_le_bytes());
    packet[0x34..0x36].copy_from_slice(&checksum(payload).to_le_bytes());
    packet.extend_from_slice(&crypto::encrypt(payload, key, &DEFAULT_IV));
    let sum = checksum(&packet);
    packet[0x20..0x22].copy_from_slice(&sum.to_le_bytes());
    packet
}

/// Discovery response announcing `device_type` and `mac`
#[allow(dead_code)]
pub fn discovery_response(device_type: u16, mac: [u8; 6]) -> Vec<u8> {
    let mut response = vec![0u8; 0x80];
    response[0x34..0x36].copy_from_slice(&device_type.to_le_bytes());
    response[0x3a..0x40].copy_from_slice(&mac);
    response
}

/// Handler behaving like an RM device: authorizes, reports 23.5 °C and
/// returns [`SIM_SIGNAL`] as the learned signal.
#[allow(dead_code)]
pub fn rm_handler(request: &[u8]) -> Option<Vec<u8>> {
    let packet = Packet::try_from(Bytes::copy_from_slice(request)).ok()?;
    match packet.command() {
        CommandCode::Authorize => {
            let mut payload = Vec::new();
            payload.extend_from_slice(&SIM_DEVICE_ID);
            payload.extend_from_slice(&SIM_SESSION_KEY);
            Some(response_packet(0x3e9, 0, &payload, &DEFAULT_KEY))
        }
        CommandCode::Control => {
            let plaintext = packet.decrypt(&SIM_SESSION_KEY, &DEFAULT_IV).ok()?;
            match ControlCode::from(*plaintext.first()?) {
                ControlCode::ReadTemperature => {
                    let payload = [0x01, 0, 0, 0, 23, 5, 0, 0];
                    Some(response_packet(0x3ee, 0, &payload, &SIM_SESSION_KEY))
                }
                ControlCode::ReadLearned => {
                    let mut payload = vec![0x04, 0, 0, 0];
                    payload.extend_from_slice(SIM_SIGNAL);
                    Some(response_packet(0x3ee, 0, &payload, &SIM_SESSION_KEY))
                }
                _ => None,
            }
        }
        CommandCode::Unknown(_) => None,
    }
}

/// A device simulated on a localhost UDP socket.
///
/// Every datagram it receives is forwarded to `received`; the handler
/// decides whether to answer.
#[allow(dead_code)]
pub struct SimulatedDevice {
    pub addr: SocketAddr,
    pub received: mpsc::UnboundedReceiver<Vec<u8>>,
    task: JoinHandle<()>,
}

#[allow(dead_code)]
impl SimulatedDevice {
    pub async fn spawn<F>(mut handler: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        init_tracing();
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind simulated device");
        let addr = socket.local_addr().expect("local addr");
        let (tx, received) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                let request = buf[..len].to_vec();
                let response = handler(&request);
                let _ = tx.send(request);
                if let Some(response) = response {
                    let _ = socket.send_to(&response, from).await;
                }
            }
        });

        Self { addr, received, task }
    }

    /// An RM Mini at this simulated address
    pub fn device(&self, config: ProtocolConfig) -> Device {
        Device::new(DeviceRecord::new(self.addr, 0x2737, SIM_MAC), config)
    }

    /// Next datagram the device received
    pub async fn next_request(&mut self) -> Vec<u8> {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .expect("simulated device received nothing")
            .expect("simulated device stopped")
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}
