use crate::config::ProtocolConfig;
use crate::constants::{AUTH_PAYLOAD_SIZE, CONTROL_HEADER_SIZE, CONTROL_PAYLOAD_SIZE, MAX_DATAGRAM_SIZE};
use crate::device::{DeviceKind, DeviceRecord};
use crate::error::BLError;
use crate::packet::{CommandCode, ControlCode, Packet, build_command_packet};
use crate::signal::LearnedSignal;
use crate::util::fill_from;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Build the 80-byte authorization payload.
///
/// The hostname is written twice as ASCII, truncated to each range, with
/// every non-ASCII character replaced by `?`. The two `0x01` markers at
/// 0x13 and 0x2d are required by the device.
pub fn build_auth_payload(hostname: &str) -> [u8; AUTH_PAYLOAD_SIZE] {
    let mut payload = [0u8; AUTH_PAYLOAD_SIZE];
    let name: Vec<u8> = hostname
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    fill_from(&name, &mut payload, 0x04, 0x12);
    payload[0x13] = 0x01;
    payload[0x2d] = 0x01;
    fill_from(&name, &mut payload, 0x30, AUTH_PAYLOAD_SIZE - 1);
    payload
}

/// 16-byte control payload selecting a sub-command
pub fn build_control_payload(code: ControlCode) -> [u8; CONTROL_PAYLOAD_SIZE] {
    let mut payload = [0u8; CONTROL_PAYLOAD_SIZE];
    payload[0] = code.into();
    payload
}

/// Payload replaying `signal_bytes` (the output of [`LearnedSignal::to_bytes`])
pub fn build_send_payload(signal_bytes: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8; CONTROL_HEADER_SIZE];
    payload[0] = ControlCode::SendSignal.into();
    payload.extend_from_slice(signal_bytes);
    payload
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// A session with one device.
///
/// Every request/response exchange takes `&mut self`, so at most one
/// exchange is in flight per device.
pub struct Device {
    record: DeviceRecord,
    config: ProtocolConfig,
}

impl Device {
    pub fn new(record: DeviceRecord, config: ProtocolConfig) -> Self {
        Self { record, config }
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn kind(&self) -> DeviceKind {
        self.record.kind()
    }

    pub fn is_authorized(&self) -> bool {
        self.record.is_authorized()
    }

    pub fn into_record(self) -> DeviceRecord {
        self.record
    }

    /// Obtain the device id and session key.
    ///
    /// Must succeed before any other exchange. The request and its response
    /// are encrypted with the default key.
    pub async fn authorize(&mut self) -> Result<([u8; 4], [u8; 16]), BLError> {
        let payload = build_auth_payload(&local_hostname());
        let key = self.config.default_key;

        let response = self.transact(CommandCode::Authorize, &payload, key).await?;
        let plaintext = Packet::try_from(response)?.decrypt(&key, &self.config.iv)?;
        if plaintext.len() < 0x14 {
            return Err(BLError::InsufficientData {
                expected: 0x14,
                actual: plaintext.len(),
            });
        }

        let device_id: [u8; 4] = plaintext[0x00..0x04].try_into()?;
        let session_key: [u8; 16] = plaintext[0x04..0x14].try_into()?;
        self.record.set_credentials(device_id, session_key);

        info!(device = %self.record, id = hex::encode(device_id), "Authorized");
        Ok((device_id, session_key))
    }

    /// Send a command and wait for the encrypted response.
    pub async fn exchange(&mut self, command: CommandCode, payload: &[u8]) -> Result<Bytes, BLError> {
        let key = self.session_key()?;
        self.transact(command, payload, key).await
    }

    /// Send a command and return immediately without waiting for a response.
    pub async fn send(&mut self, command: CommandCode, payload: &[u8]) -> Result<(), BLError> {
        let key = self.session_key()?;
        let packet = build_command_packet(command, payload, &self.record, &key, &self.config.iv);
        let socket = self.bind().await?;
        self.send_packet(&socket, &packet).await
    }

    /// Send a command and decrypt the response payload with the session key.
    pub async fn request(&mut self, command: CommandCode, payload: &[u8]) -> Result<Vec<u8>, BLError> {
        let key = self.session_key()?;
        let response = self.transact(command, payload, key).await?;
        Packet::try_from(response)?.decrypt(&key, &self.config.iv)
    }

    /// Remote-control operations, available on RM devices only
    pub fn remote(&mut self) -> Result<RemoteControl<'_>, BLError> {
        match self.record.kind() {
            DeviceKind::RemoteControl => Ok(RemoteControl { device: self }),
            DeviceKind::General => Err(BLError::Unsupported {
                device_type: self.record.device_type(),
            }),
        }
    }

    fn session_key(&self) -> Result<[u8; 16], BLError> {
        match (self.record.device_id(), self.record.key()) {
            (Some(_), Some(key)) => Ok(key),
            _ => Err(BLError::NotAuthorized),
        }
    }

    async fn bind(&self) -> Result<UdpSocket, BLError> {
        Ok(UdpSocket::bind(self.config.local_addr).await?)
    }

    async fn send_packet(&mut self, socket: &UdpSocket, packet: &[u8]) -> Result<(), BLError> {
        debug!(to = %self.record.addr(), count = self.record.packet_count(), bytes = hex::encode(packet), "UDP send");
        socket.send_to(packet, self.record.addr()).await?;
        self.record.advance_count();
        Ok(())
    }

    /// One request, one response datagram, on a socket dropped at the end.
    async fn transact(&mut self, command: CommandCode, payload: &[u8], key: [u8; 16]) -> Result<Bytes, BLError> {
        let packet = build_command_packet(command, payload, &self.record, &key, &self.config.iv);
        let socket = self.bind().await?;
        self.send_packet(&socket, &packet).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = timeout(self.config.timeout, socket.recv_from(&mut buf)).await??;
        if from != self.record.addr() {
            warn!(%from, expected = %self.record.addr(), "Response from unexpected address");
        }
        buf.truncate(len);
        debug!(%from, bytes = hex::encode(&buf), "UDP recv");
        Ok(Bytes::from(buf))
    }
}

/// Remote-control view of an authorized RM device.
pub struct RemoteControl<'a> {
    device: &'a mut Device,
}

impl RemoteControl<'_> {
    /// Put the device in learning mode. It captures the next IR/RF burst.
    pub async fn enter_learning(&mut self) -> Result<(), BLError> {
        let payload = build_control_payload(ControlCode::EnterLearning);
        self.device.send(CommandCode::Control, &payload).await
    }

    /// Fetch the captured signal. This also ends learning mode.
    pub async fn read_learned(&mut self) -> Result<LearnedSignal, BLError> {
        let payload = build_control_payload(ControlCode::ReadLearned);
        let plaintext = self.device.request(CommandCode::Control, &payload).await?;
        let signal = LearnedSignal::from_response(&plaintext)?;
        info!(
            signal_type = %signal.signal_type,
            repeat = signal.repeat,
            bytes = signal.raw.len(),
            "Learned signal"
        );
        Ok(signal)
    }

    pub async fn send_signal(&mut self, signal: &LearnedSignal) -> Result<(), BLError> {
        self.send_raw(&signal.to_bytes()?).await
    }

    /// Replay signal bytes as stored in a command library
    pub async fn send_raw(&mut self, signal_bytes: &[u8]) -> Result<(), BLError> {
        let payload = build_send_payload(signal_bytes);
        self.device.send(CommandCode::Control, &payload).await
    }

    /// Temperature in degrees Celsius
    pub async fn read_temperature(&mut self) -> Result<f32, BLError> {
        let payload = build_control_payload(ControlCode::ReadTemperature);
        let plaintext = self.device.request(CommandCode::Control, &payload).await?;
        if plaintext.len() < 6 {
            return Err(BLError::InsufficientData {
                expected: 6,
                actual: plaintext.len(),
            });
        }
        Ok(plaintext[4] as f32 + plaintext[5] as f32 / 10.0)
    }
}
