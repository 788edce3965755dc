use crate::constants::{
    CHECKSUM_SEED, COMMAND_HEADER_SIZE, DISCOVERY_COMMAND, DISCOVERY_PROBE_SIZE, DISCOVERY_RESPONSE_MIN_SIZE,
    HEADER_DEVICE_TAG, PACKET_MAGIC,
};
use crate::crypto;
use crate::device::DeviceRecord;
use crate::error::BLError;
use crate::util::{read_u16_le, slice_inclusive};
use bytes::Bytes;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::net::SocketAddrV4;
use zerocopy::byteorder::little_endian::{I32, U16};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Command codes carried at 0x26 of the packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum CommandCode {
    Authorize = 0x0065,
    Control = 0x006a,

    #[num_enum(catch_all)]
    Unknown(u16),
}

/// Sub-command selected by the first byte of a control payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum ControlCode {
    ReadTemperature = 0x01,
    SendSignal = 0x02,
    EnterLearning = 0x03,
    ReadLearned = 0x04,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// The 56-byte header that precedes every encrypted payload.
///
/// Requests and responses share the layout; `error_code` is only set by
/// the device.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommandHeader {
    pub magic: [u8; 8],        // 0x00
    pub reserved0: [u8; 24],   // 0x08
    pub checksum: U16,         // 0x20, whole packet
    pub error_code: U16,       // 0x22
    pub device_tag: U16,       // 0x24
    pub command: U16,          // 0x26
    pub count: U16,            // 0x28
    pub mac: [u8; 6],          // 0x2a
    pub device_id: [u8; 4],    // 0x30
    pub payload_checksum: U16, // 0x34, plaintext payload
    pub reserved1: [u8; 2],    // 0x36
}

/// Rolling checksum used for payloads, whole packets and discovery probes.
///
/// `(0xBEAF + sum of all bytes) & 0xFFFF`
pub fn checksum(buf: &[u8]) -> u16 {
    buf.iter().fold(CHECKSUM_SEED, |acc, &b| acc.wrapping_add(b as u16))
}

/// Build a command packet for `device`.
///
/// The plaintext `payload` is checksummed, encrypted with `key` and `iv`
/// and appended to the header. The device's packet counter is written as-is;
/// advancing it is up to the caller once the packet has been sent.
pub fn build_command_packet(
    command: CommandCode,
    payload: &[u8],
    device: &DeviceRecord,
    key: &[u8; 16],
    iv: &[u8; 16],
) -> Vec<u8> {
    let mut header = CommandHeader::new_zeroed();
    header.magic = PACKET_MAGIC;
    header.device_tag = U16::new(HEADER_DEVICE_TAG);
    header.command = U16::new(command.into());
    header.count = U16::new(device.packet_count());
    header.mac = device.mac();
    header.device_id = device.device_id().unwrap_or([0u8; 4]);
    header.payload_checksum = U16::new(checksum(payload));

    let ciphertext = crypto::encrypt(payload, key, iv);

    let mut packet = Vec::with_capacity(COMMAND_HEADER_SIZE + ciphertext.len());
    packet.extend_from_slice(header.as_bytes());
    packet.extend_from_slice(&ciphertext);

    let sum = checksum(&packet);
    packet[0x20..0x22].copy_from_slice(&sum.to_le_bytes());
    packet
}

/// A command packet (request or response) split into header and ciphertext.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    raw: Bytes,
}

impl Packet {
    pub fn header(&self) -> CommandHeader {
        // length was checked in try_from
        CommandHeader::read_from_prefix(self.raw.as_ref())
            .map(|(header, _)| header)
            .unwrap_or_else(|_| CommandHeader::new_zeroed())
    }

    pub fn command(&self) -> CommandCode {
        CommandCode::from_primitive(self.header().command.get())
    }

    pub fn error_code(&self) -> u16 {
        self.header().error_code.get()
    }

    pub fn count(&self) -> u16 {
        self.header().count.get()
    }

    /// Encrypted payload starting at 0x38
    pub fn ciphertext(&self) -> Bytes {
        self.raw.slice(COMMAND_HEADER_SIZE..)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the checksum at 0x20 matches the packet contents.
    pub fn checksum_valid(&self) -> bool {
        let mut copy = self.raw.to_vec();
        copy[0x20] = 0;
        copy[0x21] = 0;
        checksum(&copy) == self.header().checksum.get()
    }

    /// Decrypt the payload after checking the device error code.
    ///
    /// A non-zero error code is returned as [`BLError::DeviceError`] and the
    /// payload is left untouched.
    pub fn decrypt(&self, key: &[u8; 16], iv: &[u8; 16]) -> Result<Vec<u8>, BLError> {
        let code = self.error_code();
        if code != 0 {
            return Err(BLError::DeviceError { code });
        }
        crypto::decrypt(&self.ciphertext(), key, iv)
    }

    /// Decrypt the payload and verify the plaintext checksum at 0x34.
    ///
    /// Zero padding added by the cipher does not change the sum.
    pub fn payload_checksum_valid(&self, key: &[u8; 16], iv: &[u8; 16]) -> bool {
        match crypto::decrypt(&self.ciphertext(), key, iv) {
            Ok(plaintext) => checksum(&plaintext) == self.header().payload_checksum.get(),
            Err(_) => false,
        }
    }
}

impl TryFrom<Bytes> for Packet {
    type Error = BLError;

    fn try_from(raw: Bytes) -> Result<Self, Self::Error> {
        if raw.len() < COMMAND_HEADER_SIZE {
            return Err(BLError::InsufficientData {
                expected: COMMAND_HEADER_SIZE,
                actual: raw.len(),
            });
        }
        Ok(Self { raw })
    }
}

impl From<Packet> for Bytes {
    fn from(packet: Packet) -> Self {
        packet.raw
    }
}

/// The 48-byte discovery probe broadcast to find devices.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DiscoveryProbe {
    pub reserved0: [u8; 8], // 0x00
    pub tz_offset: I32,     // 0x08, hours from UTC
    pub year: U16,          // 0x0c
    pub minute: u8,         // 0x0e
    pub hour: u8,           // 0x0f
    pub year_short: u8,     // 0x10
    pub weekday: u8,        // 0x11, Sunday = 0
    pub day: u8,            // 0x12
    pub month: u8,          // 0x13
    pub reserved1: [u8; 4], // 0x14
    pub local_ip: [u8; 4],  // 0x18
    pub local_port: U16,    // 0x1c
    pub reserved2: [u8; 2], // 0x1e
    pub checksum: U16,      // 0x20
    pub reserved3: [u8; 4], // 0x22
    pub command: u8,        // 0x26
    pub reserved4: [u8; 9], // 0x27
}

/// UTC offset of `tz` without daylight saving time.
///
/// Daylight saving only ever adds to the offset, so the standard offset is
/// the smaller of the January and July offsets.
pub fn standard_offset<Tz: TimeZone>(tz: &Tz, year: i32) -> FixedOffset {
    [1, 7]
        .into_iter()
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0))
        .map(|utc| tz.offset_from_utc_datetime(&utc).fix())
        .min_by_key(|offset| offset.local_minus_utc())
        .unwrap_or_else(|| Utc.fix())
}

/// Build the discovery probe announcing `local` and the clock `now`.
///
/// The timezone field carries whole hours of `standard`, the zone's offset
/// without daylight saving; the date and time fields are `now` as read.
pub fn build_discovery_probe(
    local: SocketAddrV4,
    now: &DateTime<FixedOffset>,
    standard: FixedOffset,
) -> [u8; DISCOVERY_PROBE_SIZE] {
    let mut probe = DiscoveryProbe::new_zeroed();
    probe.tz_offset = I32::new(standard.local_minus_utc() / 3600);
    probe.year = U16::new(now.year() as u16);
    probe.minute = now.minute() as u8;
    probe.hour = now.hour() as u8;
    probe.year_short = (now.year() % 100) as u8;
    probe.weekday = now.weekday().num_days_from_sunday() as u8;
    probe.day = now.day() as u8;
    probe.month = now.month() as u8;
    probe.local_ip = local.ip().octets();
    probe.local_port = U16::new(local.port());
    probe.command = DISCOVERY_COMMAND;
    probe.checksum = U16::new(checksum(probe.as_bytes()));

    let mut out = [0u8; DISCOVERY_PROBE_SIZE];
    out.copy_from_slice(probe.as_bytes());
    out
}

/// Fields of a discovery response needed to address the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryResponse {
    pub device_type: u16,
    pub mac: [u8; 6],
}

impl TryFrom<&[u8]> for DiscoveryResponse {
    type Error = BLError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < DISCOVERY_RESPONSE_MIN_SIZE {
            return Err(BLError::InsufficientData {
                expected: DISCOVERY_RESPONSE_MIN_SIZE,
                actual: bytes.len(),
            });
        }
        let device_type = read_u16_le(bytes, 0x34)?;
        let mac: [u8; 6] = slice_inclusive(bytes, 0x3a, 0x3f)?.as_slice().try_into()?;
        Ok(Self { device_type, mac })
    }
}
