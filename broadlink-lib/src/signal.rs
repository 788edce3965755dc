//! Learned infrared/RF signals
//!
//! A learned signal is a type tag, a repeat count and a buffer of pulse
//! durations. Durations are in device units of 2^-15 s (about 30.5 µs) and
//! use a variable-width encoding:
//!
//! - `1..=255` is a single byte
//! - larger values are `0x00` followed by the big-endian 16-bit value
//!
//! A zero byte that does not start a valid long value ends the data.

use crate::constants::CONTROL_HEADER_SIZE;
use crate::error::BLError;
use crate::packet::ControlCode;
use crate::util::read_u16_le;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

/// Duration of one device time unit in microseconds
pub const PULSE_UNIT_US: f64 = 30.5175781;

/// Value appended to odd-length pulse sequences so they end on an off pulse
pub const TRAILING_PULSE: u16 = 3333;

/// Largest encodable pulse duration
pub const MAX_PULSE: u16 = i16::MAX as u16;

/// Size of the signal header: type, repeat, 16-bit length
const SIGNAL_HEADER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum SignalType {
    #[strum(to_string = "IR")]
    Infrared = 0x26,
    #[strum(to_string = "RF 433 MHz")]
    Rf433 = 0xb2,
    #[strum(to_string = "RF 315 MHz")]
    Rf315 = 0xd7,

    #[num_enum(catch_all)]
    #[strum(to_string = "unknown")]
    Unknown(u8),
}

/// Decode a raw pulse buffer into durations.
pub fn decode_pulses(raw: &[u8]) -> Vec<u16> {
    let mut pulses = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b != 0 {
            pulses.push(b as u16);
            i += 1;
            continue;
        }
        // a long value is only valid when it could not fit in one byte
        if i + 2 < raw.len() && raw[i + 1] != 0 {
            pulses.push(u16::from_be_bytes([raw[i + 1], raw[i + 2]]));
            i += 3;
        } else {
            break;
        }
    }
    pulses
}

/// Encode durations into a raw pulse buffer.
///
/// Each duration is clamped to `1..=32767`. An odd number of durations gets
/// a trailing [`TRAILING_PULSE`].
pub fn encode_pulses(pulses: &[u16]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(pulses.len() + 3);
    for &p in pulses {
        push_pulse(&mut raw, p.clamp(1, MAX_PULSE));
    }
    if pulses.len() % 2 == 1 {
        push_pulse(&mut raw, TRAILING_PULSE);
    }
    raw
}

fn push_pulse(raw: &mut Vec<u8>, p: u16) {
    if p <= u8::MAX as u16 {
        raw.push(p as u8);
    } else {
        raw.push(0);
        raw.extend_from_slice(&p.to_be_bytes());
    }
}

pub fn units_to_micros(units: u16) -> f64 {
    units as f64 * PULSE_UNIT_US
}

/// Convert microseconds to the nearest whole device unit
pub fn micros_to_units(micros: f64) -> u16 {
    (micros / PULSE_UNIT_US).round() as u16
}

/// Length of a pulse buffer as carried in the signal header
fn raw_len(raw: &[u8]) -> Result<u16, BLError> {
    u16::try_from(raw.len()).map_err(|_| {
        BLError::Argument(format!(
            "pulse buffer of {} bytes exceeds the {} byte limit",
            raw.len(),
            u16::MAX
        ))
    })
}

/// A signal captured in learning mode, ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedSignal {
    pub signal_type: SignalType,
    pub repeat: u8,
    pub raw: Vec<u8>,
}

impl LearnedSignal {
    /// Encode `pulses` into a signal.
    ///
    /// Fails with [`BLError::Argument`] when the encoded buffer does not fit
    /// the 16-bit length field.
    pub fn from_pulses(signal_type: SignalType, repeat: u8, pulses: &[u16]) -> Result<Self, BLError> {
        let raw = encode_pulses(pulses);
        raw_len(&raw)?;
        Ok(Self {
            signal_type,
            repeat,
            raw,
        })
    }

    pub fn from_micros(signal_type: SignalType, repeat: u8, micros: &[f64]) -> Result<Self, BLError> {
        let pulses: Vec<u16> = micros.iter().map(|&m| micros_to_units(m)).collect();
        Self::from_pulses(signal_type, repeat, &pulses)
    }

    pub fn pulses(&self) -> Vec<u16> {
        decode_pulses(&self.raw)
    }

    pub fn micros(&self) -> Vec<f64> {
        self.pulses().into_iter().map(units_to_micros).collect()
    }

    /// Wire form: type, repeat, little-endian length, pulse buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, BLError> {
        let len = raw_len(&self.raw)?;
        let mut bytes = Vec::with_capacity(SIGNAL_HEADER_SIZE + self.raw.len());
        bytes.push(self.signal_type.into());
        bytes.push(self.repeat);
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&self.raw);
        Ok(bytes)
    }

    /// Parse the wire form produced by [`LearnedSignal::to_bytes`].
    ///
    /// Bytes past the declared length (cipher padding) are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BLError> {
        if bytes.len() < SIGNAL_HEADER_SIZE {
            return Err(BLError::Decode(format!(
                "signal header needs {SIGNAL_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let len = read_u16_le(bytes, 2)? as usize;
        let raw = bytes
            .get(SIGNAL_HEADER_SIZE..SIGNAL_HEADER_SIZE + len)
            .ok_or_else(|| {
                BLError::Decode(format!(
                    "declared {len} pulse bytes, only {} available",
                    bytes.len() - SIGNAL_HEADER_SIZE
                ))
            })?;
        Ok(Self {
            signal_type: SignalType::from_primitive(bytes[0]),
            repeat: bytes[1],
            raw: raw.to_vec(),
        })
    }

    /// Parse the decrypted payload of a read-learned response.
    ///
    /// The payload echoes the `04 00 00 00` control header before the signal.
    pub fn from_response(payload: &[u8]) -> Result<Self, BLError> {
        let expected = [u8::from(ControlCode::ReadLearned), 0, 0, 0];
        match payload.get(..CONTROL_HEADER_SIZE) {
            Some(header) if header == &expected[..] => Self::from_bytes(&payload[CONTROL_HEADER_SIZE..]),
            Some(header) => Err(BLError::Decode(format!(
                "unexpected learned-signal header {}",
                hex::encode(header)
            ))),
            None => Err(BLError::Decode(format!(
                "learned-signal response of {} bytes is truncated",
                payload.len()
            ))),
        }
    }

    pub fn to_base64(&self) -> Result<String, BLError> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(s: &str) -> Result<Self, BLError> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| BLError::Decode(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}
