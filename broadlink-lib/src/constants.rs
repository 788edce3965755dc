// Protocol constants for Broadlink RM devices

/// Size of the command packet header (56 bytes)
pub const COMMAND_HEADER_SIZE: usize = 0x38;

/// Size of the discovery probe datagram (48 bytes)
pub const DISCOVERY_PROBE_SIZE: usize = 0x30;

/// Minimum size of a discovery response (header up to the end of the MAC)
pub const DISCOVERY_RESPONSE_MIN_SIZE: usize = 0x40;

/// AES block size, payloads are zero-padded to a multiple of this
pub const BLOCK_SIZE: usize = 16;

/// Seed of the rolling checksum
pub const CHECKSUM_SEED: u16 = 0xbeaf;

/// Magic bytes at the start of every command packet
pub const PACKET_MAGIC: [u8; 8] = [0x5a, 0xa5, 0xaa, 0x55, 0x5a, 0xa5, 0xaa, 0x55];

/// Device tag written at 0x24 of every command packet
pub const HEADER_DEVICE_TAG: u16 = 0x272a;

/// Command byte at 0x26 of the discovery probe
pub const DISCOVERY_COMMAND: u8 = 0x06;

/// Default AES-128 key, used until authorization hands out a session key
pub const DEFAULT_KEY: [u8; 16] = [
    0x09, 0x76, 0x28, 0x34, 0x3f, 0xe9, 0x9e, 0x23, 0x76, 0x5c, 0x15, 0x13, 0xac, 0xcf, 0x8b, 0x02,
];

/// Fixed AES-CBC initialization vector
pub const DEFAULT_IV: [u8; 16] = [
    0x56, 0x2e, 0x17, 0x99, 0x6d, 0x09, 0x3d, 0x28, 0xdd, 0xb3, 0xba, 0x69, 0x5a, 0x2e, 0x6f, 0x58,
];

/// UDP port devices listen on for discovery probes
pub const DISCOVERY_PORT: u16 = 80;

/// Size of the authorization payload
pub const AUTH_PAYLOAD_SIZE: usize = 0x50;

/// Size of the generic control payload
pub const CONTROL_PAYLOAD_SIZE: usize = 16;

/// Size of the 4-byte control header that precedes send/learn data
pub const CONTROL_HEADER_SIZE: usize = 4;

/// Receive buffer size for a single datagram
pub const MAX_DATAGRAM_SIZE: usize = 2048;
