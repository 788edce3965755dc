use std::fmt;
use std::net::SocketAddr;
use strum_macros::Display;

/// Device types that understand the remote-control command set.
pub const REMOTE_CONTROL_TYPES: &[(u16, &str)] = &[
    (0x2712, "RM2"),
    (0x2737, "RM Mini"),
    (0x273d, "RM Pro Phicomm"),
    (0x2783, "RM2 Home Plus"),
    (0x277c, "RM2 Home Plus GDT"),
    (0x272a, "RM2 Pro Plus"),
    (0x2787, "RM2 Pro Plus2"),
    (0x278b, "RM2 Pro Plus BL"),
    (0x278f, "RM Mini Shate"),
];

/// Capability set of a device, selected once from its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeviceKind {
    /// Discovery and authorization only
    #[strum(to_string = "general")]
    General,
    /// Adds learning, signal send and temperature read
    #[strum(to_string = "remote control")]
    RemoteControl,
}

impl DeviceKind {
    pub fn from_device_type(device_type: u16) -> Self {
        if REMOTE_CONTROL_TYPES.iter().any(|&(tag, _)| tag == device_type) {
            DeviceKind::RemoteControl
        } else {
            DeviceKind::General
        }
    }
}

/// Model name for a known device type tag
pub fn model_name(device_type: u16) -> Option<&'static str> {
    REMOTE_CONTROL_TYPES
        .iter()
        .find(|&&(tag, _)| tag == device_type)
        .map(|&(_, name)| name)
}

/// Identity and session state of one appliance.
///
/// The device id and session key stay `None` until authorization. The
/// packet counter starts at 1 and advances after every packet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    addr: SocketAddr,
    device_type: u16,
    kind: DeviceKind,
    mac: [u8; 6],
    device_id: Option<[u8; 4]>,
    key: Option<[u8; 16]>,
    packet_count: u16,
}

impl DeviceRecord {
    pub fn new(addr: SocketAddr, device_type: u16, mac: [u8; 6]) -> Self {
        Self {
            addr,
            device_type,
            kind: DeviceKind::from_device_type(device_type),
            mac,
            device_id: None,
            key: None,
            packet_count: 1,
        }
    }

    /// Restore credentials obtained by an earlier authorization
    pub fn with_credentials(mut self, device_id: [u8; 4], key: [u8; 16]) -> Self {
        self.set_credentials(device_id, key);
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn device_type(&self) -> u16 {
        self.device_type
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    pub fn device_id(&self) -> Option<[u8; 4]> {
        self.device_id
    }

    pub fn key(&self) -> Option<[u8; 16]> {
        self.key
    }

    pub fn packet_count(&self) -> u16 {
        self.packet_count
    }

    pub fn is_authorized(&self) -> bool {
        self.device_id.is_some() && self.key.is_some()
    }

    pub(crate) fn set_credentials(&mut self, device_id: [u8; 4], key: [u8; 16]) {
        self.device_id = Some(device_id);
        self.key = Some(key);
    }

    pub(crate) fn advance_count(&mut self) {
        self.packet_count = self.packet_count.wrapping_add(1);
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mac = self
            .mac
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        write!(
            f,
            "{} type {:#06x} ({}) mac {}",
            self.addr,
            self.device_type,
            model_name(self.device_type).unwrap_or("unknown"),
            mac
        )
    }
}
