pub mod config;
pub mod constants;
pub mod crypto;
pub mod device;
pub mod discovery;
pub mod error;
pub mod packet;
pub mod session;
pub mod signal;
pub mod util;

// Re-export the main entry points for easy access
pub use config::ProtocolConfig;
pub use device::{DeviceKind, DeviceRecord};
pub use discovery::discover;
pub use error::BLError;
pub use session::{Device, RemoteControl};
pub use signal::{LearnedSignal, SignalType};
