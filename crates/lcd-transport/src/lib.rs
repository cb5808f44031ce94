//! USB Bulk-Only Transport / SCSI round-trip client used to talk to the
//! panel. This crate knows nothing about the panel's vendor CDBs or pixel
//! formats -- that lives one layer up, in `lcd-protocol`.

mod bot;
mod error;
mod wire;

pub use bot::{ScsiResult, UsbBot, UsbBotConfig};
pub use error::TransportError;
pub use wire::{encode_cbw, parse_csw, CswOutcome, Direction, CBW_LEN, CSW_LEN};
