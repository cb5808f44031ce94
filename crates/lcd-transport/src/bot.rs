use std::time::Duration;

use crate::error::TransportError;
use crate::wire::{encode_cbw, parse_csw, CswOutcome, Direction, CSW_LEN};

/// Outcome of one SCSI round-trip. Never propagated as an `Err` -- a failed
/// transfer is just a `ScsiResult` with `ok: false`, per the transport's
/// "never throws" contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScsiResult {
    pub ok: bool,
    pub status: u8,
    pub data: Vec<u8>,
}

impl ScsiResult {
    fn phase_error() -> Self {
        ScsiResult { ok: false, status: 2, data: Vec::new() }
    }

    fn command_failed() -> Self {
        ScsiResult { ok: false, status: 1, data: Vec::new() }
    }

    fn passed(data: Vec<u8>) -> Self {
        ScsiResult { ok: true, status: 0, data }
    }
}

/// Timeouts for the three phases of a SCSI round-trip: 1s for the
/// command/status phases, 2s for bulk data phases.
#[derive(Clone, Copy, Debug)]
pub struct UsbBotConfig {
    pub cbw_timeout: Duration,
    pub csw_timeout: Duration,
    pub data_timeout: Duration,
}

impl Default for UsbBotConfig {
    fn default() -> Self {
        UsbBotConfig {
            cbw_timeout: Duration::from_secs(1),
            csw_timeout: Duration::from_secs(1),
            data_timeout: Duration::from_secs(2),
        }
    }
}

/// A claimed USB Bulk-Only Transport endpoint pair, ready to carry SCSI
/// command/data/status round trips.
///
/// Single-producer by design: nothing here synchronizes calls to
/// [`UsbBot::send_scsi`] against each other, so the caller must serialize
/// uploads against the handshake and against itself across threads.
pub struct UsbBot {
    handle: rusb::DeviceHandle<rusb::Context>,
    interface: u8,
    ep_in: u8,
    ep_out: u8,
    tag: u32,
    config: UsbBotConfig,
}

impl UsbBot {
    /// Bulk-IN endpoint address fixed by the panel's USB descriptor.
    pub const EP_IN: u8 = 0x81;
    /// Bulk-OUT endpoint address fixed by the panel's USB descriptor.
    pub const EP_OUT: u8 = 0x02;
    /// Interface number the panel exposes its BOT endpoints on.
    pub const INTERFACE: u8 = 0;

    /// Open the first device matching `vid`/`pid`, claim the interface, and
    /// reset it. Always attempts to detach a conflicting kernel driver first.
    pub fn open(vid: u16, pid: u16) -> Result<Self, TransportError> {
        Self::open_with_config(vid, pid, UsbBotConfig::default())
    }

    /// Same as [`UsbBot::open`] but with caller-supplied timeouts, mainly
    /// useful for tests driving a slow fake device.
    pub fn open_with_config(vid: u16, pid: u16, config: UsbBotConfig) -> Result<Self, TransportError> {
        let context = rusb::Context::new()?;
        let device = context
            .devices()?
            .iter()
            .find(|d| {
                d.device_descriptor().map(|desc| desc.vendor_id() == vid && desc.product_id() == pid).unwrap_or(false)
            })
            .ok_or(TransportError::NoDevice)?;

        let mut handle = device.open().map_err(TransportError::ClaimFailed)?;
        // Best effort: not every platform/backend supports this.
        let _ = handle.set_auto_detach_kernel_driver(true);
        let _ = handle.release_interface(Self::INTERFACE);
        handle.claim_interface(Self::INTERFACE).map_err(TransportError::ClaimFailed)?;

        let mut bot = UsbBot { handle, interface: Self::INTERFACE, ep_in: Self::EP_IN, ep_out: Self::EP_OUT, tag: 1, config };
        bot.reset_transport().map_err(|e| match e {
            TransportError::Usb(inner) => TransportError::ClaimFailed(inner),
            other => other,
        })?;
        log::debug!("lcd-transport: opened {:04x}:{:04x}, interface {}", vid, pid, bot.interface);
        Ok(bot)
    }

    /// Release the interface. Safe to call more than once.
    pub fn close(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }

    fn next_tag(&mut self) -> u32 {
        self.tag = self.tag.wrapping_add(1);
        if self.tag == 0 {
            self.tag = 1;
        }
        self.tag
    }

    /// USB Mass Storage Reset class request, followed by clearing both
    /// endpoint halts.
    pub fn reset_transport(&mut self) -> Result<(), TransportError> {
        let request_type = rusb::request_type(rusb::Direction::Out, rusb::RequestType::Class, rusb::Recipient::Interface);
        self.handle.write_control(request_type, 0xFF, 0, 0, &[], self.config.cbw_timeout)?;
        let _ = self.handle.clear_halt(self.ep_in);
        let _ = self.handle.clear_halt(self.ep_out);
        Ok(())
    }

    /// One full CBW -> [data phase] -> CSW round trip.
    ///
    /// `cdb` must be 6..=16 bytes. If `tag` is zero, the next tag from this
    /// handle's counter is used; a caller wanting a specific tag (the
    /// handshake replays captured tags) passes it explicitly.
    pub fn send_scsi(&mut self, cdb: &[u8], data_out: &[u8], data_in_len: usize, tag: u32) -> ScsiResult {
        debug_assert!((6..=16).contains(&cdb.len()), "CDB must be 6..=16 bytes");
        let tag = if tag == 0 { self.next_tag() } else { tag };

        let direction =
            if data_in_len > 0 { Direction::DeviceToHost } else { Direction::HostToDevice };
        let transfer_length = if data_in_len > 0 { data_in_len as u32 } else { data_out.len() as u32 };
        let cbw = encode_cbw(tag, transfer_length, direction, cdb);

        if let Err(e) = self.handle.write_bulk(self.ep_out, &cbw, self.config.cbw_timeout) {
            log::warn!("lcd-transport: CBW write failed: {e}");
            return ScsiResult::phase_error();
        }

        let mut data = Vec::new();
        if data_in_len > 0 {
            let mut buf = vec![0u8; data_in_len];
            match self.handle.read_bulk(self.ep_in, &mut buf, self.config.data_timeout) {
                Ok(n) => {
                    buf.truncate(n);
                    data = buf;
                }
                Err(e) => {
                    log::warn!("lcd-transport: data-in phase failed: {e}");
                    return ScsiResult::phase_error();
                }
            }
        } else if !data_out.is_empty() {
            if let Err(e) = self.handle.write_bulk(self.ep_out, data_out, self.config.data_timeout) {
                log::warn!("lcd-transport: data-out phase failed: {e}");
                return ScsiResult::phase_error();
            }
        }

        let mut csw_buf = [0u8; CSW_LEN];
        match self.handle.read_bulk(self.ep_in, &mut csw_buf, self.config.csw_timeout) {
            Ok(n) if n == CSW_LEN => match parse_csw(&csw_buf, tag) {
                CswOutcome::Ok => ScsiResult::passed(data),
                CswOutcome::CommandFailed => ScsiResult::command_failed(),
                CswOutcome::PhaseError => ScsiResult::phase_error(),
            },
            Ok(_) => ScsiResult::phase_error(),
            Err(e) => {
                log::warn!("lcd-transport: CSW read failed: {e}");
                ScsiResult::phase_error()
            }
        }
    }

    /// TEST UNIT READY; on CHECK CONDITION, issue REQUEST SENSE and reset
    /// the transport before reporting not-ready. Same on PHASE ERROR.
    pub fn device_ready(&mut self) -> bool {
        let tur = self.send_scsi(&[0; 6], &[], 0, 0);
        match tur.status {
            0 => true,
            1 => {
                let _ = self.send_scsi(&[0x03, 0, 0, 0, 0x12, 0], &[], 18, 0);
                let _ = self.reset_transport();
                false
            }
            _ => {
                let _ = self.reset_transport();
                false
            }
        }
    }
}

impl Drop for UsbBot {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_spec_timeouts() {
        let cfg = UsbBotConfig::default();
        assert_eq!(cfg.cbw_timeout, Duration::from_secs(1));
        assert_eq!(cfg.csw_timeout, Duration::from_secs(1));
        assert_eq!(cfg.data_timeout, Duration::from_secs(2));
    }

    #[test]
    fn scsi_result_helpers_carry_expected_status() {
        assert_eq!(ScsiResult::phase_error().status, 2);
        assert_eq!(ScsiResult::command_failed().status, 1);
        assert!(!ScsiResult::phase_error().ok);
        assert!(ScsiResult::passed(vec![1, 2, 3]).ok);
    }
}
