//! The panel's vendor framing on top of `lcd-transport`: the three-chunk
//! frame upload CDB and the best-effort boot-animation-skip handshake.

use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

use lcd_pixel::pack_frame;
use lcd_transport::{TransportError, UsbBot, UsbBotConfig};

/// USB vendor ID of the panel.
pub const PANEL_VID: u16 = 0x0402;
/// USB product ID of the panel.
pub const PANEL_PID: u16 = 0x3922;

/// The fixed tag the vendor software's capture uses throughout stage 2 of
/// the startup handshake. Reproduced byte-for-byte; changing it has no
/// documented meaning since the device doesn't validate tag contents.
const HANDSHAKE_TAG: u32 = 0x628B_F560;

const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(10);
const STAGE1_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Errors this layer can actually raise. Device-side SCSI failures are
/// reported as `bool`/`ScsiResult`, not as `Err` -- see [`LcdPanel::upload_frame`].
#[derive(Debug)]
pub enum ProtocolError {
    /// The caller's RGB buffer was not exactly one 320x240 frame.
    BadFrame(lcd_pixel::PackError),
    /// Opening or claiming the underlying transport failed.
    Transport(TransportError),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::BadFrame(e) => write!(f, "bad frame buffer: {e}"),
            ProtocolError::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::BadFrame(e) => Some(e),
            ProtocolError::Transport(e) => Some(e),
        }
    }
}

impl From<lcd_pixel::PackError> for ProtocolError {
    fn from(e: lcd_pixel::PackError) -> Self {
        ProtocolError::BadFrame(e)
    }
}

impl From<TransportError> for ProtocolError {
    fn from(e: TransportError) -> Self {
        ProtocolError::Transport(e)
    }
}

/// A panel reachable through a claimed [`UsbBot`].
pub struct LcdPanel {
    bot: UsbBot,
}

impl LcdPanel {
    /// Open the panel at its fixed vendor/product ID.
    pub fn open() -> Result<Self, ProtocolError> {
        Ok(LcdPanel { bot: UsbBot::open(PANEL_VID, PANEL_PID)? })
    }

    /// Open the panel with caller-supplied transport timeouts (used by
    /// tests and by callers probing a slow or emulated device).
    pub fn open_with_config(config: UsbBotConfig) -> Result<Self, ProtocolError> {
        Ok(LcdPanel { bot: UsbBot::open_with_config(PANEL_VID, PANEL_PID, config)? })
    }

    /// Release the panel's USB interface.
    pub fn close(&mut self) {
        self.bot.close();
    }

    /// Push one 320x240 RGB frame. Packs it into the three vendor chunks and
    /// sends them strictly in index order; aborts on the first chunk whose
    /// CSW isn't `ok`. The caller decides whether to retry.
    pub fn upload_frame(&mut self, rgb: &[u8]) -> Result<bool, ProtocolError> {
        let packed = pack_frame(rgb)?;
        for (i, chunk) in packed.chunks.iter().enumerate() {
            let cdb = frame_chunk_cdb(i as u8, chunk.len() as u32);
            let result = self.bot.send_scsi(&cdb, chunk, 0, 0);
            if !result.ok {
                log::warn!("lcd-protocol: chunk {i} upload failed, status {}", result.status);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Best-effort attempt to skip the panel's ~60s boot animation by
    /// replaying a capture from the vendor software. Never required for
    /// normal operation; failure here does not stop frame uploads once the
    /// boot animation ends on its own.
    pub fn run_startup_handshake(&mut self) -> bool {
        let deadline = Instant::now() + HANDSHAKE_DEADLINE;
        self.handshake_stage1(deadline);
        if Instant::now() >= deadline {
            log::warn!("lcd-protocol: handshake stage 1 timed out");
            return false;
        }
        self.handshake_stage2()
    }

    fn handshake_stage1(&mut self, deadline: Instant) {
        while Instant::now() < deadline {
            let tur = self.bot.send_scsi(&[0; 6], &[], 0, 0);
            if tur.ok {
                return;
            }
            if tur.status == 1 {
                let sense = self.bot.send_scsi(&[0x03, 0, 0, 0, 0x12, 0], &[], 18, 0);
                if !sense.ok || sense.data.len() != 18 {
                    let _ = self.bot.reset_transport();
                }
            }
            let mode_sense = self.bot.send_scsi(&[0x1A, 0, 0, 0, 0xC0, 0], &[], 0xC0, 0);
            if mode_sense.ok {
                return;
            }
            sleep(STAGE1_POLL_INTERVAL);
        }
    }

    fn handshake_stage2(&mut self) -> bool {
        let inquiry = self.bot.send_scsi(&[0x12, 0, 0, 0, 0x24, 0], &[], 36, HANDSHAKE_TAG);
        if !inquiry.ok || inquiry.data.is_empty() {
            return false;
        }

        let apix_cdb: [u8; 16] =
            [0xF5, 0x41, 0x50, 0x49, 0x58, 0xB3, 0x0C, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let apix = self.bot.send_scsi(&apix_cdb, &[], 12, HANDSHAKE_TAG);
        if !apix.ok || apix.data.is_empty() {
            return false;
        }

        let mut read_cdb = [0u8; 16];
        read_cdb[0] = 0xF5;
        let payload = self.bot.send_scsi(&read_cdb, &[], 57_627, HANDSHAKE_TAG);
        if !payload.ok || payload.data.is_empty() {
            return false;
        }

        let echo = self.bot.send_scsi(&read_cdb, &payload.data, 0, HANDSHAKE_TAG);
        echo.ok
    }
}

/// Build the 16-byte vendor CDB used for one frame-upload chunk.
fn frame_chunk_cdb(chunk_index: u8, chunk_len: u32) -> [u8; 16] {
    let mut cdb = [0u8; 16];
    cdb[0] = 0xF5;
    cdb[1] = 0x01;
    cdb[2] = 0x01;
    cdb[3] = chunk_index;
    cdb[12..16].copy_from_slice(&chunk_len.to_le_bytes());
    cdb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_cdb_layout_matches_spec() {
        let cdb = frame_chunk_cdb(1, 57_600);
        assert_eq!(cdb[0], 0xF5);
        assert_eq!(cdb[1], 0x01);
        assert_eq!(cdb[2], 0x01);
        assert_eq!(cdb[3], 1);
        assert_eq!(&cdb[4..12], &[0u8; 8]);
        assert_eq!(u32::from_le_bytes([cdb[12], cdb[13], cdb[14], cdb[15]]), 57_600);
    }

    #[test]
    fn apix_probe_cdb_matches_captured_bytes() {
        let expected: [u8; 16] = [0xF5, 0x41, 0x50, 0x49, 0x58, 0xB3, 0x0C, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        // APIX spells out ASCII "APIX" starting at byte 1.
        assert_eq!(&expected[1..5], b"APIX");
    }

    #[test]
    fn handshake_tag_matches_capture() {
        assert_eq!(HANDSHAKE_TAG, 0x628B_F560);
    }
}
