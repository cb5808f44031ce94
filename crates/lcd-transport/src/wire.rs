//! Byte-level CBW/CSW framing. Kept free of any `rusb` dependency so the
//! framing logic can be unit tested without a real or fake USB stack.

/// Command Block Wrapper: exactly 31 bytes on the wire.
pub const CBW_LEN: usize = 31;
/// Command Status Wrapper: exactly 13 bytes on the wire.
pub const CSW_LEN: usize = 13;

const CBW_SIGNATURE: [u8; 4] = *b"USBC";
const CSW_SIGNATURE: [u8; 4] = *b"USBS";

/// Transfer direction flag in byte 12 of the CBW.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl Direction {
    fn flag(self) -> u8 {
        match self {
            Direction::HostToDevice => 0x00,
            Direction::DeviceToHost => 0x80,
        }
    }
}

/// Build a 31-byte CBW for a 6-16 byte CDB.
///
/// Panics if `cdb` is not between 6 and 16 bytes; that range is a contract
/// of the SCSI layer above this one, not a runtime condition.
pub fn encode_cbw(tag: u32, transfer_length: u32, direction: Direction, cdb: &[u8]) -> [u8; CBW_LEN] {
    assert!((6..=16).contains(&cdb.len()), "CDB must be 6..=16 bytes, got {}", cdb.len());

    let mut buf = [0u8; CBW_LEN];
    buf[0..4].copy_from_slice(&CBW_SIGNATURE);
    buf[4..8].copy_from_slice(&tag.to_le_bytes());
    buf[8..12].copy_from_slice(&transfer_length.to_le_bytes());
    buf[12] = direction.flag();
    buf[13] = 0x00; // LUN
    buf[14] = cdb.len() as u8;
    buf[15..15 + cdb.len()].copy_from_slice(cdb);
    buf
}

/// Outcome of parsing a 13-byte CSW against the tag we expect it to echo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CswOutcome {
    Ok,
    CommandFailed,
    PhaseError,
}

/// Parse a CSW, verifying its signature and tag echo. Any structural problem
/// -- wrong length, bad signature, or a tag that doesn't match the CBW we
/// sent -- is reported as a phase error, matching bulk transfer I/O failures.
pub fn parse_csw(bytes: &[u8], expected_tag: u32) -> CswOutcome {
    if bytes.len() != CSW_LEN {
        return CswOutcome::PhaseError;
    }
    if bytes[0..4] != CSW_SIGNATURE {
        return CswOutcome::PhaseError;
    }
    let tag = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if tag != expected_tag {
        return CswOutcome::PhaseError;
    }
    match bytes[12] {
        0 => CswOutcome::Ok,
        1 => CswOutcome::CommandFailed,
        _ => CswOutcome::PhaseError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbw_has_expected_layout() {
        let cbw = encode_cbw(0x1234_5678, 36, Direction::DeviceToHost, &[0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(&cbw[0..4], b"USBC");
        assert_eq!(u32::from_le_bytes([cbw[4], cbw[5], cbw[6], cbw[7]]), 0x1234_5678);
        assert_eq!(u32::from_le_bytes([cbw[8], cbw[9], cbw[10], cbw[11]]), 36);
        assert_eq!(cbw[12], 0x80);
        assert_eq!(cbw[13], 0x00);
        assert_eq!(cbw[14], 6);
        assert_eq!(&cbw[15..21], &[0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(&cbw[21..], &[0u8; 10]);
    }

    #[test]
    fn csw_ok_on_matching_tag_and_status() {
        let mut csw = [0u8; CSW_LEN];
        csw[0..4].copy_from_slice(b"USBS");
        csw[4..8].copy_from_slice(&42u32.to_le_bytes());
        csw[12] = 0;
        assert_eq!(parse_csw(&csw, 42), CswOutcome::Ok);
    }

    #[test]
    fn csw_tag_mismatch_is_phase_error() {
        let mut csw = [0u8; CSW_LEN];
        csw[0..4].copy_from_slice(b"USBS");
        csw[4..8].copy_from_slice(&1u32.to_le_bytes());
        csw[12] = 0;
        assert_eq!(parse_csw(&csw, 2), CswOutcome::PhaseError);
    }

    #[test]
    fn csw_bad_signature_is_phase_error() {
        let mut csw = [0u8; CSW_LEN];
        csw[0..4].copy_from_slice(b"XXXX");
        csw[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(parse_csw(&csw, 1), CswOutcome::PhaseError);
    }

    #[test]
    fn csw_short_read_is_phase_error() {
        assert_eq!(parse_csw(&[0u8; 5], 1), CswOutcome::PhaseError);
    }

    #[test]
    fn csw_status_one_is_command_failed() {
        let mut csw = [0u8; CSW_LEN];
        csw[0..4].copy_from_slice(b"USBS");
        csw[4..8].copy_from_slice(&7u32.to_le_bytes());
        csw[12] = 1;
        assert_eq!(parse_csw(&csw, 7), CswOutcome::CommandFailed);
    }
}
