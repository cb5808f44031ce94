use std::fmt;

/// Failure modes of the transport that are serious enough to stop the
/// caller rather than being folded into an [`crate::ScsiResult`].
#[derive(Debug)]
pub enum TransportError {
    /// No device matching the requested VID/PID was found during enumeration.
    NoDevice,
    /// The interface could not be claimed (or the kernel driver could not be
    /// detached, or the post-claim device reset failed).
    ClaimFailed(rusb::Error),
    /// A `rusb` call unrelated to claiming the interface failed.
    Usb(rusb::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NoDevice => write!(f, "no matching USB device found"),
            TransportError::ClaimFailed(e) => write!(f, "failed to claim interface: {e}"),
            TransportError::Usb(e) => write!(f, "USB transfer failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::NoDevice => None,
            TransportError::ClaimFailed(e) | TransportError::Usb(e) => Some(e),
        }
    }
}

impl From<rusb::Error> for TransportError {
    fn from(e: rusb::Error) -> Self {
        TransportError::Usb(e)
    }
}
