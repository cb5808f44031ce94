//! Facade crate: re-exports the panel's pixel packer, USB transport, vendor
//! protocol, background compositor, and metrics poller behind one import,
//! for host applications that just want to drive the panel without caring
//! about the crate split underneath.

pub use lcd_background::{
    default_gradient, CacheKey, CachedImage, Compositor, DecodeError, PlaybackMode, SourceKind,
    VideoBackground, PRELOAD_THRESHOLD_SECS,
};
pub use lcd_metrics::{MetricsSnapshot, PollerConfig, SystemInfoPoller};
pub use lcd_pixel::{pack_frame, rgb565, unpack_frame, PackError, PackedFrame, CHUNK_BANDS, CHUNK_LENS, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH};
pub use lcd_protocol::{LcdPanel, ProtocolError, PANEL_PID, PANEL_VID};
pub use lcd_transport::{ScsiResult, TransportError, UsbBot, UsbBotConfig};
