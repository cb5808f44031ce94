//! CPU/memory/disk/GPU metrics poller. Detects which sensors are present
//! once at startup, then samples them from one background worker on two
//! independent cadences, merging into a snapshot the caller can read at any
//! time. No public error type: every probe is infallible from the caller's
//! perspective -- a sensor that can't be read just keeps its previous
//! value, or never appears in the snapshot if it was never detected.

mod disk;
mod gpu;
mod hwmon;
mod poller;
mod proc;

pub use poller::{MetricsSnapshot, PollerConfig, SystemInfoPoller};
