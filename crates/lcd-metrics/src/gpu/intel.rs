//! Intel GPU: presence-gated by the `gt0` sysfs node. Only clock is read;
//! temperature has no confirmed sysfs path and is left unimplemented.

use std::path::Path;

use crate::hwmon;

const GT0_PATH: &str = "/sys/class/drm/card0/gt/gt0";

pub fn detect() -> bool {
    Path::new(GT0_PATH).is_dir()
}

pub fn clock_mhz() -> Option<f64> {
    hwmon::read_sysfs_u64(&Path::new(GT0_PATH).join("freq0_cur_freq")).map(|v| v as f64 / 1_000_000.0)
}
