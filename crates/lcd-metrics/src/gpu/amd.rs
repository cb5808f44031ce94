//! AMD GPU sensors: temperature/fan/clock from the `amdgpu` hwmon chip,
//! utilization from the DRM sysfs tree.

use std::path::Path;

use crate::hwmon;

const DRM_DEVICE_ROOT: &str = "/sys/class/drm/card1/device";

#[derive(Clone, Copy, Debug, Default)]
pub struct AmdSample {
    pub temp_c: Option<f64>,
    pub usage_percent: Option<f64>,
    pub clock_mhz: Option<f64>,
    /// Passed through exactly as read from `fan1_input`. The upstream
    /// source comments this as "convert to percentage" but never performs
    /// the conversion; this preserves that behavior rather than guessing
    /// a scale factor.
    pub fan_raw: Option<f64>,
}

pub fn detect() -> bool {
    hwmon::find_hwmon_by_name("amdgpu").is_some()
}

pub fn sample() -> AmdSample {
    let Some(dir) = hwmon::find_hwmon_by_name("amdgpu") else { return AmdSample::default() };

    let temp_c = hwmon::read_sysfs_u64(&dir.join("temp1_input")).map(|v| v as f64 / 1000.0);
    let clock_mhz = hwmon::read_sysfs_u64(&dir.join("freq1_input")).map(|v| v as f64 / 1_000_000.0);
    let fan_raw = hwmon::read_sysfs_u64(&dir.join("fan1_input")).map(|v| v as f64);
    let usage_percent =
        hwmon::read_sysfs_u64(Path::new(DRM_DEVICE_ROOT).join("gpu_busy_percent").as_path()).map(|v| v as f64);

    AmdSample { temp_c, usage_percent, clock_mhz, fan_raw }
}
