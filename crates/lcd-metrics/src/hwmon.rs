//! Linux `hwmon` sysfs tree: CPU temperature and AMD GPU sensors live here.

use std::fs;
use std::path::{Path, PathBuf};

const HWMON_ROOT: &str = "/sys/class/hwmon";
const CPU_TEMP_CHIPS: [&str; 2] = ["k10temp", "coretemp"];

/// Every `hwmonN` directory currently present.
pub fn hwmon_dirs() -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(HWMON_ROOT) else { return Vec::new() };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with("hwmon")).unwrap_or(false))
        .collect()
}

/// The contents of a hwmon directory's `name` file, trimmed.
pub fn hwmon_name(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join("name")).ok().map(|s| s.trim().to_string())
}

/// First hwmon directory whose `name` file matches exactly.
pub fn find_hwmon_by_name(name: &str) -> Option<PathBuf> {
    hwmon_dirs().into_iter().find(|d| hwmon_name(d).as_deref() == Some(name))
}

fn read_u64(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse::<u64>().ok()
}

/// Every `tempN_input` reading (millidegrees C, as stored) under a hwmon dir.
pub fn temp_inputs_millidegrees(dir: &Path) -> Vec<u64> {
    let Ok(entries) = fs::read_dir(dir) else { return Vec::new() };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("temp") && n.ends_with("_input"))
                .unwrap_or(false)
        })
        .filter_map(|p| read_u64(&p))
        .collect()
}

/// Max CPU temperature (°C) across every `k10temp`/`coretemp` hwmon chip,
/// or `None` if no such chip was found or it reported nothing.
pub fn max_cpu_temp_celsius() -> Option<f64> {
    let mut readings = Vec::new();
    for dir in hwmon_dirs() {
        let Some(name) = hwmon_name(&dir) else { continue };
        if !CPU_TEMP_CHIPS.contains(&name.as_str()) {
            continue;
        }
        readings.extend(temp_inputs_millidegrees(&dir));
    }
    readings.into_iter().max().map(|v| v as f64 / 1000.0)
}

/// `15.0 < v < 100.0`, the documented plausibility window for CPU temperature.
pub fn plausible_cpu_temp(v: f64) -> bool {
    v > 15.0 && v < 100.0
}

pub fn read_sysfs_u64(path: &Path) -> Option<u64> {
    read_u64(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_around_plausibility_window() {
        assert!(!plausible_cpu_temp(14.9));
        assert!(plausible_cpu_temp(15.1));
        assert!(!plausible_cpu_temp(100.0));
        assert!(plausible_cpu_temp(99.9));
    }
}
