//! Disk free/used space, summed across every mount point `/proc/mounts`
//! reports that isn't a pseudo filesystem or a loop/optical device.

use std::ffi::CString;
use std::fs;
use std::mem::MaybeUninit;

use crate::proc::eligible_mounts;

#[derive(Clone, Copy, Debug, Default)]
pub struct DiskTotals {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl DiskTotals {
    pub fn percent_used(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let used = self.total_bytes.saturating_sub(self.free_bytes);
        Some(used as f64 / self.total_bytes as f64 * 100.0)
    }

    pub fn free_gb(&self) -> f64 {
        self.free_bytes as f64 / 1024.0 / 1024.0 / 1024.0
    }
}

/// Sum `statvfs` totals across every eligible mount point. `None` if
/// `/proc/mounts` couldn't be read or no mount point yielded a reading.
pub fn disk_totals() -> Option<DiskTotals> {
    let contents = fs::read_to_string("/proc/mounts").ok()?;
    let mut totals = DiskTotals::default();
    let mut any = false;
    for mountpoint in eligible_mounts(&contents) {
        if let Some((total, free)) = statvfs_bytes(&mountpoint) {
            totals.total_bytes += total;
            totals.free_bytes += free;
            any = true;
        }
    }
    any.then_some(totals)
}

fn statvfs_bytes(path: &str) -> Option<(u64, u64)> {
    let c_path = CString::new(path).ok()?;
    let mut buf = MaybeUninit::<libc::statvfs>::uninit();
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), buf.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let buf = unsafe { buf.assume_init() };
    let block_size = buf.f_frsize as u64;
    Some((block_size * buf.f_blocks as u64, block_size * buf.f_bavail as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_used_is_none_when_total_is_zero() {
        assert_eq!(DiskTotals::default().percent_used(), None);
    }

    #[test]
    fn percent_used_and_free_gb_match_expected_arithmetic() {
        let totals = DiskTotals { total_bytes: 1_000_000_000, free_bytes: 400_000_000 };
        assert!((totals.percent_used().unwrap() - 60.0).abs() < 0.001);
        assert!(totals.free_gb() > 0.0);
    }
}
