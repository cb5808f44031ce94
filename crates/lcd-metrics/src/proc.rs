//! Pure parsers over `/proc/stat`, `/proc/meminfo`, `/proc/mounts`, and
//! `/proc/cpuinfo`. Kept free of any I/O so the line-parsing logic is
//! directly testable against string fixtures.

use std::collections::HashSet;

/// The eight jiffy counters this poller cares about from the aggregate
/// `cpu` line of `/proc/stat`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuJiffies {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuJiffies {
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }

    pub fn active(&self) -> u64 {
        self.total().saturating_sub(self.idle).saturating_sub(self.iowait)
    }
}

/// Parse the aggregate `cpu  ...` line out of `/proc/stat`'s full contents.
pub fn parse_cpu_line(contents: &str) -> Option<CpuJiffies> {
    let line = contents.lines().find(|l| l.starts_with("cpu "))?;
    let mut fields = line.split_whitespace().skip(1).map(|f| f.parse::<u64>().unwrap_or(0));
    Some(CpuJiffies {
        user: fields.next()?,
        nice: fields.next()?,
        system: fields.next()?,
        idle: fields.next()?,
        iowait: fields.next().unwrap_or(0),
        irq: fields.next().unwrap_or(0),
        softirq: fields.next().unwrap_or(0),
        steal: fields.next().unwrap_or(0),
    })
}

/// CPU utilization percentage between two `/proc/stat` samples.
pub fn cpu_percent_delta(prev: CpuJiffies, curr: CpuJiffies) -> Option<f64> {
    let total_delta = curr.total().saturating_sub(prev.total());
    if total_delta == 0 {
        return None;
    }
    let active_delta = curr.active().saturating_sub(prev.active());
    Some(active_delta as f64 / total_delta as f64 * 100.0)
}

/// Average of every `cpu MHz` value in `/proc/cpuinfo`.
pub fn parse_cpu_mhz(contents: &str) -> Option<f64> {
    let values: Vec<f64> = contents
        .lines()
        .filter_map(|l| l.split_once(':'))
        .filter(|(k, _)| k.trim() == "cpu MHz")
        .filter_map(|(_, v)| v.trim().parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `MemTotal`/`MemAvailable`, both in kB, from `/proc/meminfo`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemInfo {
    pub total_kb: f64,
    pub available_kb: f64,
}

pub fn parse_meminfo(contents: &str) -> Option<MemInfo> {
    let mut total = None;
    let mut available = None;
    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else { continue };
        let value = rest.split_whitespace().next().and_then(|v| v.parse::<f64>().ok());
        match key {
            "MemTotal" => total = value,
            "MemAvailable" => available = value,
            _ => {}
        }
    }
    Some(MemInfo { total_kb: total?, available_kb: available? })
}

impl MemInfo {
    pub fn used_gb(&self) -> f64 {
        (self.total_kb - self.available_kb) / 1024.0 / 1024.0
    }

    pub fn percent(&self) -> Option<f64> {
        if self.total_kb <= 0.0 {
            return None;
        }
        Some((self.total_kb - self.available_kb) / self.total_kb * 100.0)
    }
}

const EXCLUDED_FSTYPES: [&str; 7] =
    ["tmpfs", "devtmpfs", "proc", "sysfs", "cgroup", "overlay", "squashfs"];

/// A parsed line of `/proc/mounts` the disk probe should consider summing.
pub fn eligible_mounts(contents: &str) -> Vec<String> {
    let excluded: HashSet<&str> = EXCLUDED_FSTYPES.into_iter().chain(["ramfs"]).collect();
    let mut mountpoints = Vec::new();
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let Some(device) = fields.next() else { continue };
        let Some(mountpoint) = fields.next() else { continue };
        let Some(fstype) = fields.next() else { continue };
        if excluded.contains(fstype) {
            continue;
        }
        if device.starts_with("/dev/loop") || device.starts_with("/dev/sr") {
            continue;
        }
        if mountpoint.contains("/run") {
            continue;
        }
        mountpoints.push(mountpoint.to_string());
    }
    mountpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_FIXTURE: &str = "cpu  100 10 50 800 5 0 2 0\ncpu0 50 5 25 400 2 0 1 0\n";

    #[test]
    fn parses_aggregate_cpu_line() {
        let j = parse_cpu_line(STAT_FIXTURE).unwrap();
        assert_eq!(j, CpuJiffies { user: 100, nice: 10, system: 50, idle: 800, iowait: 5, irq: 0, softirq: 2, steal: 0 });
    }

    #[test]
    fn cpu_percent_delta_between_two_samples() {
        let prev = CpuJiffies { user: 0, nice: 0, system: 0, idle: 0, iowait: 0, irq: 0, softirq: 0, steal: 0 };
        let curr = CpuJiffies { user: 25, nice: 0, system: 0, idle: 75, iowait: 0, irq: 0, softirq: 0, steal: 0 };
        assert_eq!(cpu_percent_delta(prev, curr), Some(25.0));
    }

    #[test]
    fn cpu_percent_delta_is_none_when_total_unchanged() {
        let s = CpuJiffies { user: 1, nice: 0, system: 0, idle: 1, iowait: 0, irq: 0, softirq: 0, steal: 0 };
        assert_eq!(cpu_percent_delta(s, s), None);
    }

    #[test]
    fn parses_cpu_mhz_average() {
        let fixture = "processor\t: 0\ncpu MHz\t\t: 2000.000\nprocessor\t: 1\ncpu MHz\t\t: 3000.000\n";
        assert_eq!(parse_cpu_mhz(fixture), Some(2500.0));
    }

    #[test]
    fn parses_meminfo_and_derives_percent_and_gb() {
        let fixture = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    8000000 kB\n";
        let mem = parse_meminfo(fixture).unwrap();
        assert_eq!(mem.total_kb, 16_000_000.0);
        assert_eq!(mem.available_kb, 8_000_000.0);
        assert!((mem.percent().unwrap() - 50.0).abs() < 0.01);
        assert!((mem.used_gb() - (8_000_000.0 / 1024.0 / 1024.0)).abs() < 0.001);
    }

    #[test]
    fn mounts_excludes_pseudo_filesystems_and_loop_devices() {
        let fixture = "\
/dev/sda1 / ext4 rw 0 0
tmpfs /dev/shm tmpfs rw 0 0
/dev/loop0 /snap/core/1234 squashfs ro 0 0
proc /proc proc rw 0 0
/dev/sdb1 /mnt/data ext4 rw 0 0
/dev/sdc1 /run/media/x vfat rw 0 0
";
        let mounts = eligible_mounts(fixture);
        assert_eq!(mounts, vec!["/".to_string(), "/mnt/data".to_string()]);
    }
}
