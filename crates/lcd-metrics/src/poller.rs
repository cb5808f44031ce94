//! One worker thread polling CPU/memory/disk/GPU sensors on two cadences
//! and merging results into a shared, mutex-guarded snapshot.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::disk;
use crate::gpu::GpuBackend;
use crate::hwmon;
use crate::proc;

/// `{metric name -> current value}`. Only ever contains keys that were
/// detected as available at startup; never grows or shrinks afterward.
pub type MetricsSnapshot = HashMap<String, f64>;

/// Tick and cadence configuration, overridable mainly for tests that don't
/// want to wait on the spec's real-world 2.5s slow cadence.
#[derive(Clone, Copy, Debug)]
pub struct PollerConfig {
    pub tick: Duration,
    pub fast_interval: Duration,
    pub slow_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            tick: Duration::from_millis(50),
            fast_interval: Duration::from_millis(200),
            slow_interval: Duration::from_millis(2_500),
        }
    }
}

struct Shared {
    snapshot: Mutex<MetricsSnapshot>,
    running: AtomicBool,
}

/// Detects which metrics are available once at construction, then samples
/// them from a single background worker started by [`SystemInfoPoller::start`].
pub struct SystemInfoPoller {
    available: HashSet<String>,
    shared: Arc<Shared>,
    config: PollerConfig,
    worker: Option<JoinHandle<()>>,
}

impl SystemInfoPoller {
    pub fn new() -> Self {
        Self::with_config(PollerConfig::default())
    }

    pub fn with_config(config: PollerConfig) -> Self {
        let (available, snapshot) = detect_once();
        SystemInfoPoller {
            available,
            shared: Arc::new(Shared { snapshot: Mutex::new(snapshot), running: AtomicBool::new(false) }),
            config,
            worker: None,
        }
    }

    /// Start the polling worker. No-op if already running.
    pub fn start(&mut self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let available = self.available.clone();
        let config = self.config;
        self.worker = Some(thread::spawn(move || run_worker(&shared, &available, config)));
    }

    /// Stop the worker and join it. Safe to call when not running.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    /// The fixed set of metric keys detected at construction time.
    pub fn get_available_metrics(&self) -> Vec<String> {
        self.available.iter().cloned().collect()
    }

    /// A copy of the current snapshot.
    pub fn get_info(&self) -> MetricsSnapshot {
        self.shared.snapshot.lock().unwrap().clone()
    }
}

impl Default for SystemInfoPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SystemInfoPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn detect_once() -> (HashSet<String>, MetricsSnapshot) {
    let mut available = HashSet::new();
    let mut snapshot = MetricsSnapshot::new();
    let mut register = |key: &str| {
        available.insert(key.to_string());
        snapshot.insert(key.to_string(), 0.0);
    };

    if std::thread::available_parallelism().is_ok() {
        register("cpu_count");
    }
    if fs::read_to_string("/proc/cpuinfo").ok().and_then(|c| proc::parse_cpu_mhz(&c)).filter(|&v| v > 0.0).is_some()
    {
        register("cpu_freq");
    }
    if fs::read_to_string("/proc/stat").ok().and_then(|c| proc::parse_cpu_line(&c)).is_some() {
        register("cpu_percent");
    }
    if hwmon::max_cpu_temp_celsius().filter(|&v| hwmon::plausible_cpu_temp(v)).is_some() {
        register("cpu_temp");
    }
    if fs::read_to_string("/proc/meminfo").ok().and_then(|c| proc::parse_meminfo(&c)).filter(|m| m.total_kb > 0.0).is_some()
    {
        register("mem_percent");
        register("mem_used_gb");
    }
    if disk::disk_totals().filter(|d| d.total_bytes > 0).is_some() {
        register("disk_percent");
        register("disk_free_gb");
    }

    let gpu = GpuBackend::detect();
    if gpu.is_available() {
        let sample = gpu.sample();
        if sample.temp_c.is_some() {
            register("gpu_temp");
        }
        if sample.usage_percent.is_some() {
            register("gpu_usage");
        }
        if sample.clock_mhz.is_some() {
            register("gpu_clock");
        }
        if sample.fan.is_some() {
            register("gpu_fan");
        }
    }

    (available, snapshot)
}

fn run_worker(shared: &Shared, available: &HashSet<String>, config: PollerConfig) {
    let gpu = GpuBackend::detect();
    let mut prev_cpu = fs::read_to_string("/proc/stat").ok().and_then(|c| proc::parse_cpu_line(&c));
    let mut last_fast = Instant::now().checked_sub(config.fast_interval).unwrap_or_else(Instant::now);
    let mut last_slow = Instant::now().checked_sub(config.slow_interval).unwrap_or_else(Instant::now);

    while shared.running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now.duration_since(last_fast) >= config.fast_interval {
            last_fast = now;
            sample_fast(shared, available, &gpu, &mut prev_cpu);
        }
        if now.duration_since(last_slow) >= config.slow_interval {
            last_slow = now;
            sample_slow(shared, available);
        }
        thread::sleep(config.tick);
    }
}

/// Merge one sample into the snapshot. Any sensor that didn't detect at
/// startup is ignored; any sensor that returned `None` this tick keeps its
/// previous value.
fn merge(shared: &Shared, key: &str, available: &HashSet<String>, value: Option<f64>) {
    if !available.contains(key) {
        return;
    }
    if let Some(v) = value {
        shared.snapshot.lock().unwrap().insert(key.to_string(), v);
    }
}

fn sample_fast(shared: &Shared, available: &HashSet<String>, gpu: &GpuBackend, prev_cpu: &mut Option<proc::CpuJiffies>) {
    if let Some(curr) = fs::read_to_string("/proc/stat").ok().and_then(|c| proc::parse_cpu_line(&c)) {
        let percent = prev_cpu.and_then(|p| proc::cpu_percent_delta(p, curr)).filter(|&v| v > 0.0 && v <= 100.0);
        merge(shared, "cpu_percent", available, percent);
        *prev_cpu = Some(curr);
    }

    let temp = hwmon::max_cpu_temp_celsius().filter(|&v| hwmon::plausible_cpu_temp(v));
    merge(shared, "cpu_temp", available, temp);

    let freq = fs::read_to_string("/proc/cpuinfo").ok().and_then(|c| proc::parse_cpu_mhz(&c)).filter(|&v| v > 0.0);
    merge(shared, "cpu_freq", available, freq);

    if gpu.is_available() {
        let sample = gpu.sample();
        merge(shared, "gpu_temp", available, sample.temp_c);
        merge(shared, "gpu_usage", available, sample.usage_percent);
        merge(shared, "gpu_clock", available, sample.clock_mhz);
        merge(shared, "gpu_fan", available, sample.fan);
    }
}

fn sample_slow(shared: &Shared, available: &HashSet<String>) {
    let count = std::thread::available_parallelism().ok().map(|n| n.get() as f64);
    merge(shared, "cpu_count", available, count);

    if let Some(mem) = fs::read_to_string("/proc/meminfo").ok().and_then(|c| proc::parse_meminfo(&c)) {
        merge(shared, "mem_percent", available, mem.percent());
        merge(shared, "mem_used_gb", available, Some(mem.used_gb()));
    }

    if let Some(totals) = disk::disk_totals() {
        merge(shared, "disk_percent", available, totals.percent_used());
        merge(shared, "disk_free_gb", available, Some(totals.free_gb()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_ignores_keys_outside_available_set() {
        let shared = Shared { snapshot: Mutex::new(MetricsSnapshot::new()), running: AtomicBool::new(false) };
        let available: HashSet<String> = HashSet::new();
        merge(&shared, "cpu_percent", &available, Some(50.0));
        assert!(shared.snapshot.lock().unwrap().is_empty());
    }

    #[test]
    fn merge_keeps_previous_value_on_none() {
        let shared = Shared { snapshot: Mutex::new(MetricsSnapshot::new()), running: AtomicBool::new(false) };
        let available: HashSet<String> = ["cpu_percent".to_string()].into_iter().collect();
        merge(&shared, "cpu_percent", &available, Some(12.5));
        merge(&shared, "cpu_percent", &available, None);
        assert_eq!(shared.snapshot.lock().unwrap().get("cpu_percent"), Some(&12.5));
    }

    #[test]
    fn available_metrics_stable_across_calls() {
        let poller = SystemInfoPoller::new();
        let a = poller.get_available_metrics();
        let b = poller.get_available_metrics();
        let (mut a, mut b) = (a, b);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}
