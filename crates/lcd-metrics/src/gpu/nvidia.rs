//! NVIDIA GPU metrics via the management library (NVML), resolved at
//! runtime with `libloading` so this crate never links against it at build
//! time. Degrades silently to "unavailable" on any resolution or call
//! failure.

use std::ffi::c_void;
use std::os::raw::c_uint;
use std::path::Path;

use libloading::{Library, Symbol};

const VERSION_MARKER: &str = "/proc/driver/nvidia/version";

const SEARCH_PATHS: [&str; 3] = ["libnvidia-ml.so.1", "libnvidia-ml.so", "nvml.dll"];

type NvmlReturn = i32;
type NvmlDevice = *mut c_void;
const NVML_SUCCESS: NvmlReturn = 0;
const NVML_TEMPERATURE_GPU: c_uint = 0;
const NVML_CLOCK_GRAPHICS: c_uint = 0;

#[repr(C)]
struct NvmlUtilization {
    gpu: c_uint,
    memory: c_uint,
}

type FnInit = unsafe extern "C" fn() -> NvmlReturn;
type FnShutdown = unsafe extern "C" fn() -> NvmlReturn;
type FnDeviceGetCount = unsafe extern "C" fn(*mut c_uint) -> NvmlReturn;
type FnDeviceGetHandleByIndex = unsafe extern "C" fn(c_uint, *mut NvmlDevice) -> NvmlReturn;
type FnDeviceGetTemperature = unsafe extern "C" fn(NvmlDevice, c_uint, *mut c_uint) -> NvmlReturn;
type FnDeviceGetUtilizationRates = unsafe extern "C" fn(NvmlDevice, *mut NvmlUtilization) -> NvmlReturn;
type FnDeviceGetClockInfo = unsafe extern "C" fn(NvmlDevice, c_uint, *mut c_uint) -> NvmlReturn;
type FnDeviceGetFanSpeed = unsafe extern "C" fn(NvmlDevice, *mut c_uint) -> NvmlReturn;

/// Resolve `{base}_v2` first, falling back to the bare name, matching how
/// NVML versions symbols across driver releases.
unsafe fn resolve<'lib, T>(lib: &'lib Library, base: &str) -> Option<Symbol<'lib, T>> {
    let versioned = format!("{base}_v2\0");
    if let Ok(sym) = lib.get::<T>(versioned.as_bytes()) {
        return Some(sym);
    }
    let bare = format!("{base}\0");
    lib.get::<T>(bare.as_bytes()).ok()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NvidiaSample {
    pub temp_c: Option<f64>,
    pub usage_percent: Option<f64>,
    pub clock_mhz: Option<f64>,
    pub fan_percent: Option<f64>,
}

/// A resolved NVML binding with one device handle (index 0). Holds the
/// library alive for the process's lifetime; `Init`/`Shutdown` are NVML
/// session calls, not per-query.
pub struct NvidiaGpu {
    lib: Library,
    device: NvmlDevice,
}

impl NvidiaGpu {
    /// Probe for presence, load the library, call `Init`, and fetch device 0.
    /// Returns `None` on any failure -- "NVIDIA metrics unavailable".
    pub fn detect() -> Option<Self> {
        if !Path::new(VERSION_MARKER).exists() {
            return None;
        }
        for candidate in SEARCH_PATHS {
            if let Some(gpu) = Self::try_load(candidate) {
                return Some(gpu);
            }
        }
        log::warn!("lcd-metrics: /proc/driver/nvidia/version present but NVML could not be loaded");
        None
    }

    fn try_load(path: &str) -> Option<Self> {
        let lib = unsafe { Library::new(path) }.ok()?;
        unsafe {
            let init: Symbol<FnInit> = resolve(&lib, "nvmlInit")?;
            if init() != NVML_SUCCESS {
                return None;
            }
            let get_count: Symbol<FnDeviceGetCount> = resolve(&lib, "nvmlDeviceGetCount")?;
            let mut count: c_uint = 0;
            if get_count(&mut count) != NVML_SUCCESS || count == 0 {
                return None;
            }
            let get_handle: Symbol<FnDeviceGetHandleByIndex> = resolve(&lib, "nvmlDeviceGetHandleByIndex")?;
            let mut device: NvmlDevice = std::ptr::null_mut();
            if get_handle(0, &mut device) != NVML_SUCCESS {
                return None;
            }
            Some(NvidiaGpu { lib, device })
        }
    }

    pub fn sample(&self) -> NvidiaSample {
        unsafe {
            let temp_c = self.call_temperature();
            let (usage_percent, _mem) = self.call_utilization();
            let clock_mhz = self.call_clock();
            let fan_percent = self.call_fan();
            NvidiaSample { temp_c, usage_percent, clock_mhz, fan_percent }
        }
    }

    unsafe fn call_temperature(&self) -> Option<f64> {
        let f: Symbol<FnDeviceGetTemperature> = resolve(&self.lib, "nvmlDeviceGetTemperature")?;
        let mut v: c_uint = 0;
        (f(self.device, NVML_TEMPERATURE_GPU, &mut v) == NVML_SUCCESS).then_some(v as f64)
    }

    unsafe fn call_utilization(&self) -> (Option<f64>, Option<f64>) {
        let Some(f): Option<Symbol<FnDeviceGetUtilizationRates>> = resolve(&self.lib, "nvmlDeviceGetUtilizationRates")
        else {
            return (None, None);
        };
        let mut util = NvmlUtilization { gpu: 0, memory: 0 };
        if f(self.device, &mut util) == NVML_SUCCESS {
            (Some(util.gpu as f64), Some(util.memory as f64))
        } else {
            (None, None)
        }
    }

    unsafe fn call_clock(&self) -> Option<f64> {
        let f: Symbol<FnDeviceGetClockInfo> = resolve(&self.lib, "nvmlDeviceGetClockInfo")?;
        let mut v: c_uint = 0;
        (f(self.device, NVML_CLOCK_GRAPHICS, &mut v) == NVML_SUCCESS).then_some(v as f64)
    }

    unsafe fn call_fan(&self) -> Option<f64> {
        let f: Symbol<FnDeviceGetFanSpeed> = resolve(&self.lib, "nvmlDeviceGetFanSpeed")?;
        let mut v: c_uint = 0;
        (f(self.device, &mut v) == NVML_SUCCESS).then_some(v as f64)
    }
}

impl Drop for NvidiaGpu {
    fn drop(&mut self) {
        unsafe {
            if let Some(shutdown) = resolve::<FnShutdown>(&self.lib, "nvmlShutdown") {
                let _ = shutdown();
            }
        }
    }
}
