//! Unifies the three GPU backends behind one detection + sampling surface.
//! AMD is preferred, then Intel, then NVIDIA: whichever is detected first
//! at startup is the one sampled for the lifetime of the poller.

mod amd;
mod intel;
mod nvidia;

pub use amd::AmdSample;
pub use nvidia::NvidiaSample;

/// One combined reading from whichever GPU backend was selected at startup.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuSample {
    pub temp_c: Option<f64>,
    pub usage_percent: Option<f64>,
    pub clock_mhz: Option<f64>,
    pub fan: Option<f64>,
}

enum Backend {
    Amd,
    Intel,
    Nvidia(nvidia::NvidiaGpu),
}

/// The GPU backend detected once at startup. `None` if no supported GPU
/// was found.
pub struct GpuBackend(Option<Backend>);

impl GpuBackend {
    pub fn detect() -> Self {
        if amd::detect() {
            log::debug!("lcd-metrics: AMD GPU detected via amdgpu hwmon chip");
            return GpuBackend(Some(Backend::Amd));
        }
        if intel::detect() {
            log::debug!("lcd-metrics: Intel GPU detected via gt0 sysfs node");
            return GpuBackend(Some(Backend::Intel));
        }
        if let Some(nv) = nvidia::NvidiaGpu::detect() {
            log::debug!("lcd-metrics: NVIDIA GPU detected via NVML");
            return GpuBackend(Some(Backend::Nvidia(nv)));
        }
        GpuBackend(None)
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    pub fn sample(&self) -> GpuSample {
        match &self.0 {
            Some(Backend::Amd) => {
                let s = amd::sample();
                GpuSample { temp_c: s.temp_c, usage_percent: s.usage_percent, clock_mhz: s.clock_mhz, fan: s.fan_raw }
            }
            Some(Backend::Intel) => GpuSample { clock_mhz: intel::clock_mhz(), ..GpuSample::default() },
            Some(Backend::Nvidia(nv)) => {
                let s = nv.sample();
                GpuSample { temp_c: s.temp_c, usage_percent: s.usage_percent, clock_mhz: s.clock_mhz, fan: s.fan_percent }
            }
            None => GpuSample::default(),
        }
    }
}
