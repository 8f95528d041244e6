//! Host descriptors captured once per run and attached to every result row

use std::process::Command;

use sysinfo::System;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    pub cpu: Option<String>,
    pub ram_total_bytes: Option<u64>,
    /// One entry per GPU found; empty when none could be detected.
    pub gpus: Vec<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
}

impl SystemInfo {
    /// Query the host. Never fails: anything that cannot be determined is left empty.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let cpu = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty());
        let ram_total_bytes = Some(sys.total_memory()).filter(|&m| m > 0);
        let info = Self {
            cpu,
            ram_total_bytes,
            gpus: detect_gpus(),
            os: System::name(),
            os_version: System::os_version(),
        };
        tracing::info!(
            target: "sysinfo",
            "cpu={} ram={} gpu={} os={} {}",
            info.cpu_info(),
            info.ram_total_gib().map(|g| format!("{g:.2} GiB")).unwrap_or_else(|| "N/A".into()),
            if info.gpus.is_empty() { "N/A".to_string() } else { info.gpu_info() },
            info.os.as_deref().unwrap_or("unknown"),
            info.os_version.as_deref().unwrap_or(""),
        );
        info
    }

    pub fn cpu_info(&self) -> String { self.cpu.clone().unwrap_or_default() }

    pub fn ram_total_gib(&self) -> Option<f64> { self.ram_total_bytes.map(|b| b as f64 / GIB) }

    pub fn gpu_info(&self) -> String { self.gpus.join("; ") }
}

fn detect_gpus() -> Vec<String> {
    #[cfg(feature = "nvidia")]
    {
        let gpus = nvml_gpus();
        if !gpus.is_empty() {
            return gpus;
        }
    }
    nvidia_smi_gpus()
}

#[cfg(feature = "nvidia")]
fn nvml_gpus() -> Vec<String> {
    let nvml = match nvml_wrapper::Nvml::init() {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(target: "sysinfo", "nvml unavailable: {e}");
            return Vec::new();
        }
    };
    let count = nvml.device_count().unwrap_or(0);
    (0..count)
        .filter_map(|i| nvml.device_by_index(i).ok())
        .filter_map(|d| d.name().ok())
        .collect()
}

fn nvidia_smi_gpus() -> Vec<String> {
    match Command::new("nvidia-smi").args(["--query-gpu=name", "--format=csv,noheader"]).output() {
        Ok(out) if out.status.success() => parse_gpu_names(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            tracing::warn!(
                target: "sysinfo",
                "nvidia-smi failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(target: "sysinfo", "nvidia-smi not found; GPU info unavailable");
            Vec::new()
        }
    }
}

fn parse_gpu_names(stdout: &str) -> Vec<String> {
    stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect()
}
