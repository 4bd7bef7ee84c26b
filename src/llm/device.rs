//! Execution-mode hint for the completion endpoint.
//!
//! The hint is advisory. It is resolved once per call from what the host
//! exposes; a GPU request on a host without a GPU driver runs on CPU.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Driver nodes whose presence means a GPU can be used.
const GPU_MARKERS: [&str; 4] = [
    "/proc/driver/nvidia/version",
    "/dev/nvidia0",
    "/dev/dxg",
    "/dev/kfd",
];

/// Requested execution mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// GPU when available, otherwise CPU.
    #[default]
    Auto,
    /// Prefer the GPU; falls back to CPU when none is present.
    Gpu,
    /// Always run on CPU.
    Cpu,
}

/// Where a call actually runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Device {
    /// GPU offload (endpoint default).
    Gpu,
    /// CPU only.
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => f.write_str("cuda"),
            Self::Cpu => f.write_str("cpu"),
        }
    }
}

impl ExecutionMode {
    /// Resolve the mode against the current host.
    #[must_use]
    pub fn resolve(self) -> Device {
        self.resolve_with(gpu_available())
    }

    /// Resolve the mode given whether a GPU is present.
    #[must_use]
    pub const fn resolve_with(self, gpu_present: bool) -> Device {
        match self {
            Self::Cpu => Device::Cpu,
            Self::Auto | Self::Gpu => {
                if gpu_present {
                    Device::Gpu
                } else {
                    Device::Cpu
                }
            }
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

fn gpu_available() -> bool {
    GPU_MARKERS.iter().any(|marker| Path::new(marker).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_falls_back_to_cpu() {
        assert_eq!(ExecutionMode::Gpu.resolve_with(false), Device::Cpu);
        assert_eq!(ExecutionMode::Gpu.resolve_with(true), Device::Gpu);
        assert_eq!(ExecutionMode::Auto.resolve_with(true), Device::Gpu);
        assert_eq!(ExecutionMode::Cpu.resolve_with(true), Device::Cpu);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("GPU".parse::<ExecutionMode>(), Ok(ExecutionMode::Gpu));
        assert_eq!("cuda".parse::<ExecutionMode>(), Ok(ExecutionMode::Gpu));
        assert_eq!(" cpu ".parse::<ExecutionMode>(), Ok(ExecutionMode::Cpu));
        assert!("tpu".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Gpu.to_string(), "cuda");
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }
}
