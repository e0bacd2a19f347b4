//! System load sampling for adaptive batch and top-K sizing.
//!
//! The probe is advisory: it changes how generous retrieval and
//! ingestion are allowed to be, it never delays or rejects work.

use std::sync::Mutex;

use sysinfo::System;

/// CPU usage above which the system counts as loaded.
pub const CPU_LOAD_THRESHOLD: f32 = 80.0;

/// Memory usage above which the system counts as loaded.
pub const MEMORY_LOAD_THRESHOLD: f32 = 80.0;

/// One point-in-time reading of host utilization.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

impl LoadSample {
    pub fn under_load(&self) -> bool {
        self.cpu_percent > CPU_LOAD_THRESHOLD || self.memory_percent > MEMORY_LOAD_THRESHOLD
    }
}

/// Capacity-hint provider. Implementations must not block.
pub trait LoadProbe: Send + Sync {
    fn sample(&self) -> LoadSample;
}

/// OS-metrics-backed probe.
///
/// CPU usage is computed between consecutive refreshes, so the first
/// sample after construction reads near zero; acceptable for an
/// advisory signal.
pub struct SystemProbe {
    system: Mutex<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadProbe for SystemProbe {
    fn sample(&self) -> LoadSample {
        let mut system = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            system.used_memory() as f32 / total as f32 * 100.0
        };

        LoadSample {
            cpu_percent: system.global_cpu_usage(),
            memory_percent,
        }
    }
}

/// Fixed-reading probe for tests and single-tenant deployments.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub LoadSample);

impl StaticProbe {
    /// A probe that always reports an idle host.
    pub fn idle() -> Self {
        Self(LoadSample::default())
    }

    /// A probe that always reports a saturated host.
    pub fn saturated() -> Self {
        Self(LoadSample {
            cpu_percent: 100.0,
            memory_percent: 100.0,
        })
    }
}

impl LoadProbe for StaticProbe {
    fn sample(&self) -> LoadSample {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_load_thresholds() {
        assert!(!LoadSample::default().under_load());
        assert!(
            LoadSample {
                cpu_percent: 90.0,
                memory_percent: 10.0
            }
            .under_load()
        );
        assert!(
            LoadSample {
                cpu_percent: 10.0,
                memory_percent: 95.0
            }
            .under_load()
        );
    }

    #[test]
    fn test_static_probe() {
        assert!(!StaticProbe::idle().sample().under_load());
        assert!(StaticProbe::saturated().sample().under_load());
    }

    #[test]
    fn test_system_probe_sample_is_sane() {
        let probe = SystemProbe::new();
        let sample = probe.sample();
        assert!(sample.memory_percent >= 0.0);
        assert!(sample.memory_percent <= 100.0);
    }
}
