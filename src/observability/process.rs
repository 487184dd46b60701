//! Resource usage of the running process.

use sysinfo::{Pid, System};

/// Samples this process's resident memory as a share of total system memory.
pub struct MemorySampler {
    system: System,
    pid: Option<Pid>,
}

impl MemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Cannot resolve own pid, memory usage will read 0");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
        }
    }

    /// Resident memory in percent of total memory, `0.0..=100.0`.
    pub fn memory_percent(&mut self) -> f64 {
        let Some(pid) = self.pid else {
            return 0.0;
        };

        self.system.refresh_memory();
        if !self.system.refresh_process(pid) {
            return 0.0;
        }

        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }

        let resident = self
            .system
            .process(pid)
            .map(|process| process.memory())
            .unwrap_or(0);

        (resident as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}
