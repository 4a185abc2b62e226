// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Critical-failure policy
//!
//! A handful of schema writes (the pruning-offset ledger) treat persistence
//! failure as unrecoverable: an inconsistent retention boundary risks silent
//! data loss, so the node prefers to crash. Rather than reaching for a
//! process-wide logger with a terminating log level, the policy is an
//! explicit object threaded into the write path, which keeps the
//! crash-over-corruption trade-off visible at every call site and lets tests
//! substitute a non-terminating variant.

use crate::kv::StoreError;
use std::process;
use std::thread;
use std::time::Duration;

/// Policy invoked when a must-not-fail persistence operation fails
///
/// Implementations never return; the caller's control flow ends at the
/// `crit` call.
pub trait CritPolicy: Send + Sync {
    /// Report the failure and terminate the current execution path
    fn crit(&self, msg: &str, err: &StoreError) -> !;
}

/// Production policy: log at error level, wait a grace delay, exit
///
/// The grace delay gives the logging backend a chance to flush before the
/// process goes down, mirroring the terminating log level of the original
/// node software.
#[derive(Debug, Clone)]
pub struct ExitOnCrit {
    grace: Duration,
}

impl ExitOnCrit {
    /// Policy with the standard 3 second grace delay
    pub fn new() -> Self {
        Self {
            grace: Duration::from_secs(3),
        }
    }

    /// Policy with a caller-chosen grace delay
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for ExitOnCrit {
    fn default() -> Self {
        Self::new()
    }
}

impl CritPolicy for ExitOnCrit {
    fn crit(&self, msg: &str, err: &StoreError) -> ! {
        tracing::error!(error = %err, "{msg}");
        thread::sleep(self.grace);
        process::exit(1);
    }
}

/// Test policy: panic instead of exiting
///
/// Panicking keeps the divergent contract while remaining observable from a
/// test harness. Also suitable for embedders that run their own shutdown
/// handling and catch unwinds at a boundary.
#[derive(Debug, Clone, Default)]
pub struct PanicOnCrit;

impl CritPolicy for PanicOnCrit {
    fn crit(&self, msg: &str, err: &StoreError) -> ! {
        panic!("{msg}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "failed to persist")]
    fn test_panic_policy_panics_with_context() {
        let policy = PanicOnCrit;
        policy.crit("failed to persist", &StoreError::Backend("disk full".into()));
    }

    #[test]
    fn test_exit_policy_grace_is_configurable() {
        let policy = ExitOnCrit::with_grace(Duration::from_millis(10));
        assert_eq!(policy.grace, Duration::from_millis(10));
    }
}
