// weathervane-server/src/budget.rs
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use weathervane_common::ServiceError;

/// On-disk counter state: `{"count": N, "month": M}`, read and rewritten
/// wholesale on every consumed call. No atomicity guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterState {
    count: u32,
    month: u32,
}

impl CounterState {
    fn fresh(month: u32) -> Self {
        CounterState { count: 0, month }
    }
}

/// Monthly budget for upstream weather API calls, persisted to a small
/// JSON file. The count resets when the calendar month changes.
pub struct CallBudget {
    path: PathBuf,
    limit: u32,
    // Serializes the read-modify-write cycle within this process.
    lock: Mutex<()>,
}

impl CallBudget {
    pub fn new(path: impl Into<PathBuf>, limit: u32) -> Self {
        CallBudget {
            path: path.into(),
            limit,
            lock: Mutex::new(()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Consume one call from this month's budget and return the new count,
    /// or reject with `QuotaExceeded` when the budget is spent. A failed
    /// save is logged and the call still goes through.
    pub fn try_consume(&self) -> Result<u32, ServiceError> {
        let _guard = self.lock.lock().unwrap();
        let current_month = Utc::now().month();

        let mut counter = self.load();
        if counter.month != current_month {
            counter = CounterState::fresh(current_month);
        }
        if counter.count >= self.limit {
            return Err(ServiceError::QuotaExceeded {
                limit: self.limit,
                count: counter.count,
            });
        }

        counter.count += 1;
        if let Err(e) = self.save(&counter) {
            warn!("Could not save API call counter to {}: {}", self.path.display(), e);
        }
        Ok(counter.count)
    }

    /// Current count without consuming, for response metadata.
    pub fn current_count(&self) -> u32 {
        let _guard = self.lock.lock().unwrap();
        let counter = self.load();
        if counter.month == Utc::now().month() {
            counter.count
        } else {
            0
        }
    }

    fn load(&self) -> CounterState {
        match fs::read_to_string(&self.path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Malformed counter file {}: {}", self.path.display(), e);
                CounterState::fresh(Utc::now().month())
            }),
            Err(_) => CounterState::fresh(Utc::now().month()),
        }
    }

    fn save(&self, counter: &CounterState) -> io::Result<()> {
        fs::write(&self.path, serde_json::to_string(counter)?.as_bytes())
    }
}
