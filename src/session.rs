use crate::error::{VitalError, VitalResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Final session result, one field per pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate: i32,
    pub respiratory_rate: i32,
}

/// Holds the session's vitals until they are handed off for persistence.
///
/// Each field has exactly one writer, from its own measurement phase, and
/// the phases run sequentially. Partial results are acceptable: unwritten
/// fields stay at 0 and are carried forward.
#[derive(Clone)]
pub struct VitalsAggregator {
    vitals: Arc<Mutex<VitalSigns>>,
}

impl VitalsAggregator {
    pub fn new() -> Self {
        VitalsAggregator {
            vitals: Arc::new(Mutex::new(VitalSigns::default())),
        }
    }

    pub fn set_respiratory_rate(&self, rate: i32) -> VitalResult<()> {
        let mut vitals = self.vitals.lock().map_err(|_| {
            VitalError::Internal("Failed to acquire vitals lock".to_string())
        })?;
        vitals.respiratory_rate = rate;
        Ok(())
    }

    pub fn set_heart_rate(&self, rate: i32) -> VitalResult<()> {
        let mut vitals = self.vitals.lock().map_err(|_| {
            VitalError::Internal("Failed to acquire vitals lock".to_string())
        })?;
        vitals.heart_rate = rate;
        Ok(())
    }

    /// Read-only snapshot for the persistence handoff.
    pub fn snapshot(&self) -> VitalResult<VitalSigns> {
        let vitals = self.vitals.lock().map_err(|_| {
            VitalError::Internal("Failed to acquire vitals lock".to_string())
        })?;
        Ok(*vitals)
    }
}

impl Default for VitalsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
