use serde::Serialize;

use super::super::domain::Priority;

pub const DEFAULT_HOT_THRESHOLD: i64 = 40;
pub const DEFAULT_WARM_THRESHOLD: i64 = 25;

/// Score cut-offs for the Hot and Warm tiers. Always satisfies `hot >= warm_min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    hot: i64,
    warm_min: i64,
}

impl Thresholds {
    pub fn new(hot: i64, warm_min: i64) -> Result<Self, ThresholdError> {
        if hot < warm_min {
            return Err(ThresholdError { hot, warm_min });
        }
        Ok(Self { hot, warm_min })
    }

    pub fn hot(&self) -> i64 {
        self.hot
    }

    pub fn warm_min(&self) -> i64 {
        self.warm_min
    }

    pub fn classify(&self, total_score: i64) -> Priority {
        classify(total_score, *self)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hot: DEFAULT_HOT_THRESHOLD,
            warm_min: DEFAULT_WARM_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("hot threshold {hot} must not be below warm threshold {warm_min}")]
pub struct ThresholdError {
    pub hot: i64,
    pub warm_min: i64,
}

pub fn classify(total_score: i64, thresholds: Thresholds) -> Priority {
    if total_score >= thresholds.hot {
        Priority::Hot
    } else if total_score >= thresholds.warm_min {
        Priority::Warm
    } else {
        Priority::Cold
    }
}
