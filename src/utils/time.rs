use std::time::Duration;

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

pub fn format_datetime(time: impl Into<DateTime<Local>>) -> String {
    time.into().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Rejects negative, NaN and overflowing values instead of panicking.
pub fn duration_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| Error::InvalidDelay(secs))
}
