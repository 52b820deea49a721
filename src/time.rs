use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Local wall-clock time as `HH:MM:SS`, used in broadcast event payloads.
pub fn wall_clock_hms() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
