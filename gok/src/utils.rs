//! Utility functions

use std::time::Duration;

use bytesize::ByteSize;

const MIB: f64 = 1024.0 * 1024.0;

/// Format a byte count using binary units, e.g. `12.0 MiB`
pub fn humanize_bytes(bytes: u64) -> String {
    ByteSize::b(bytes).to_string_as(true)
}

/// Round a duration to whole seconds, half away from zero
pub fn round_to_seconds(duration: Duration) -> Duration {
    Duration::from_secs((duration.as_millis() as u64 + 500) / 1000)
}

/// Render a whole-second duration as `1h2m3s`, `1m5s` or `3s`
pub fn format_duration(duration: Duration) -> String {
    let total = round_to_seconds(duration).as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Throughput in MiB/s; zero when no time has elapsed
pub fn throughput_mib_per_sec(bytes: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs / MIB
}

/// One-line summary printed after an upload completes
pub fn transfer_summary(name: &str, bytes: u64, duration: Duration) -> String {
    format!(
        "Transferred {} ({}) at {:.2} MiB/s (total: {})",
        name,
        humanize_bytes(bytes),
        throughput_mib_per_sec(bytes, duration),
        format_duration(duration),
    )
}
