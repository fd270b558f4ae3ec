//! Human-readable formatting for upload progress
//!
//! Byte counts, transfer rates and remaining-time estimates are shown to the
//! operator while a ledger file is scanned and uploaded. All formatting goes
//! through this module so every progress line looks the same.

const KIB: f64 = 1024.0;
const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Format a byte count using binary units.
///
/// Values below 1 KiB are printed as whole bytes, everything else with two
/// decimals in the largest unit that keeps the value >= 1.
///
/// # Examples
///
/// ```
/// use spedup_common::human_time::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KiB");
/// assert_eq!(format_bytes(4_718_592), "4.50 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if (bytes as f64) < KIB {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / KIB;
    let mut unit = 0;
    while value >= KIB && unit < UNITS.len() - 1 {
        value /= KIB;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Format a transfer rate given in bytes per second.
///
/// # Examples
///
/// ```
/// use spedup_common::human_time::format_rate;
///
/// assert_eq!(format_rate(2_097_152.0), "2.00 MiB/s");
/// assert_eq!(format_rate(0.0), "0 B/s");
/// ```
pub fn format_rate(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_bytes(bytes_per_second.round() as u64))
}

/// Format an estimated remaining time.
///
/// `None` means the estimate is not available yet (no throughput measured),
/// which is rendered as `unknown`. Durations under one hour use `M:SS`,
/// longer ones `H:MM:SS`.
///
/// # Examples
///
/// ```
/// use spedup_common::human_time::format_eta;
///
/// assert_eq!(format_eta(None), "unknown");
/// assert_eq!(format_eta(Some(75)), "1:15");
/// assert_eq!(format_eta(Some(3661)), "1:01:01");
/// ```
pub fn format_eta(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return "unknown".to_string();
    };

    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format an elapsed wall-clock duration with one decimal of seconds.
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let total = elapsed.as_secs_f64();
    if total < 60.0 {
        format!("{:.1}s", total)
    } else {
        format_eta(Some(total.round() as u64))
    }
}
