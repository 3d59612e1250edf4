//! Pure line -> progress matching.

use regex::Regex;
use std::sync::LazyLock;

/// Marker that precedes every download progress line.
const DOWNLOAD_MARKER: &str = "[download]";

/// Fields extracted from one `[download]` progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDelta {
    /// Percent / 100, clamped to [0.0, 1.0].
    pub fraction: f64,
    /// Display string as printed, e.g. `00:05`.
    pub eta: Option<String>,
    /// Display string as printed, e.g. `2.00MiB/s`.
    pub speed: Option<String>,
    /// Total size from `of <size>`, in bytes.
    pub total_bytes: Option<u64>,
}

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").expect("percent pattern"));

static ETA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ETA\s+(\d+(?::\d+)+)").expect("eta pattern"));

static SPEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+(\d+(?:\.\d+)?\w+/s)").expect("speed pattern"));

static SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bof\s+~?\s*(\d+(?:\.\d+)?)\s*([KMGT]i?B|B)\b").expect("size pattern")
});

static DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:\[download\] Destination: (.+)|\[download\] (.+) has already been downloaded|\[Merger\] Merging formats into "(.+)")$"#,
    )
    .expect("destination pattern")
});

/// Parses a progress line such as
/// `[download]  23.5% of 10.00MiB at 2.00MiB/s ETA 00:05`.
///
/// Returns `None` for lines without the `[download]` marker or without a
/// percentage; such lines never change job state.
pub fn parse_progress(line: &str) -> Option<ProgressDelta> {
    if !line.contains(DOWNLOAD_MARKER) {
        return None;
    }
    let caps = PERCENT.captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    let eta = ETA
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let speed = SPEED
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let total_bytes = SIZE
        .captures(line)
        .and_then(|c| parse_size(c.get(1)?.as_str(), c.get(2)?.as_str()));
    Some(ProgressDelta {
        fraction: (percent / 100.0).clamp(0.0, 1.0),
        eta,
        speed,
        total_bytes,
    })
}

/// Output file reported by a `Destination:`, `has already been downloaded`,
/// or `Merging formats into` line.
pub fn parse_destination(line: &str) -> Option<&str> {
    let caps = DESTINATION.captures(line.trim_end())?;
    (1..=3)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str())
}

/// Converts a size such as (`10.00`, `MiB`) to bytes. Binary (`KiB`) and
/// decimal (`KB`) units are both accepted.
pub fn parse_size(number: &str, unit: &str) -> Option<u64> {
    let value: f64 = number.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };
    Some((value * multiplier).round() as u64)
}
