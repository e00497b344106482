/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute download progress as a fraction in `0.0..=1.0`.
/// Unknown totals report zero progress rather than guessing.
#[must_use]
pub fn progress_fraction(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_speed_human_readable() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2_048.0), "2.0 KB/s");
        assert_eq!(format_speed(5_242_880.0), "5.0 MB/s");
    }

    #[test]
    fn calculates_progress_fraction() {
        assert_eq!(progress_fraction(0, Some(10)), 0.0);
        assert_eq!(progress_fraction(5, Some(10)), 0.5);
        assert_eq!(progress_fraction(10, Some(10)), 1.0);
        assert_eq!(progress_fraction(20, Some(10)), 1.0);
        assert_eq!(progress_fraction(5, None), 0.0);
    }
}
