//! Wastage arithmetic shared by assignments and staff statistics.

/// Round to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Running wastage rate of a batch: share of the assigned doses no longer on
/// hand, in percent, rounded to two decimals.
///
/// Returns `0.0` when nothing was assigned.
pub fn wastage_rate(assigned_quantity: i64, remaining_quantity: i64) -> f64 {
    if assigned_quantity <= 0 {
        return 0.0;
    }
    let used = (assigned_quantity - remaining_quantity) as f64;
    round2(used / assigned_quantity as f64 * 100.0)
}

/// Render a percentage with two decimals and a `%` suffix (`"40.00%"`).
pub fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_without_assignment() {
        assert_eq!(wastage_rate(0, 0), 0.0);
        assert_eq!(wastage_rate(-3, 0), 0.0);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        assert_eq!(wastage_rate(5, 3), 40.0);
        assert_eq!(wastage_rate(3, 2), 33.33);
        assert_eq!(wastage_rate(3, 1), 66.67);
        assert_eq!(wastage_rate(5, 0), 100.0);
    }

    #[test]
    fn percentage_formatting() {
        assert_eq!(format_percentage(40.0), "40.00%");
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(66.666), "66.67%");
    }
}
