//! Entry-price derivation for ladder levels.

/// Calculates the entry price of a ladder level by geometric compounding of
/// the step percentage from the reference price.
///
/// * `reference_price` - The price level 0 is anchored at.
/// * `step` - Fractional step between levels (0.02 = 2%). Must be in (0, 1).
/// * `index` - Level index, 0 is the top of the ladder.
///
/// `entry_price_at(ref, step, i) = ref * (1 - step)^i`, monotonically
/// decreasing in `index`. Index 0 returns `reference_price` exactly.
pub fn entry_price_at(reference_price: f64, step: f64, index: u32) -> f64 {
    if index == 0 {
        return reference_price;
    }
    reference_price * (1.0 - step).powi(index as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_zero_is_reference_exactly() {
        assert_eq!(entry_price_at(100.0, 0.02, 0), 100.0);
        assert_eq!(entry_price_at(1234.5678, 0.05, 0), 1234.5678);
    }

    #[test]
    fn test_geometric_ladder_law() {
        // entry(i) = entry(i-1) * (1 - step) for all i >= 1
        let (reference, step) = (100.0, 0.02);
        for i in 1..50u32 {
            let prev = entry_price_at(reference, step, i - 1);
            let cur = entry_price_at(reference, step, i);
            assert!(
                (cur - prev * (1.0 - step)).abs() < 1e-9,
                "law violated at index {}: {} vs {}",
                i,
                cur,
                prev * (1.0 - step)
            );
        }
    }

    #[test]
    fn test_monotonically_decreasing() {
        let (reference, step) = (250.0, 0.01);
        let mut last = f64::INFINITY;
        for i in 0..40u32 {
            let price = entry_price_at(reference, step, i);
            assert!(price < last, "not decreasing at index {}", i);
            assert!(price > 0.0);
            last = price;
        }
    }

    #[test]
    fn test_two_percent_ladder_values() {
        // 100, 98, 96.04 for step = 2%
        assert!((entry_price_at(100.0, 0.02, 1) - 98.0).abs() < 1e-9);
        assert!((entry_price_at(100.0, 0.02, 2) - 96.04).abs() < 1e-9);
    }
}
