//! Seasonally oscillating von Bertalanffy growth.

use std::f64::consts::PI;

/// Seasonal parameters shared by every individual.
#[derive(Debug, Clone, Copy)]
pub struct Seasonality {
    /// Summer point, as a fraction of the year.
    pub ts: f64,
    /// Oscillation strength in `[0, 1]`.
    pub c: f64,
}

/// Length at `t2` of an individual of length `l1` at `t1`.
///
/// With `c <= 1` and `l1 <= linf` the increment is never negative.
pub fn length_increment(linf: f64, k: f64, season: Seasonality, l1: f64, t1: f64, t2: f64) -> f64 {
    let s_t1 = season.c * k / (2.0 * PI) * (2.0 * PI * (t1 - season.ts)).sin();
    let s_t2 = season.c * k / (2.0 * PI) * (2.0 * PI * (t2 - season.ts)).sin();
    l1 + (linf - l1) * (1.0 - (-(k * (t2 - t1) + s_t2 - s_t1)).exp())
}

/// Power-law weight at a given length.
pub fn weight_at_length(length: f64, a: f64, b: f64) -> f64 {
    a * length.powf(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_SEASON: Seasonality = Seasonality { ts: 0.0, c: 0.0 };

    #[test]
    fn matches_plain_von_bertalanffy_without_seasonality() {
        let (linf, k) = (80.0, 0.5);
        let l = length_increment(linf, k, NO_SEASON, 0.0, 0.0, 2.0);
        let expected = linf * (1.0 - (-k * 2.0_f64).exp());
        assert!((l - expected).abs() < 1e-12, "l = {l}, expected = {expected}");
    }

    #[test]
    fn increments_compose() {
        let season = Seasonality { ts: 0.3, c: 0.85 };
        let direct = length_increment(80.0, 0.5, season, 5.0, 0.0, 1.0);
        let half = length_increment(80.0, 0.5, season, 5.0, 0.0, 0.5);
        let stepped = length_increment(80.0, 0.5, season, half, 0.5, 1.0);
        assert!((direct - stepped).abs() < 1e-9);
    }

    #[test]
    fn never_shrinks_with_full_oscillation() {
        let season = Seasonality { ts: 0.5, c: 1.0 };
        let dt = 1.0 / 52.0;
        let mut l = 0.0;
        for i in 0..520 {
            let t1 = i as f64 * dt;
            let l2 = length_increment(60.0, 0.8, season, l, t1, t1 + dt);
            assert!(l2 >= l - 1e-12, "shrank from {l} to {l2} at t = {t1}");
            assert!(l2 <= 60.0);
            l = l2;
        }
    }

    #[test]
    fn weight_follows_power_law() {
        assert_eq!(weight_at_length(0.0, 0.01, 3.0), 0.0);
        assert!((weight_at_length(10.0, 0.01, 3.0) - 10.0).abs() < 1e-12);
    }
}
