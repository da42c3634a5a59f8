/// Maturity after growth: once an individual exceeds its own
/// length at maturity it stays mature.
pub fn is_mature(was_mature: bool, length: f64, lmat: f64) -> bool {
    was_mature || length > lmat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert!(!is_mature(false, 40.0, 40.0));
        assert!(is_mature(false, 40.1, 40.0));
    }

    #[test]
    fn maturity_is_kept() {
        assert!(is_mature(true, 0.0, 40.0));
    }
}
