#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::FourPillars;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the canonical pillar text; recorded in stage evidence so a
/// persisted row can be matched to the exact chart that produced it.
pub fn pillars_sha256(pillars: &FourPillars) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pillars.canonical().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_order_sensitive() {
        let a = FourPillars::parse("甲子,丙寅,戊辰,庚午").unwrap();
        let b = FourPillars::parse("丙寅,甲子,戊辰,庚午").unwrap();
        assert_eq!(pillars_sha256(&a), pillars_sha256(&a.clone()));
        assert_ne!(pillars_sha256(&a), pillars_sha256(&b));
        assert_eq!(pillars_sha256(&a).len(), 64);
    }
}
