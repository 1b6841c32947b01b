//! Version strings as they appear in artifact filenames and the index.
//!
//! Versions are dot/dash separated numeric components (`1.2-3`). There is no
//! constraint solving anywhere in offpkg, so all this module needs is an
//! ordering to pick the newest of several index entries.

use std::cmp::Ordering;

fn components(v: &str) -> Vec<u64> {
    v.split(['.', '-'])
        .map(|s| s.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two versions component-wise, padding the shorter with zeros.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = components(a);
    let b_parts = components(b);

    for i in 0..std::cmp::max(a_parts.len(), b_parts.len()) {
        let av = a_parts.get(i).unwrap_or(&0);
        let bv = b_parts.get(i).unwrap_or(&0);
        match av.cmp(bv) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    Ordering::Equal
}

/// Returns true if `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_components() {
        assert!(is_newer("1.2-3", "1.2-10"));
        assert!(is_newer("1.2-10", "1.3"));
        assert!(!is_newer("1.3", "1.2-10"));
    }

    #[test]
    fn test_padding() {
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0"), Ordering::Greater);
    }
}
