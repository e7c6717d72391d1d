//! Seven-region overlap counts between peaklist1 (A), expression (B) and
//! peaklist2 (C).
use std::collections::HashSet;
use std::hash::Hash;

use clap::ValueEnum;
use log::{info, warn};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Counting {
    /// exact counts from the distinct key sets
    Sets,
    /// subtraction of deduplicated join sizes (peaks_DEG compatible, may go negative)
    Legacy,
}

/// Table sizes consumed by the legacy arithmetic.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct JoinSizes {
    /// |dedup(peaklist1)|
    pub peaklist1: usize,
    /// |dedup(peaklist2)|
    pub peaklist2: usize,
    /// |expression|, not deduplicated
    pub expression: usize,
    /// |dedup(peaklist1 ⋈ peaklist2)|
    pub shared: usize,
    /// |dedup(shared ⋈ expression)|
    pub triple: usize,
    /// |dedup(peaklist1 ⋈ expression)|
    pub peaklist1_expression: usize,
    /// |dedup(peaklist2 ⋈ expression)|
    pub peaklist2_expression: usize,
}

/// Mutually exclusive region sizes.
///
/// Legacy counts may be negative when keys repeat across tables; the
/// diagram clamps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlapCounts {
    pub peaklist1_only: i64,
    pub expression_only: i64,
    pub peaklist1_expression: i64,
    pub peaklist2_only: i64,
    pub peaklist1_peaklist2: i64,
    pub peaklist2_expression: i64,
    pub all_three: i64,
}

impl OverlapCounts {
    /// Region sizes derived by subtraction. An approximation: many-to-many
    /// keys can push regions below zero.
    pub fn legacy(sizes: &JoinSizes) -> Self {
        let shared = sizes.shared as i64;
        let triple = sizes.triple as i64;
        let p1_expr = sizes.peaklist1_expression as i64;
        let p2_expr = sizes.peaklist2_expression as i64;

        let excl_p1_expr = p1_expr - triple;
        let excl_p2_expr = p2_expr - triple;

        OverlapCounts {
            peaklist1_only: sizes.peaklist1 as i64 - shared - excl_p1_expr,
            expression_only: sizes.expression as i64 - p1_expr - excl_p2_expr,
            peaklist1_expression: excl_p1_expr,
            peaklist2_only: sizes.peaklist2 as i64 - shared - excl_p2_expr,
            peaklist1_peaklist2: shared - triple,
            peaklist2_expression: excl_p2_expr,
            all_three: triple,
        }
    }

    /// Exact counts: every distinct key lands in the one region matching
    /// its membership.
    pub fn from_key_sets<K: Eq + Hash>(
        peaklist1: &HashSet<K>,
        peaklist2: &HashSet<K>,
        expression: &HashSet<K>,
    ) -> Self {
        let mut counts = OverlapCounts::default();
        let union = peaklist1.iter().chain(peaklist2).chain(expression);
        let mut seen: HashSet<&K> = HashSet::new();
        for key in union {
            if !seen.insert(key) {
                continue;
            }
            let region = match (
                peaklist1.contains(key),
                expression.contains(key),
                peaklist2.contains(key),
            ) {
                (true, false, false) => &mut counts.peaklist1_only,
                (false, true, false) => &mut counts.expression_only,
                (true, true, false) => &mut counts.peaklist1_expression,
                (false, false, true) => &mut counts.peaklist2_only,
                (true, false, true) => &mut counts.peaklist1_peaklist2,
                (false, true, true) => &mut counts.peaklist2_expression,
                (true, true, true) => &mut counts.all_three,
                (false, false, false) => continue,
            };
            *region += 1;
        }
        counts
    }

    /// Regions in `matplotlib_venn.venn3` order: Abc, aBc, ABc, abC, AbC, aBC, ABC.
    pub fn as_venn3(&self) -> [i64; 7] {
        [
            self.peaklist1_only,
            self.expression_only,
            self.peaklist1_expression,
            self.peaklist2_only,
            self.peaklist1_peaklist2,
            self.peaklist2_expression,
            self.all_three,
        ]
    }

    pub fn has_negative(&self) -> bool {
        self.as_venn3().iter().any(|&c| c < 0)
    }

    /// Log the counts, warning about impossible (negative) regions.
    pub fn report(&self) {
        info!("peaklist1 only: {}", self.peaklist1_only);
        info!("peaklist2 only: {}", self.peaklist2_only);
        info!("expression only: {}", self.expression_only);
        info!("peaklist1 & peaklist2, not expressed: {}", self.peaklist1_peaklist2);
        info!("peaklist1 & expression only: {}", self.peaklist1_expression);
        info!("peaklist2 & expression only: {}", self.peaklist2_expression);
        info!("all three: {}", self.all_three);
        if self.has_negative() {
            warn!("negative region sizes; keys repeat across tables and the legacy counts are inconsistent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn set(keys: &[&'static str]) -> HashSet<&'static str> {
        keys.iter().copied().collect()
    }

    #[rstest]
    fn test_disjoint_sets_only_have_exclusive_regions() {
        let counts = OverlapCounts::from_key_sets(&set(&["a", "b"]), &set(&["c"]), &set(&["d", "e", "f"]));
        assert_eq!(counts.as_venn3(), [2, 3, 0, 1, 0, 0, 0]);
    }

    #[rstest]
    fn test_identical_sets_are_all_shared() {
        let keys = set(&["g1", "g2", "g3"]);
        let counts = OverlapCounts::from_key_sets(&keys, &keys, &keys);
        assert_eq!(counts.as_venn3(), [0, 0, 0, 0, 0, 0, 3]);
    }

    #[rstest]
    fn test_every_region_populated_and_sums_to_union() {
        // A = {1,3,5,7}, B = {2,3,6,7}, C = {4,5,6,7}
        let a = set(&["1", "3", "5", "7"]);
        let b = set(&["2", "3", "6", "7"]);
        let c = set(&["4", "5", "6", "7"]);
        let counts = OverlapCounts::from_key_sets(&a, &c, &b);
        assert_eq!(counts.as_venn3(), [1, 1, 1, 1, 1, 1, 1]);
        assert_eq!(counts.as_venn3().iter().sum::<i64>(), 7);
        assert!(!counts.has_negative());
    }

    #[rstest]
    fn test_legacy_matches_sets_without_duplicates() {
        // p1 = {g1,g2,g4}, p2 = {g1,g3,g4}, expr = {g1,g2,g5}
        let sizes = JoinSizes {
            peaklist1: 3,
            peaklist2: 3,
            expression: 3,
            shared: 2,
            triple: 1,
            peaklist1_expression: 2,
            peaklist2_expression: 1,
        };
        let legacy = OverlapCounts::legacy(&sizes);
        let exact = OverlapCounts::from_key_sets(
            &set(&["g1", "g2", "g4"]),
            &set(&["g1", "g3", "g4"]),
            &set(&["g1", "g2", "g5"]),
        );
        assert_eq!(legacy, exact);
    }

    #[rstest]
    fn test_legacy_can_go_negative() {
        // sizes from many-to-many keys that no set of distinct keys could produce
        let sizes = JoinSizes {
            peaklist1: 1,
            peaklist2: 1,
            expression: 1,
            shared: 0,
            triple: 0,
            peaklist1_expression: 1,
            peaklist2_expression: 1,
        };
        let counts = OverlapCounts::legacy(&sizes);
        assert_eq!(counts.expression_only, -1);
        assert!(counts.has_negative());
    }
}
