//! Long-tail bucketing of categorical counts.
//!
//! Within each group, categories whose count falls strictly below
//! `threshold * group total` are relabeled to a catch-all label and summed
//! into a single row. The pass runs once; the resulting catch-all row is not
//! re-examined even if it is itself below the threshold.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

pub const DEFAULT_THRESHOLD: f64 = 0.01;
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub category: String,
    pub count: usize,
}

impl GroupCount {
    pub fn new(group: impl Into<String>, category: impl Into<String>, count: usize) -> Self {
        Self {
            group: group.into(),
            category: category.into(),
            count,
        }
    }
}

/// Output is ordered by group, then count descending, then category.
pub fn bucket(groups: &[GroupCount], threshold: f64, catch_all: &str) -> Vec<GroupCount> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for row in groups {
        *totals.entry(row.group.as_str()).or_insert(0) += row.count;
    }

    let mut merged: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for row in groups {
        let total = totals.get(row.group.as_str()).copied().unwrap_or_default();
        let label = if (row.count as f64) < threshold * total as f64 {
            catch_all
        } else {
            row.category.as_str()
        };
        *merged.entry((row.group.as_str(), label)).or_insert(0) += row.count;
    }

    merged
        .into_iter()
        .map(|((group, category), count)| GroupCount::new(group, category, count))
        .sorted_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.category.cmp(&b.category))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tesla_models() -> Vec<GroupCount> {
        vec![
            GroupCount::new("TESLA", "A", 90),
            GroupCount::new("TESLA", "B", 5),
            GroupCount::new("TESLA", "C", 5),
        ]
    }

    #[test]
    fn rare_categories_collapse_into_catch_all() {
        let bucketed = bucket(&tesla_models(), 0.1, OTHER_LABEL);
        assert_eq!(
            bucketed,
            vec![
                GroupCount::new("TESLA", "A", 90),
                GroupCount::new("TESLA", "Other", 10),
            ]
        );
    }

    #[test]
    fn threshold_is_relative_to_each_group() {
        let rows = vec![
            GroupCount::new("FORD", "MUSTANG MACH-E", 4),
            GroupCount::new("FORD", "FUSION", 1),
            GroupCount::new("TESLA", "MODEL Y", 400),
            GroupCount::new("TESLA", "ROADSTER", 1),
        ];
        let bucketed = bucket(&rows, 0.1, OTHER_LABEL);
        // FUSION is 20% of FORD; ROADSTER is 0.25% of TESLA.
        assert!(bucketed.contains(&GroupCount::new("FORD", "FUSION", 1)));
        assert!(bucketed.contains(&GroupCount::new("TESLA", "Other", 1)));
        assert!(!bucketed.iter().any(|row| row.category == "ROADSTER"));
    }

    #[test]
    fn category_at_threshold_is_kept() {
        let rows = vec![
            GroupCount::new("KIA", "EV6", 90),
            GroupCount::new("KIA", "NIRO", 10),
        ];
        let bucketed = bucket(&rows, 0.1, OTHER_LABEL);
        assert!(bucketed.contains(&GroupCount::new("KIA", "NIRO", 10)));
    }

    #[test]
    fn catch_all_row_is_not_collapsed_again() {
        let rows = vec![
            GroupCount::new("BMW", "I3", 1000),
            GroupCount::new("BMW", "X5", 3),
            GroupCount::new("BMW", "I8", 2),
        ];
        let bucketed = bucket(&rows, 0.01, "Misc");
        assert_eq!(
            bucketed,
            vec![
                GroupCount::new("BMW", "I3", 1000),
                GroupCount::new("BMW", "Misc", 5),
            ]
        );
    }

    #[test]
    fn repeated_application_is_stable() {
        let once = bucket(&tesla_models(), 0.1, OTHER_LABEL);
        let twice = bucket(&once, 0.1, OTHER_LABEL);
        assert_eq!(once, twice);
    }

    #[test]
    fn different_thresholds_do_not_commute() {
        let rows = vec![
            GroupCount::new("TESLA", "A", 60),
            GroupCount::new("TESLA", "B", 25),
            GroupCount::new("TESLA", "C", 15),
        ];
        let loose = bucket(&rows, 0.2, OTHER_LABEL);
        let strict = bucket(&loose, 0.3, OTHER_LABEL);
        assert_ne!(loose, strict);
        assert_eq!(
            strict,
            vec![
                GroupCount::new("TESLA", "A", 60),
                GroupCount::new("TESLA", "Other", 40),
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(bucket(&[], DEFAULT_THRESHOLD, OTHER_LABEL).is_empty());
    }
}
