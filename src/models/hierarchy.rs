use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requested quantity for one precast node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityTarget {
    pub hierarchy_id: i32,
    pub quantity: i32,
    pub naming_convention: String,
}

/// Outcome of comparing a stored quantity with a requested one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantityChange {
    pub hierarchy_id: i32,
    pub current: i32,
    pub desired: i32,
    pub naming_convention: String,
}

impl QuantityChange {
    pub fn delta(&self) -> i32 {
        self.desired - self.current
    }
}

/// Pairs every requested hierarchy with its stored quantity (zero when the
/// row does not exist yet). Hierarchies absent from the request are left
/// untouched. Later duplicates in `targets` win.
pub fn plan_changes(current: &BTreeMap<i32, i32>, targets: &[QuantityTarget]) -> Vec<QuantityChange> {
    let mut merged: BTreeMap<i32, &QuantityTarget> = BTreeMap::new();
    for target in targets {
        merged.insert(target.hierarchy_id, target);
    }
    merged
        .into_values()
        .map(|t| QuantityChange {
            hierarchy_id: t.hierarchy_id,
            current: current.get(&t.hierarchy_id).copied().unwrap_or(0),
            desired: t.quantity,
            naming_convention: t.naming_convention.clone(),
        })
        .collect()
}

/// Display name of the `seq`-th element at a location.
pub fn element_name(naming_convention: &str, seq: u64) -> String {
    format!("{}-{}", naming_convention.trim(), seq)
}

/// Sequence number at the end of an element name, if it has one.
pub fn name_seq(name: &str) -> Option<u64> {
    let (_, suffix) = name.rsplit_once('-')?;
    suffix.parse().ok()
}

/// Next free sequence number given the names already used at a location.
pub fn next_seq<'a>(names: impl IntoIterator<Item = &'a str>) -> u64 {
    names.into_iter().filter_map(name_seq).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(h: i32, q: i32) -> QuantityTarget {
        QuantityTarget {
            hierarchy_id: h,
            quantity: q,
            naming_convention: format!("T1-F{}", h),
        }
    }

    #[test]
    fn deltas_per_hierarchy() {
        let current = BTreeMap::from([(10, 3), (11, 2)]);
        let changes = plan_changes(&current, &[target(10, 5), target(11, 2), target(12, 1)]);
        let deltas: Vec<_> = changes.iter().map(|c| (c.hierarchy_id, c.delta())).collect();
        assert_eq!(deltas, vec![(10, 2), (11, 0), (12, 1)]);
    }

    #[test]
    fn decrease_yields_negative_delta() {
        let current = BTreeMap::from([(10, 5)]);
        let changes = plan_changes(&current, &[target(10, 2)]);
        assert_eq!(changes[0].delta(), -3);
    }

    #[test]
    fn duplicate_targets_keep_the_last() {
        let changes = plan_changes(&BTreeMap::new(), &[target(10, 1), target(10, 4)]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].desired, 4);
    }

    #[test]
    fn names_elements_by_convention() {
        assert_eq!(element_name("T1-F10 ", 3), "T1-F10-3");
    }

    #[test]
    fn sequence_continues_after_the_highest_suffix() {
        assert_eq!(next_seq(["T1-F1-W-1", "T1-F1-W-3"]), 4);
        assert_eq!(next_seq(["F2-2", "renamed-7", "no suffix here"]), 8);
        assert_eq!(next_seq(std::iter::empty()), 1);
        assert_eq!(name_seq("T1-F1-W"), None);
    }
}
