//! Dependency ordering for modification plans.
//!
//! Kahn's algorithm over the `depends_on` graph, with ties broken by
//! original plan position so the output is deterministic. A cycle is a hard
//! error: the plan cannot be applied and the pipeline must not guess.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::domain::change::ProposedChange;
use crate::domain::error::{AutopatchError, Result};
use crate::domain::plan::ModificationPlan;

/// Order changes so every change appears after all changes it depends on.
pub fn sort_changes(changes: &[ProposedChange]) -> Result<Vec<ProposedChange>> {
    let index_of: HashMap<&str, usize> = changes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    // indegree[i] = unapplied dependencies of changes[i];
    // dependents[i] = indices that depend on changes[i].
    let mut indegree = vec![0usize; changes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); changes.len()];

    for (i, change) in changes.iter().enumerate() {
        for dep in &change.depends_on {
            let Some(&dep_index) = index_of.get(dep.as_str()) else {
                return Err(AutopatchError::InvalidPlan(format!(
                    "change '{}' depends on unknown change '{}'",
                    change.id, dep
                )));
            };
            indegree[i] += 1;
            dependents[dep_index].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut ordered = Vec::with_capacity(changes.len());
    while let Some(Reverse(i)) = ready.pop() {
        ordered.push(changes[i].clone());
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if ordered.len() != changes.len() {
        // Whatever still has unresolved dependencies sits on a cycle.
        let mut cycle_ids: Vec<String> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| changes[i].id.clone())
            .collect();
        cycle_ids.sort();
        return Err(AutopatchError::CyclicDependency {
            change_ids: cycle_ids,
        });
    }

    Ok(ordered)
}

/// Sort a plan's changes and mark it `dependencies_sorted`.
///
/// Consumes the plan; the sorted plan is a new value, per the rule that
/// plans are immutable once validated.
pub fn sort_plan(plan: ModificationPlan) -> Result<ModificationPlan> {
    let changes = sort_changes(&plan.changes)?;
    Ok(ModificationPlan {
        changes,
        rationale: plan.rationale,
        estimated_complexity: plan.estimated_complexity,
        dependencies_sorted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::{ChangeType, Complexity};

    fn change(id: &str, deps: &[&str]) -> ProposedChange {
        ProposedChange::new(id, format!("src/{id}.rs"), ChangeType::Delete, "test change")
            .with_depends_on(deps.iter().map(|d| d.to_string()).collect())
    }

    fn position(ordered: &[ProposedChange], id: &str) -> usize {
        ordered
            .iter()
            .position(|c| c.id == id)
            .unwrap_or_else(|| panic!("change {id} missing from ordering"))
    }

    #[test]
    fn test_sort_respects_dependencies() {
        let changes = vec![
            change("c1", &["c3"]),
            change("c2", &["c1"]),
            change("c3", &[]),
        ];

        let ordered = sort_changes(&changes).expect("sort failed");

        assert!(position(&ordered, "c3") < position(&ordered, "c1"));
        assert!(position(&ordered, "c1") < position(&ordered, "c2"));
    }

    #[test]
    fn test_sort_every_change_after_all_dependencies() {
        let changes = vec![
            change("a", &[]),
            change("b", &["a"]),
            change("c", &["a", "b"]),
            change("d", &["c", "a"]),
            change("e", &[]),
        ];

        let ordered = sort_changes(&changes).expect("sort failed");

        for c in &ordered {
            let my_pos = position(&ordered, &c.id);
            for dep in &c.depends_on {
                assert!(
                    position(&ordered, dep) < my_pos,
                    "{} must come after {}",
                    c.id,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_sort_is_deterministic_for_independent_changes() {
        let changes = vec![change("z", &[]), change("m", &[]), change("a", &[])];

        // No dependencies: original plan order wins.
        let ordered = sort_changes(&changes).expect("sort failed");
        let ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_cycle_is_rejected_with_ids() {
        let changes = vec![
            change("c1", &["c2"]),
            change("c2", &["c1"]),
            change("c3", &[]),
        ];

        match sort_changes(&changes) {
            Err(AutopatchError::CyclicDependency { change_ids }) => {
                assert_eq!(change_ids, vec!["c1".to_string(), "c2".to_string()]);
            }
            other => panic!("expected CyclicDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle_rejected() {
        let changes = vec![change("c1", &["c1"])];
        assert!(matches!(
            sort_changes(&changes),
            Err(AutopatchError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let changes = vec![change("c1", &["nope"])];
        assert!(matches!(
            sort_changes(&changes),
            Err(AutopatchError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_sort_plan_sets_flag() {
        let plan = ModificationPlan::new(
            vec![change("c2", &["c1"]), change("c1", &[])],
            "reorder",
            Complexity::Simple,
        );
        assert!(!plan.dependencies_sorted);

        let sorted = sort_plan(plan).expect("sort failed");
        assert!(sorted.dependencies_sorted);
        assert_eq!(sorted.changes[0].id, "c1");
    }
}
