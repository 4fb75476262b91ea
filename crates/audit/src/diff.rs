//! Field-level diff between two entity snapshots.

use std::collections::BTreeSet;

use crate::record::{FieldChange, Snapshot};

/// Computes the per-field deltas between two snapshots.
///
/// Compares by value equality. Fields equal on both sides are omitted;
/// fields absent from both are ignored. An empty `before` yields the INSERT
/// convention (all `before = None`); an empty `after` yields the DELETE
/// convention.
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> Vec<FieldChange> {
    let fields: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    fields
        .into_iter()
        .filter_map(|field| {
            let old = before.get(field);
            let new = after.get(field);
            if old == new {
                return None;
            }
            Some(FieldChange {
                field: field.clone(),
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(pairs: &[(&str, serde_json::Value)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn only_changed_fields_appear() {
        let before = snapshot(&[
            ("email", json!("a@x.com")),
            ("name", json!("Ana")),
            ("role", json!("clerk")),
        ]);
        let after = snapshot(&[
            ("email", json!("b@x.com")),
            ("name", json!("Ana")),
            ("role", json!("clerk")),
        ]);

        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "email");
        assert_eq!(changes[0].before, Some(json!("a@x.com")));
        assert_eq!(changes[0].after, Some(json!("b@x.com")));
    }

    #[test]
    fn identical_snapshots_diff_to_nothing() {
        let snap = snapshot(&[("email", json!("a@x.com"))]);
        assert!(diff_snapshots(&snap, &snap).is_empty());
    }

    #[test]
    fn insert_convention_all_before_null() {
        let after = snapshot(&[("email", json!("a@x.com")), ("name", json!("Ana"))]);
        let changes = diff_snapshots(&Snapshot::new(), &after);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.before.is_none() && c.after.is_some()));
    }

    #[test]
    fn delete_convention_all_after_null() {
        let before = snapshot(&[("email", json!("a@x.com")), ("name", json!("Ana"))]);
        let changes = diff_snapshots(&before, &Snapshot::new());
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.before.is_some() && c.after.is_none()));
    }

    #[test]
    fn value_equality_not_identity() {
        // Two separately-built but equal values must not produce a delta.
        let before = snapshot(&[("tags", json!(["a", "b"]))]);
        let after = snapshot(&[("tags", json!(["a", "b"]))]);
        assert!(diff_snapshots(&before, &after).is_empty());
    }

    #[test]
    fn field_appearing_mid_life_is_a_change() {
        let before = snapshot(&[("email", json!("a@x.com"))]);
        let after = snapshot(&[("email", json!("a@x.com")), ("phone", json!("555"))]);

        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "phone");
        assert!(changes[0].before.is_none());
    }
}
