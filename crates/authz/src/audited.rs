//! Audit-trail wiring for the directory types.
//!
//! Snapshots carry every mutable field so the diff layer can report exactly
//! what an administrator changed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use atrium_audit::Auditable;

use crate::grants::RoleGrant;
use crate::node::{Module, Tab};
use crate::roles::Role;

fn value(v: impl Serialize) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

impl Auditable for Module {
    fn table_name(&self) -> &'static str {
        "modules"
    }

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("name".to_string(), value(&self.name)),
            ("icon".to_string(), value(&self.icon)),
            ("path".to_string(), value(&self.path)),
            ("display_order".to_string(), value(self.display_order)),
            ("is_parent".to_string(), value(self.is_parent)),
            ("parent_id".to_string(), value(self.parent_id)),
            (
                "extra_permissions".to_string(),
                value(&self.extra_permissions),
            ),
            ("deleted_at".to_string(), value(self.deleted_at)),
        ])
    }
}

impl Auditable for Tab {
    fn table_name(&self) -> &'static str {
        "tabs"
    }

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("module_id".to_string(), value(self.module_id)),
            ("name".to_string(), value(&self.name)),
            ("icon".to_string(), value(&self.icon)),
            ("path".to_string(), value(&self.path)),
            ("display_order".to_string(), value(self.display_order)),
            (
                "extra_permissions".to_string(),
                value(&self.extra_permissions),
            ),
            ("deleted_at".to_string(), value(self.deleted_at)),
        ])
    }
}

impl Auditable for Role {
    fn table_name(&self) -> &'static str {
        "roles"
    }

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("name".to_string(), value(&self.name)),
            ("abbreviation".to_string(), value(&self.abbreviation)),
        ])
    }
}

impl Auditable for RoleGrant {
    fn table_name(&self) -> &'static str {
        "role_grants"
    }

    fn record_id(&self) -> String {
        format!("{}/{}", self.role_id, self.node)
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("role_id".to_string(), value(self.role_id)),
            ("node_kind".to_string(), value(self.node.kind().as_str())),
            ("node_id".to_string(), value(self.node.as_uuid())),
            ("tokens".to_string(), value(&self.tokens)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use atrium_audit::Auditable;
    use atrium_core::ModuleId;

    use crate::node::Module;
    use crate::permissions::PermissionVocabulary;

    #[test]
    fn module_snapshot_covers_every_mutable_field() {
        let module = Module {
            id: ModuleId::new(),
            name: "Contracts".to_string(),
            icon: "file-text".to_string(),
            path: "contracts".to_string(),
            display_order: 1,
            is_parent: false,
            parent_id: None,
            extra_permissions: PermissionVocabulary::empty(),
            deleted_at: None,
        };

        let snapshot = module.snapshot();
        for field in [
            "name",
            "icon",
            "path",
            "display_order",
            "is_parent",
            "parent_id",
            "extra_permissions",
            "deleted_at",
        ] {
            assert!(snapshot.contains_key(field), "missing field {field}");
        }
        assert_eq!(module.table_name(), "modules");
        assert_eq!(module.record_id(), module.id.to_string());
    }
}
