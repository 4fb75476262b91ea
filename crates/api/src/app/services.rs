//! Service wiring: stores, verifier, audit, and the audited mutation paths.

use std::sync::Arc;

use chrono::Utc;

use atrium_audit::{AuditRecorder, InMemoryAuditStore};
use atrium_authz::{
    menu_for, AccessGate, AuthorizationTree, Decision, DenyReason, GrantError,
    InMemoryRoleGrantStore, MenuCache, MenuEntry, Module, Node, NodeKey, PermissionSet,
    PermissionToken, Role, RoleGrant, RoleGrantStore, RoleStore, Tab, BASE_ACTIONS,
};
use atrium_core::{DomainError, DomainResult, ModuleId, RoleId, TabId, UserId};
use atrium_identity::{
    hash_password, CredentialVerifier, FixedContractRegistry, InMemoryUserStore, SessionIssuer,
    SlidingWindowLimiter, UserAccount, UserStore,
};

use crate::config::AppConfig;

/// Everything the handlers share. Mutations that belong in the audit trail
/// and the menu-cache invalidation rules live here, not in the handlers.
pub struct AppServices {
    tree: AuthorizationTree,
    roles: RoleStore,
    grants: InMemoryRoleGrantStore,
    menu_cache: MenuCache,
    recorder: AuditRecorder,
    audit_store: Arc<InMemoryAuditStore>,
    pub verifier: CredentialVerifier,
    /// Module whose `edit` permission gates every `/admin` surface.
    security_module: ModuleId,
    /// Role assigned to self-registered users.
    default_role: RoleId,
}

pub fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let tree = AuthorizationTree::new();
    let roles = RoleStore::new();
    let grants = InMemoryRoleGrantStore::new();

    let audit_store = Arc::new(InMemoryAuditStore::new());
    let recorder = AuditRecorder::new(audit_store.clone());

    // Bootstrap directory: the security module plus the two built-in roles.
    // These go through the same audited path as runtime mutations.
    let admin_role = Role {
        id: RoleId::new(),
        name: "Administrator".to_string(),
        abbreviation: "adm".to_string(),
    };
    let default_role = Role {
        id: RoleId::new(),
        name: "Collaborator".to_string(),
        abbreviation: "clb".to_string(),
    };
    roles.insert(admin_role.clone())?;
    roles.insert(default_role.clone())?;
    let _ = recorder.on_created(None, &admin_role);
    let _ = recorder.on_created(None, &default_role);

    let security = Module {
        id: ModuleId::new(),
        name: "Security".to_string(),
        icon: "shield".to_string(),
        path: "security".to_string(),
        display_order: 0,
        is_parent: false,
        parent_id: None,
        extra_permissions: Default::default(),
        deleted_at: None,
    };
    let security_module = security.id;
    tree.insert_module(security.clone())?;
    let _ = recorder.on_created(None, &security);

    let security_node = tree
        .resolve(NodeKey::Module(security_module))
        .into_present()
        .ok_or_else(|| anyhow::anyhow!("bootstrap security module not resolvable"))?;
    let base: Vec<PermissionToken> = BASE_ACTIONS.iter().map(|a| PermissionToken::from(*a)).collect();
    grants
        .grant(admin_role.id, &security_node, &base)
        .map_err(|e| anyhow::anyhow!("bootstrap grant failed: {e}"))?;

    let users = Arc::new(InMemoryUserStore::new());
    let admin_account = UserAccount::new(
        &config.admin_document,
        hash_password(&config.admin_password)?,
        admin_role.id,
    );
    users.create(admin_account)?;

    let contracts = FixedContractRegistry::new(config.contract_documents.iter().map(|doc| {
        atrium_identity::Contract {
            document_number: doc.clone(),
            holder_name: String::new(),
            valid_until: None,
        }
    }));

    let verifier = CredentialVerifier::new(
        users,
        Arc::new(contracts),
        SlidingWindowLimiter::new(
            config.login_max_attempts,
            atrium_identity::rate_limit::DEFAULT_WINDOW,
        ),
        SessionIssuer::new(config.jwt_secret.clone()),
        config.contract_lookup_timeout,
    );

    Ok(AppServices {
        tree,
        roles,
        grants,
        menu_cache: MenuCache::new(),
        recorder,
        audit_store,
        verifier,
        security_module,
        default_role: default_role.id,
    })
}

impl AppServices {
    pub fn tree(&self) -> &AuthorizationTree {
        &self.tree
    }

    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    pub fn grants(&self) -> &dyn RoleGrantStore {
        &self.grants
    }

    pub fn audit_store(&self) -> &Arc<InMemoryAuditStore> {
        &self.audit_store
    }

    pub fn default_role(&self) -> RoleId {
        self.default_role
    }

    // ── Gate checks ──────────────────────────────────────────────────────

    pub fn decide(&self, role: RoleId, node: NodeKey, token: Option<&str>) -> Decision {
        AccessGate::new(&self.tree, &self.grants).require_permission(role, node, token)
    }

    /// Navigation check for a tab surface: a direct tab grant or a grant on
    /// the owning module suffices, matching menu visibility. Action tokens
    /// still require the direct tab grant (`decide` on the tab node).
    pub fn decide_tab_navigation(&self, role: RoleId, tab_id: TabId) -> Decision {
        match self.decide(role, NodeKey::Tab(tab_id), None) {
            Decision::Deny(DenyReason::NoAccess) => {
                match self.tree.resolve(NodeKey::Tab(tab_id)).into_present() {
                    Some(Node::Tab(tab)) => self.decide(role, NodeKey::Module(tab.module_id), None),
                    _ => Decision::Deny(DenyReason::NoAccess),
                }
            }
            other => other,
        }
    }

    /// Every `/admin` surface requires `edit` on the security module. The
    /// gate is self-referential: administration of grants is itself a
    /// granted surface.
    pub fn admin_gate(&self, role: RoleId) -> Decision {
        self.decide(role, NodeKey::Module(self.security_module), Some("edit"))
    }

    // ── Menu ─────────────────────────────────────────────────────────────

    pub fn menu(&self, role: RoleId) -> Arc<Vec<MenuEntry>> {
        self.menu_cache
            .get_or_build(role, || menu_for(&self.tree, &self.grants, role))
    }

    // ── Audited directory mutations ──────────────────────────────────────
    //
    // Audit failures are logged by the recorder and never abort the primary
    // mutation. Tree mutations invalidate every cached menu; grant and role
    // mutations invalidate only the affected role.

    pub fn create_module(&self, actor: UserId, module: Module) -> DomainResult<Module> {
        self.tree.insert_module(module.clone())?;
        let _ = self.recorder.on_created(Some(actor), &module);
        self.menu_cache.invalidate_all();
        Ok(module)
    }

    pub fn update_module(&self, actor: UserId, module: Module) -> DomainResult<Module> {
        let previous = self.tree.update_module(module.clone())?;
        let _ = self
            .recorder
            .on_updated(Some(actor), &atrium_audit::Auditable::snapshot(&previous), &module);
        self.menu_cache.invalidate_all();
        Ok(module)
    }

    pub fn soft_delete_module(&self, actor: UserId, id: ModuleId) -> DomainResult<Module> {
        let deleted = self.tree.soft_delete_module(id, Utc::now())?;
        let _ = self.recorder.on_deleted(Some(actor), &deleted);
        self.menu_cache.invalidate_all();
        Ok(deleted)
    }

    pub fn create_tab(&self, actor: UserId, tab: Tab) -> DomainResult<Tab> {
        self.tree.insert_tab(tab.clone())?;
        let _ = self.recorder.on_created(Some(actor), &tab);
        self.menu_cache.invalidate_all();
        Ok(tab)
    }

    pub fn update_tab(&self, actor: UserId, tab: Tab) -> DomainResult<Tab> {
        let previous = self.tree.update_tab(tab.clone())?;
        let _ = self
            .recorder
            .on_updated(Some(actor), &atrium_audit::Auditable::snapshot(&previous), &tab);
        self.menu_cache.invalidate_all();
        Ok(tab)
    }

    pub fn soft_delete_tab(&self, actor: UserId, id: TabId) -> DomainResult<Tab> {
        let deleted = self.tree.soft_delete_tab(id, Utc::now())?;
        let _ = self.recorder.on_deleted(Some(actor), &deleted);
        self.menu_cache.invalidate_all();
        Ok(deleted)
    }

    pub fn create_role(&self, actor: UserId, role: Role) -> DomainResult<Role> {
        self.roles.insert(role.clone())?;
        let _ = self.recorder.on_created(Some(actor), &role);
        Ok(role)
    }

    /// Deleting a role cascades: every grant row goes with it.
    pub fn delete_role(&self, actor: UserId, id: RoleId) -> DomainResult<Role> {
        let role = self.roles.remove(id).ok_or(DomainError::NotFound)?;
        let purged = self.grants.purge_role(id);
        if purged > 0 {
            tracing::info!(role_id = %id, rows = purged, "purged grants for deleted role");
        }
        self.menu_cache.invalidate(id);
        let _ = self.recorder.on_deleted(Some(actor), &role);
        Ok(role)
    }

    // ── Audited grant mutations ──────────────────────────────────────────

    pub fn replace_grant(
        &self,
        actor: UserId,
        role: RoleId,
        node: &Node,
        tokens: &[PermissionToken],
    ) -> Result<RoleGrant, GrantError> {
        let previous = self.grants.tokens_for(role, node.key());
        self.grants.grant(role, node, tokens)?;

        let row = RoleGrant {
            role_id: role,
            node: node.key(),
            tokens: PermissionSet::new(tokens.iter().cloned()),
        };
        match previous {
            Some(tokens) => {
                let before = atrium_audit::Auditable::snapshot(&RoleGrant {
                    role_id: role,
                    node: node.key(),
                    tokens,
                });
                let _ = self.recorder.on_updated(Some(actor), &before, &row);
            }
            None => {
                let _ = self.recorder.on_created(Some(actor), &row);
            }
        }

        self.menu_cache.invalidate(role);
        Ok(row)
    }

    pub fn revoke_grant(&self, actor: UserId, role: RoleId, node: NodeKey) -> bool {
        let Some(tokens) = self.grants.tokens_for(role, node) else {
            return false;
        };
        if !self.grants.revoke(role, node) {
            return false;
        }

        let row = RoleGrant {
            role_id: role,
            node,
            tokens,
        };
        let _ = self.recorder.on_deleted(Some(actor), &row);
        self.menu_cache.invalidate(role);
        true
    }
}
