//! Distance-ranked resolution engine
//!
//! Combines the role hierarchy, the privilege ledger and the audit log to
//! answer "can this principal perform this access on this resource".

pub mod decision;

pub use decision::{DecisionSource, Resolution};

use crate::audit::{
    AccessRecord, AuditLog, HierarchyAction, HierarchyRecord, MemoryAuditLog, PrivilegeRecord,
};
use crate::config::Settings;
use crate::error::{RbacError, Result};
use crate::hierarchy::{RoleGraph, SearchOrder};
use crate::identity::{self, Identifiable};
use crate::ledger::{PrivilegeLedger, PrivilegeRule};
use crate::role::{RoleBearer, RoleHandle};
use crate::types::{ResourceRef, RoleIdentity, RuleKey};

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Access control engine
///
/// # Resolution
///
/// ```text
/// distance 0   principal (type, id), then (type, *)   ── any rule → decision
///     │
/// distance 1   direct conveyors                       ── rules agree → decision
///     │                                                  rules disagree → deny
/// distance n   first reached at n hops                ── ...
///     │
/// none         configured default response
/// ```
///
/// The nearest distance holding any matching rule decides; farther
/// ascendants are never consulted. Rule mutations take the hierarchy write
/// lock, so a resolution sees one consistent snapshot of graph and ledger.
pub struct AccessEngine {
    /// Role hierarchy, also the snapshot lock for resolutions
    hierarchy: RwLock<RoleGraph>,

    /// Rule state folded from the audit log
    ledger: PrivilegeLedger,

    /// Access, privilege and hierarchy record streams
    audit: Arc<dyn AuditLog>,

    settings: Settings,
}

impl AccessEngine {
    /// Create an engine backed by an in-memory audit log
    pub fn new(settings: Settings) -> Self {
        Self::with_audit_log(settings, Arc::new(MemoryAuditLog::new()))
    }

    /// Create an engine backed by `audit`
    pub fn with_audit_log(settings: Settings, audit: Arc<dyn AuditLog>) -> Self {
        let ledger =
            PrivilegeLedger::new(audit.clone()).with_privilege_logging(settings.log_privileges);

        info!(
            default_response = ?settings.default_response,
            skip_implicit = settings.skip_implicit,
            log_access = settings.log_access,
            "AccessEngine initialized"
        );

        Self {
            hierarchy: RwLock::new(RoleGraph::new()),
            ledger,
            audit,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn audit_log(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    /// Adapter exposing role operations for `bearer`
    pub fn role<B: RoleBearer + ?Sized>(&self, bearer: &B) -> RoleHandle<'_> {
        RoleHandle::new(self, bearer.role_identity())
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Register that `ascendant` conveys its privileges to `descendant`
    ///
    /// Returns `false` when the edge already existed.
    pub fn add_edge(&self, ascendant: RoleIdentity, descendant: RoleIdentity) -> Result<bool> {
        self.check_role_type(&ascendant.role_type)?;
        self.check_role_type(&descendant.role_type)?;

        let mut graph = self.hierarchy.write();
        if graph.has_direct_edge(&ascendant, &descendant) {
            return Ok(false);
        }

        // recorded first so a failed append leaves the graph untouched
        self.record_hierarchy(ascendant.clone(), descendant.clone(), HierarchyAction::Added)?;
        Ok(graph.add_edge(ascendant, descendant))
    }

    /// Remove the edge `ascendant -> descendant`, returning whether it existed
    pub fn remove_edge(&self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> Result<bool> {
        let mut graph = self.hierarchy.write();
        if !graph.has_direct_edge(ascendant, descendant) {
            return Ok(false);
        }

        self.record_hierarchy(ascendant.clone(), descendant.clone(), HierarchyAction::Removed)?;
        Ok(graph.remove_edge(ascendant, descendant))
    }

    pub fn has_direct_edge(&self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> bool {
        self.hierarchy.read().has_direct_edge(ascendant, descendant)
    }

    pub fn is_ascendant(&self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> bool {
        self.hierarchy.read().is_ascendant(ascendant, descendant)
    }

    pub fn ascendants(&self, role: &RoleIdentity, order: SearchOrder) -> Vec<RoleIdentity> {
        self.hierarchy.read().ascendants(role, order)
    }

    pub fn descendants(&self, role: &RoleIdentity, order: SearchOrder) -> Vec<RoleIdentity> {
        self.hierarchy.read().descendants(role, order)
    }

    pub fn ascendants_by_distance(&self, role: &RoleIdentity) -> Vec<Vec<RoleIdentity>> {
        self.hierarchy.read().ascendants_by_distance(role)
    }

    fn record_hierarchy(
        &self,
        ascendant: RoleIdentity,
        descendant: RoleIdentity,
        action: HierarchyAction,
    ) -> Result<()> {
        if !self.settings.log_hierarchy {
            return Ok(());
        }

        info!(ascendant = %ascendant, descendant = %descendant, action = ?action, "Hierarchy changed");
        self.audit
            .append_hierarchy_change(HierarchyRecord::new(ascendant, descendant, action))
    }

    // =========================================================================
    // Privileges
    // =========================================================================

    /// Grant `key.access_type` on the key's resource to the key's role
    pub fn allow(&self, key: RuleKey) -> Result<PrivilegeRecord> {
        self.check_rule_key(&key)?;
        let _snapshot = self.hierarchy.write();
        self.ledger.allow(key)
    }

    /// Refuse `key.access_type` on the key's resource to the key's role
    pub fn deny(&self, key: RuleKey) -> Result<PrivilegeRecord> {
        self.check_rule_key(&key)?;
        let _snapshot = self.hierarchy.write();
        self.ledger.deny(key)
    }

    /// Retract the current rule of `key`; a no-op when there is none
    pub fn forget(&self, key: &RuleKey) -> Result<Option<PrivilegeRecord>> {
        self.check_rule_key(key)?;
        let _snapshot = self.hierarchy.write();
        self.ledger.forget(key)
    }

    pub fn current_rule(&self, key: &RuleKey) -> Result<Option<PrivilegeRule>> {
        self.ledger.current_rule(key)
    }

    /// Every recorded version of `key`, oldest first
    pub fn history(&self, key: &RuleKey) -> Result<Vec<PrivilegeRecord>> {
        self.ledger.history(key)
    }

    /// Current rules of every key, ordered by key
    pub fn current_rules(&self) -> Result<Vec<PrivilegeRule>> {
        self.ledger.current_rules()
    }

    fn check_role_type(&self, role_type: &str) -> Result<()> {
        if role_type.is_empty() {
            return Err(RbacError::InvalidInput("role type must not be empty".to_string()));
        }
        if !self.settings.recognizes_role_type(role_type) {
            return Err(RbacError::UnknownRoleType(role_type.to_string()));
        }
        Ok(())
    }

    fn check_rule_key(&self, key: &RuleKey) -> Result<()> {
        self.check_role_type(&key.role_type)?;
        if !self.settings.recognizes_resource_type(&key.resource_type) {
            return Err(RbacError::UnknownResourceType(key.resource_type.clone()));
        }
        Ok(())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Whether `principal` may perform `access_type` on `resource`
    pub fn resolve<R: Identifiable + ?Sized>(
        &self,
        principal: &RoleIdentity,
        access_type: &str,
        resource: &R,
    ) -> Result<bool> {
        Ok(self.explain(principal, access_type, resource)?.allowed)
    }

    /// Resolve and report which rules decided
    pub fn explain<R: Identifiable + ?Sized>(
        &self,
        principal: &RoleIdentity,
        access_type: &str,
        resource: &R,
    ) -> Result<Resolution> {
        let resource = identity::resolve(resource);

        let (allowed, source) = {
            let graph = self.hierarchy.read();
            self.decide(&graph, principal, access_type, &resource)?
        };

        debug!(
            principal = %principal,
            access_type,
            resource = %resource,
            allowed,
            distance = ?source.distance(),
            "Access resolved"
        );

        if self.settings.log_access {
            self.audit.append_access(AccessRecord::new(
                principal.clone(),
                access_type,
                resource.clone(),
                allowed,
            ))?;
        }

        Ok(Resolution {
            principal: principal.clone(),
            access_type: access_type.to_string(),
            resource,
            allowed,
            source,
        })
    }

    fn decide(
        &self,
        graph: &RoleGraph,
        principal: &RoleIdentity,
        access_type: &str,
        resource: &ResourceRef,
    ) -> Result<(bool, DecisionSource)> {
        let exact = RuleKey::for_role(principal, access_type, resource);
        let mut direct = self.ledger.current_rule(&exact)?;
        if direct.is_none() && !principal.is_wildcard() {
            let any_id = RuleKey::for_role(&principal.to_wildcard(), access_type, resource);
            direct = self.ledger.current_rule(&any_id)?;
        }
        if let Some(rule) = direct {
            return Ok((rule.authorized, DecisionSource::Direct { rule }));
        }

        if self.settings.skip_implicit {
            return Ok(self.default_decision());
        }

        for (index, layer) in graph.ascendant_layers(principal).enumerate() {
            let distance = index + 1;
            let rules = self.rules_at(&layer, access_type, resource)?;
            let Some(first) = rules.first() else {
                continue;
            };

            let authorized = first.authorized;
            if rules.iter().all(|rule| rule.authorized == authorized) {
                return Ok((authorized, DecisionSource::Inherited { distance, rules }));
            }

            warn!(
                principal = %principal,
                access_type,
                resource = %resource,
                distance,
                "Conflicting rules at the same distance, denying"
            );
            return Ok((false, DecisionSource::Conflict { distance, rules }));
        }

        Ok(self.default_decision())
    }

    /// Current rules matching any role of `layer`, by exact id or wildcard
    fn rules_at(
        &self,
        layer: &[&RoleIdentity],
        access_type: &str,
        resource: &ResourceRef,
    ) -> Result<Vec<PrivilegeRule>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for role in layer {
            let exact = RuleKey::for_role(role, access_type, resource);
            let any_id = RuleKey::for_role(&role.to_wildcard(), access_type, resource);
            for key in [exact, any_id] {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }

        keys.iter()
            .filter_map(|key| self.ledger.current_rule(key).transpose())
            .collect()
    }

    fn default_decision(&self) -> (bool, DecisionSource) {
        (self.settings.default_response.is_allow(), DecisionSource::Default)
    }
}
