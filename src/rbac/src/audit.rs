//! Append-only audit log
//!
//! Holds three immutable record streams:
//! - access records, one per resolution
//! - privilege changes, one per allow/deny/forget (the system of record
//!   the ledger folds to derive current rules)
//! - hierarchy changes, one per edge added or removed
//!
//! Records are never updated or deleted. Every stream can be queried by
//! any subset of its fields.

use crate::error::Result;
use crate::ledger::{PrivilegeAction, PrivilegeRule};
use crate::types::{ResourceRef, RoleIdentity, RuleKey};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// One resolution decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub id: Uuid,
    pub principal: RoleIdentity,
    pub access_type: String,
    pub resource: ResourceRef,
    pub allowed: bool,
    pub timestamp: DateTime<Utc>,
}

impl AccessRecord {
    pub fn new(
        principal: RoleIdentity,
        access_type: impl Into<String>,
        resource: ResourceRef,
        allowed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal,
            access_type: access_type.into(),
            resource,
            allowed,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} {}",
            self.timestamp.to_rfc3339(),
            self.principal,
            if self.allowed { "can" } else { "cannot" },
            self.access_type,
            self.resource
        )
    }
}

/// Snapshot of one rule mutation
///
/// For allow and deny, `rule` is the new version. For forget, it is the
/// version being retracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRecord {
    pub id: Uuid,
    pub rule: PrivilegeRule,
    pub action: PrivilegeAction,
    pub recorded_at: DateTime<Utc>,
}

impl PrivilegeRecord {
    pub fn new(rule: PrivilegeRule, action: PrivilegeAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            rule,
            action,
        }
    }

    pub fn key(&self) -> &RuleKey {
        &self.rule.key
    }
}

impl fmt::Display for PrivilegeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.recorded_at.to_rfc3339(),
            self.action,
            self.rule.key
        )
    }
}

/// Kind of hierarchy change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyAction {
    Added,
    Removed,
}

/// One hierarchy edge change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRecord {
    pub id: Uuid,
    pub ascendant: RoleIdentity,
    pub descendant: RoleIdentity,
    pub action: HierarchyAction,
    pub timestamp: DateTime<Utc>,
}

impl HierarchyRecord {
    pub fn new(ascendant: RoleIdentity, descendant: RoleIdentity, action: HierarchyAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            ascendant,
            descendant,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Filter over access records; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct AccessQuery {
    pub principal: Option<RoleIdentity>,
    pub access_type: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub allowed: Option<bool>,
    pub since: Option<DateTime<Utc>>,
}

impl AccessQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: RoleIdentity) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = Some(access_type.into());
        self
    }

    /// Exact resource match; an id-less resource matches id-less records only
    pub fn resource(mut self, resource: &ResourceRef) -> Self {
        self.resource_type = Some(resource.resource_type.clone());
        self.resource_id = Some(resource.key_id().to_string());
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn allowed(mut self, allowed: bool) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, record: &AccessRecord) -> bool {
        field_matches(&self.principal, &record.principal)
            && field_matches(&self.access_type, &record.access_type)
            && field_matches(&self.resource_type, &record.resource.resource_type)
            && self
                .resource_id
                .as_ref()
                .map_or(true, |id| record.resource.key_id() == id)
            && field_matches(&self.allowed, &record.allowed)
            && self.since.map_or(true, |since| record.timestamp >= since)
    }
}

/// Filter over privilege records; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct PrivilegeQuery {
    pub role_type: Option<String>,
    pub role_id: Option<String>,
    pub access_type: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub authorized: Option<bool>,
    pub action: Option<PrivilegeAction>,
}

impl PrivilegeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query matching exactly one rule key
    pub fn for_key(key: &RuleKey) -> Self {
        Self {
            role_type: Some(key.role_type.clone()),
            role_id: Some(key.role_id.clone()),
            access_type: Some(key.access_type.clone()),
            resource_type: Some(key.resource_type.clone()),
            resource_id: Some(key.resource_id.clone()),
            ..Self::default()
        }
    }

    pub fn role(mut self, role: &RoleIdentity) -> Self {
        self.role_type = Some(role.role_type.clone());
        self.role_id = Some(role.id.clone());
        self
    }

    pub fn role_type(mut self, role_type: impl Into<String>) -> Self {
        self.role_type = Some(role_type.into());
        self
    }

    pub fn access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = Some(access_type.into());
        self
    }

    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn authorized(mut self, authorized: bool) -> Self {
        self.authorized = Some(authorized);
        self
    }

    pub fn action(mut self, action: PrivilegeAction) -> Self {
        self.action = Some(action);
        self
    }

    /// The rule key, when all five key fields are set
    fn exact_key(&self) -> Option<RuleKey> {
        Some(RuleKey::new(
            self.role_type.clone()?,
            self.role_id.clone()?,
            self.access_type.clone()?,
            self.resource_type.clone()?,
            self.resource_id.clone()?,
        ))
    }

    pub fn matches(&self, record: &PrivilegeRecord) -> bool {
        let key = record.key();
        field_matches(&self.role_type, &key.role_type)
            && field_matches(&self.role_id, &key.role_id)
            && field_matches(&self.access_type, &key.access_type)
            && field_matches(&self.resource_type, &key.resource_type)
            && field_matches(&self.resource_id, &key.resource_id)
            && field_matches(&self.authorized, &record.rule.authorized)
            && field_matches(&self.action, &record.action)
    }
}

/// Filter over hierarchy records; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct HierarchyQuery {
    pub ascendant: Option<RoleIdentity>,
    pub descendant: Option<RoleIdentity>,
    pub action: Option<HierarchyAction>,
}

impl HierarchyQuery {
    pub fn matches(&self, record: &HierarchyRecord) -> bool {
        field_matches(&self.ascendant, &record.ascendant)
            && field_matches(&self.descendant, &record.descendant)
            && field_matches(&self.action, &record.action)
    }
}

fn field_matches<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
    filter.as_ref().map_or(true, |expected| expected == value)
}

/// Storage backend for the audit streams
///
/// Implementations must be append-only and return records in append order.
pub trait AuditLog: Send + Sync {
    /// Append a resolution decision
    fn append_access(&self, record: AccessRecord) -> Result<()>;

    /// Append a rule mutation
    fn append_privilege_change(&self, record: PrivilegeRecord) -> Result<()>;

    /// Append a hierarchy change
    fn append_hierarchy_change(&self, record: HierarchyRecord) -> Result<()>;

    /// Access records matching `query`, in append order
    fn access_records(&self, query: &AccessQuery) -> Result<Vec<AccessRecord>>;

    /// Privilege records matching `query`, in append order
    fn privilege_records(&self, query: &PrivilegeQuery) -> Result<Vec<PrivilegeRecord>>;

    /// Hierarchy records matching `query`, in append order
    fn hierarchy_records(&self, query: &HierarchyQuery) -> Result<Vec<HierarchyRecord>>;

    /// Most recent privilege record of `key`, tombstones included
    ///
    /// Ordered by `recorded_at`, ties broken by append order.
    fn latest_privilege(&self, key: &RuleKey) -> Result<Option<PrivilegeRecord>> {
        let history = self.privilege_records(&PrivilegeQuery::for_key(key))?;
        Ok(latest(history))
    }
}

/// Latest record by (`recorded_at`, append position)
pub(crate) fn latest(history: Vec<PrivilegeRecord>) -> Option<PrivilegeRecord> {
    history
        .into_iter()
        .enumerate()
        .max_by_key(|(position, record)| (record.recorded_at, *position))
        .map(|(_, record)| record)
}

#[derive(Debug, Default)]
struct Streams {
    access: Vec<AccessRecord>,
    privileges: Vec<PrivilegeRecord>,
    /// positions in `privileges` per rule key
    privileges_by_key: HashMap<RuleKey, Vec<usize>>,
    hierarchy: Vec<HierarchyRecord>,
}

/// In-memory audit log
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    streams: RwLock<Streams>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all streams
    pub fn len(&self) -> usize {
        let streams = self.streams.read();
        streams.access.len() + streams.privileges.len() + streams.hierarchy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditLog {
    fn append_access(&self, record: AccessRecord) -> Result<()> {
        self.streams.write().access.push(record);
        Ok(())
    }

    fn append_privilege_change(&self, record: PrivilegeRecord) -> Result<()> {
        let mut streams = self.streams.write();
        let position = streams.privileges.len();
        streams
            .privileges_by_key
            .entry(record.key().clone())
            .or_default()
            .push(position);
        streams.privileges.push(record);
        Ok(())
    }

    fn append_hierarchy_change(&self, record: HierarchyRecord) -> Result<()> {
        self.streams.write().hierarchy.push(record);
        Ok(())
    }

    fn access_records(&self, query: &AccessQuery) -> Result<Vec<AccessRecord>> {
        let streams = self.streams.read();
        Ok(streams
            .access
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn privilege_records(&self, query: &PrivilegeQuery) -> Result<Vec<PrivilegeRecord>> {
        let streams = self.streams.read();

        if let Some(key) = query.exact_key() {
            let positions = streams.privileges_by_key.get(&key);
            return Ok(positions
                .into_iter()
                .flatten()
                .map(|&position| &streams.privileges[position])
                .filter(|record| query.matches(record))
                .cloned()
                .collect());
        }

        Ok(streams
            .privileges
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn hierarchy_records(&self, query: &HierarchyQuery) -> Result<Vec<HierarchyRecord>> {
        let streams = self.streams.read();
        Ok(streams
            .hierarchy
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule(role_id: &str, resource_id: &str, authorized: bool) -> PrivilegeRule {
        PrivilegeRule::new(
            RuleKey::new("user", role_id, "read", "document", resource_id),
            authorized,
        )
    }

    #[test]
    fn test_privilege_query_by_subset() {
        let log = MemoryAuditLog::new();
        log.append_privilege_change(PrivilegeRecord::new(rule("1", "1", true), PrivilegeAction::Allow))
            .unwrap();
        log.append_privilege_change(PrivilegeRecord::new(rule("1", "2", false), PrivilegeAction::Deny))
            .unwrap();
        log.append_privilege_change(PrivilegeRecord::new(rule("2", "1", true), PrivilegeAction::Allow))
            .unwrap();

        let by_role = log
            .privilege_records(&PrivilegeQuery::new().role(&RoleIdentity::new("user", "1")))
            .unwrap();
        assert_eq!(by_role.len(), 2);

        let denials = log
            .privilege_records(&PrivilegeQuery::new().authorized(false))
            .unwrap();
        assert_eq!(denials.len(), 1);
        assert_eq!(denials[0].key().resource_id, "2");

        let exact = log
            .privilege_records(&PrivilegeQuery::for_key(&RuleKey::new("user", "2", "read", "document", "1")))
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_latest_privilege_orders_by_time_then_position() {
        let log = MemoryAuditLog::new();
        let now = Utc::now();

        let mut older = PrivilegeRecord::new(rule("1", "1", true), PrivilegeAction::Allow);
        older.recorded_at = now;
        let mut earlier_but_appended_last =
            PrivilegeRecord::new(rule("1", "1", false), PrivilegeAction::Deny);
        earlier_but_appended_last.recorded_at = now - Duration::seconds(5);

        log.append_privilege_change(older.clone()).unwrap();
        log.append_privilege_change(earlier_but_appended_last).unwrap();

        let latest = log.latest_privilege(older.key()).unwrap().unwrap();
        assert_eq!(latest.id, older.id);

        let mut same_instant = PrivilegeRecord::new(rule("1", "1", false), PrivilegeAction::Deny);
        same_instant.recorded_at = now;
        log.append_privilege_change(same_instant.clone()).unwrap();

        let latest = log.latest_privilege(older.key()).unwrap().unwrap();
        assert_eq!(latest.id, same_instant.id);
    }

    #[test]
    fn test_access_query() {
        let log = MemoryAuditLog::new();
        let alice = RoleIdentity::new("user", "alice");
        let doc = ResourceRef::new("document", "1");

        log.append_access(AccessRecord::new(alice.clone(), "read", doc.clone(), true))
            .unwrap();
        log.append_access(AccessRecord::new(alice.clone(), "write", doc.clone(), false))
            .unwrap();
        log.append_access(AccessRecord::new(
            RoleIdentity::new("user", "bob"),
            "read",
            ResourceRef::without_id("report"),
            false,
        ))
        .unwrap();

        let alice_reads = AccessQuery::new().principal(alice.clone()).access_type("read");
        assert_eq!(log.access_records(&alice_reads).unwrap().len(), 1);

        let on_doc = AccessQuery::new().resource(&doc);
        assert_eq!(log.access_records(&on_doc).unwrap().len(), 2);

        let denied = AccessQuery::new().allowed(false);
        assert_eq!(log.access_records(&denied).unwrap().len(), 2);

        let reports = AccessQuery::new().resource_type("report");
        let records = log.access_records(&reports).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].to_string().contains("user:bob cannot read report"));
    }

    #[test]
    fn test_access_query_id_less_resource() {
        let log = MemoryAuditLog::new();
        let alice = RoleIdentity::new("user", "alice");
        let report = ResourceRef::without_id("report");

        log.append_access(AccessRecord::new(alice.clone(), "read", report.clone(), true))
            .unwrap();
        log.append_access(AccessRecord::new(
            alice.clone(),
            "read",
            ResourceRef::new("report", "q3"),
            true,
        ))
        .unwrap();

        let records = log.access_records(&AccessQuery::new().resource(&report)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource, report);

        let q3 = AccessQuery::new().resource(&ResourceRef::new("report", "q3"));
        assert_eq!(log.access_records(&q3).unwrap().len(), 1);
    }

    #[test]
    fn test_hierarchy_query() {
        let log = MemoryAuditLog::new();
        let group = RoleIdentity::new("group", "1");
        let user = RoleIdentity::new("user", "1");

        log.append_hierarchy_change(HierarchyRecord::new(group.clone(), user.clone(), HierarchyAction::Added))
            .unwrap();
        log.append_hierarchy_change(HierarchyRecord::new(group.clone(), user.clone(), HierarchyAction::Removed))
            .unwrap();

        let removals = HierarchyQuery {
            action: Some(HierarchyAction::Removed),
            ..Default::default()
        };
        assert_eq!(log.hierarchy_records(&removals).unwrap().len(), 1);

        let for_user = HierarchyQuery {
            descendant: Some(user),
            ..Default::default()
        };
        assert_eq!(log.hierarchy_records(&for_user).unwrap().len(), 2);
    }
}
