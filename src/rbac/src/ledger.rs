//! Event-sourced privilege ledger
//!
//! Rules are never updated in place. `allow` and `deny` append a new
//! version of a rule key, `forget` appends a tombstone. The current rule of
//! a key is derived by folding the privilege stream of the audit log: the
//! latest record wins, and a latest tombstone means no current rule.

use crate::audit::{self, AuditLog, PrivilegeQuery, PrivilegeRecord};
use crate::error::Result;
use crate::types::RuleKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Kind of rule mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeAction {
    Allow,
    Deny,
    Forget,
}

impl fmt::Display for PrivilegeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrivilegeAction::Allow => "allow",
            PrivilegeAction::Deny => "deny",
            PrivilegeAction::Forget => "forget",
        };
        f.write_str(name)
    }
}

/// One version of an allow/deny rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRule {
    #[serde(flatten)]
    pub key: RuleKey,
    pub authorized: bool,
    pub created_at: DateTime<Utc>,
}

impl PrivilegeRule {
    pub fn new(key: RuleKey, authorized: bool) -> Self {
        Self {
            key,
            authorized,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for PrivilegeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.authorized { "allow" } else { "deny" };
        write!(f, "{} {}", verb, self.key)
    }
}

/// Allow/deny rule state derived from the audit log
#[derive(Clone)]
pub struct PrivilegeLedger {
    log: Arc<dyn AuditLog>,
    log_privileges: bool,
}

impl PrivilegeLedger {
    /// Create a ledger folding the privilege stream of `log`
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self {
            log,
            log_privileges: true,
        }
    }

    /// Emit an `info` event for every mutation (on by default)
    pub fn with_privilege_logging(mut self, enabled: bool) -> Self {
        self.log_privileges = enabled;
        self
    }

    /// Append a version of `key` granting access
    pub fn allow(&self, key: RuleKey) -> Result<PrivilegeRecord> {
        self.append(PrivilegeRule::new(key, true), PrivilegeAction::Allow)
    }

    /// Append a version of `key` refusing access
    pub fn deny(&self, key: RuleKey) -> Result<PrivilegeRecord> {
        self.append(PrivilegeRule::new(key, false), PrivilegeAction::Deny)
    }

    /// Retract the current rule of `key`
    ///
    /// Returns `None` without writing anything when `key` has no current rule.
    pub fn forget(&self, key: &RuleKey) -> Result<Option<PrivilegeRecord>> {
        match self.current_rule(key)? {
            Some(rule) => self.append(rule, PrivilegeAction::Forget).map(Some),
            None => {
                debug!(key = %key, "Nothing to forget");
                Ok(None)
            }
        }
    }

    /// Latest non-tombstoned version of exactly `key` (no wildcard expansion)
    pub fn current_rule(&self, key: &RuleKey) -> Result<Option<PrivilegeRule>> {
        Ok(self
            .log
            .latest_privilege(key)?
            .filter(|record| record.action != PrivilegeAction::Forget)
            .map(|record| record.rule))
    }

    /// Every recorded version of `key`, oldest first
    pub fn history(&self, key: &RuleKey) -> Result<Vec<PrivilegeRecord>> {
        self.log.privilege_records(&PrivilegeQuery::for_key(key))
    }

    /// Current rules of every key, ordered by key
    pub fn current_rules(&self) -> Result<Vec<PrivilegeRule>> {
        let mut by_key: BTreeMap<RuleKey, Vec<PrivilegeRecord>> = BTreeMap::new();
        for record in self.log.privilege_records(&PrivilegeQuery::new())? {
            by_key.entry(record.key().clone()).or_default().push(record);
        }

        Ok(by_key
            .into_values()
            .filter_map(audit::latest)
            .filter(|record| record.action != PrivilegeAction::Forget)
            .map(|record| record.rule)
            .collect())
    }

    fn append(&self, rule: PrivilegeRule, action: PrivilegeAction) -> Result<PrivilegeRecord> {
        let record = PrivilegeRecord::new(rule, action);
        self.log.append_privilege_change(record.clone())?;

        if self.log_privileges {
            info!(action = %action, key = %record.rule.key, "Privilege changed");
        }
        Ok(record)
    }
}

impl fmt::Debug for PrivilegeLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeLedger")
            .field("log_privileges", &self.log_privileges)
            .finish_non_exhaustive()
    }
}
