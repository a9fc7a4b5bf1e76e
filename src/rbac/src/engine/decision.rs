//! Resolution outcome types

use crate::ledger::PrivilegeRule;
use crate::types::{ResourceRef, RoleIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a decision came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DecisionSource {
    /// Rule attached to the principal itself (distance 0)
    Direct { rule: PrivilegeRule },

    /// Unanimous rules of the nearest ascendants that have any
    Inherited {
        distance: usize,
        rules: Vec<PrivilegeRule>,
    },

    /// Disagreeing rules at the nearest distance; resolved as deny
    Conflict {
        distance: usize,
        rules: Vec<PrivilegeRule>,
    },

    /// No rule applied; configured default response
    Default,
}

impl DecisionSource {
    /// Hop distance of the deciding rules, `None` for the default response
    pub fn distance(&self) -> Option<usize> {
        match self {
            DecisionSource::Direct { .. } => Some(0),
            DecisionSource::Inherited { distance, .. } | DecisionSource::Conflict { distance, .. } => {
                Some(*distance)
            }
            DecisionSource::Default => None,
        }
    }

    /// Rules that produced the decision
    pub fn rules(&self) -> &[PrivilegeRule] {
        match self {
            DecisionSource::Direct { rule } => std::slice::from_ref(rule),
            DecisionSource::Inherited { rules, .. } | DecisionSource::Conflict { rules, .. } => rules,
            DecisionSource::Default => &[],
        }
    }
}

/// Explained access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub principal: RoleIdentity,
    pub access_type: String,
    pub resource: ResourceRef,
    pub allowed: bool,
    pub source: DecisionSource,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "can" } else { "cannot" };
        write!(
            f,
            "{} {} {} {}",
            self.principal, verdict, self.access_type, self.resource
        )?;
        match &self.source {
            DecisionSource::Direct { rule } => write!(f, " (direct: {})", rule),
            DecisionSource::Inherited { distance, rules } => {
                write!(f, " (inherited at distance {} from {} rule(s))", distance, rules.len())
            }
            DecisionSource::Conflict { distance, .. } => {
                write!(f, " (conflicting rules at distance {})", distance)
            }
            DecisionSource::Default => write!(f, " (default response)"),
        }
    }
}
