//! # CretoAI RBAC Engine
//!
//! Hierarchical role-based access control with an auditable,
//! event-sourced privilege ledger.
//!
//! ## Features
//!
//! - **Role hierarchy** with cycle-safe, deduplicating traversals
//! - **Distance-ranked resolution**: the nearest explicit rule wins, and a
//!   rule on the principal itself overrides anything inherited
//! - **Wildcard roles**: an empty id matches every role of its type
//! - **Event-sourced ledger**: current rules are a fold over the
//!   append-only privilege stream, never a mutable table
//! - **Audit log** of every decision, rule mutation and hierarchy change
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{AccessEngine, ResourceRef, RoleIdentity, RuleKey, Settings};
//!
//! # fn main() -> cretoai_rbac::Result<()> {
//! let engine = AccessEngine::new(Settings::default());
//!
//! let readers = RoleIdentity::new("group", "readers");
//! let alice = RoleIdentity::new("user", "alice");
//! engine.add_edge(readers, alice.clone())?;
//!
//! engine.allow(RuleKey::new("group", "readers", "read", "document", "42"))?;
//!
//! let decision = engine.explain(&alice, "read", &ResourceRef::new("document", "42"))?;
//! assert!(decision.allowed);
//! assert_eq!(decision.source.distance(), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod ledger;
pub mod role;
pub mod types;

// Re-export commonly used types
pub use audit::{AccessQuery, AccessRecord, AuditLog, MemoryAuditLog, PrivilegeQuery, PrivilegeRecord};
pub use config::{ConfigError, Effect, Settings};
pub use engine::{AccessEngine, DecisionSource, Resolution};
pub use error::{RbacError, Result};
pub use hierarchy::{RoleGraph, SearchOrder};
pub use identity::Identifiable;
pub use ledger::{PrivilegeAction, PrivilegeLedger, PrivilegeRule};
pub use role::{RoleBearer, RoleHandle};
pub use types::{ResourceRef, RoleIdentity, RuleKey, WILDCARD};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
