//! Role-capable entity adapter
//!
//! Any domain entity takes part in the hierarchy by implementing
//! [`RoleBearer`]. [`AccessEngine::role`] then wraps it in a [`RoleHandle`]
//! that delegates hierarchy and access operations to the engine.
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::{AccessEngine, RoleBearer, RoleIdentity, RuleKey, Settings};
//! use cretoai_rbac::ResourceRef;
//!
//! struct Account {
//!     id: u64,
//! }
//!
//! impl RoleBearer for Account {
//!     fn role_identity(&self) -> RoleIdentity {
//!         RoleIdentity::new("account", self.id.to_string())
//!     }
//! }
//!
//! # fn main() -> cretoai_rbac::Result<()> {
//! let engine = AccessEngine::new(Settings::default());
//! let admins = RoleIdentity::new("group", "admins");
//! let alice = Account { id: 1 };
//!
//! engine.role(&alice).take_role_from(&admins)?;
//! engine.allow(RuleKey::new("group", "admins", "delete", "ledger", "main"))?;
//!
//! assert!(engine.role(&alice).can("delete", &ResourceRef::new("ledger", "main"))?);
//! # Ok(())
//! # }
//! ```

use crate::engine::{AccessEngine, Resolution};
use crate::error::Result;
use crate::hierarchy::SearchOrder;
use crate::identity::Identifiable;
use crate::types::RoleIdentity;

/// An entity with a stable role identity
pub trait RoleBearer {
    fn role_identity(&self) -> RoleIdentity;
}

impl RoleBearer for RoleIdentity {
    fn role_identity(&self) -> RoleIdentity {
        self.clone()
    }
}

/// Role operations of one entity, delegated to an engine
#[derive(Clone)]
pub struct RoleHandle<'e> {
    engine: &'e AccessEngine,
    identity: RoleIdentity,
}

impl<'e> RoleHandle<'e> {
    pub fn new(engine: &'e AccessEngine, identity: RoleIdentity) -> Self {
        Self { engine, identity }
    }

    pub fn identity(&self) -> &RoleIdentity {
        &self.identity
    }

    /// Inherit the privileges of `other` (edge `other -> self`)
    pub fn take_role_from<B: RoleBearer + ?Sized>(&self, other: &B) -> Result<bool> {
        self.engine
            .add_edge(other.role_identity(), self.identity.clone())
    }

    /// Convey privileges to `other` (edge `self -> other`)
    pub fn convey_to<B: RoleBearer + ?Sized>(&self, other: &B) -> Result<bool> {
        self.engine
            .add_edge(self.identity.clone(), other.role_identity())
    }

    /// Whether `other` conveys directly to this entity
    pub fn has_direct_role<B: RoleBearer + ?Sized>(&self, other: &B) -> bool {
        self.engine
            .has_direct_edge(&other.role_identity(), &self.identity)
    }

    /// Whether this entity conveys directly to `other`
    pub fn conveys_directly_to<B: RoleBearer + ?Sized>(&self, other: &B) -> bool {
        self.engine
            .has_direct_edge(&self.identity, &other.role_identity())
    }

    /// Whether `other` is reachable from this entity in one or more hops
    pub fn is_ascendant_of<B: RoleBearer + ?Sized>(&self, other: &B) -> bool {
        self.engine.is_ascendant(&self.identity, &other.role_identity())
    }

    pub fn ascendants(&self, order: SearchOrder) -> Vec<RoleIdentity> {
        self.engine.ascendants(&self.identity, order)
    }

    pub fn descendants(&self, order: SearchOrder) -> Vec<RoleIdentity> {
        self.engine.descendants(&self.identity, order)
    }

    /// Alias of [`ascendants`](Self::ascendants)
    pub fn conveyors(&self, order: SearchOrder) -> Vec<RoleIdentity> {
        self.ascendants(order)
    }

    /// Alias of [`descendants`](Self::descendants)
    pub fn heirs(&self, order: SearchOrder) -> Vec<RoleIdentity> {
        self.descendants(order)
    }

    /// Whether this entity may perform `access_type` on `resource`
    pub fn can<R: Identifiable + ?Sized>(&self, access_type: &str, resource: &R) -> Result<bool> {
        self.engine.resolve(&self.identity, access_type, resource)
    }

    pub fn explain<R: Identifiable + ?Sized>(
        &self,
        access_type: &str,
        resource: &R,
    ) -> Result<Resolution> {
        self.engine.explain(&self.identity, access_type, resource)
    }
}
