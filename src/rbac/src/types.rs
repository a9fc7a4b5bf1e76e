//! Core identity and rule key types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id value that matches every concrete id of the same type
pub const WILDCARD: &str = "";

/// Identity of a role-bearing entity (user, group, custom role, ...)
///
/// An empty `id` is the wildcard: it names every entity of `role_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleIdentity {
    /// Role type (e.g. "user", "group", "data")
    #[serde(rename = "type")]
    pub role_type: String,

    /// Role id, or [`WILDCARD`]
    #[serde(default)]
    pub id: String,
}

impl RoleIdentity {
    /// Create a concrete role identity
    pub fn new(role_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            role_type: role_type.into(),
            id: id.into(),
        }
    }

    /// Create an identity matching every role of `role_type`
    pub fn wildcard(role_type: impl Into<String>) -> Self {
        Self::new(role_type, WILDCARD)
    }

    /// Whether this identity is the wildcard of its type
    pub fn is_wildcard(&self) -> bool {
        self.id == WILDCARD
    }

    /// The wildcard identity of the same type
    pub fn to_wildcard(&self) -> Self {
        Self::wildcard(self.role_type.clone())
    }

    /// Equality, except a wildcard on either side matches any id of the same type
    pub fn matches(&self, other: &RoleIdentity) -> bool {
        self.role_type == other.role_type
            && (self.is_wildcard() || other.is_wildcard() || self.id == other.id)
    }
}

impl fmt::Display for RoleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            write!(f, "{}:*", self.role_type)
        } else {
            write!(f, "{}:{}", self.role_type, self.id)
        }
    }
}

/// Resolved identity of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource type (explicit designator or type name)
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource id, absent when the resource does not expose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ResourceRef {
    /// Create a resource reference with an id
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
        }
    }

    /// Create a resource reference without an id
    pub fn without_id(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
        }
    }

    /// Id as stored in rule keys (absent ids are stored empty)
    pub fn key_id(&self) -> &str {
        self.id.as_deref().unwrap_or(WILDCARD)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.resource_type, id),
            None => write!(f, "{}", self.resource_type),
        }
    }
}

/// Uniqueness key of a privilege rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    pub role_type: String,
    pub role_id: String,
    pub access_type: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl RuleKey {
    /// Build a key from its five fields
    pub fn new(
        role_type: impl Into<String>,
        role_id: impl Into<String>,
        access_type: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            role_type: role_type.into(),
            role_id: role_id.into(),
            access_type: access_type.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Key for `role` performing `access_type` on `resource`
    pub fn for_role(role: &RoleIdentity, access_type: &str, resource: &ResourceRef) -> Self {
        Self::new(
            role.role_type.as_str(),
            role.id.as_str(),
            access_type,
            resource.resource_type.as_str(),
            resource.key_id(),
        )
    }

    /// The role half of the key
    pub fn role(&self) -> RoleIdentity {
        RoleIdentity::new(self.role_type.clone(), self.role_id.clone())
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.role(), self.access_type, self.resource_type)?;
        if !self.resource_id.is_empty() {
            write!(f, ":{}", self.resource_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matching() {
        let concrete = RoleIdentity::new("data", "7");
        let any_data = RoleIdentity::wildcard("data");

        assert!(any_data.is_wildcard());
        assert!(any_data.matches(&concrete));
        assert!(concrete.matches(&any_data));
        assert!(!concrete.matches(&RoleIdentity::new("data", "8")));
        assert!(!any_data.matches(&RoleIdentity::new("audit", "7")));
        assert_eq!(concrete.to_wildcard(), any_data);
    }

    #[test]
    fn test_display() {
        assert_eq!(RoleIdentity::new("user", "1").to_string(), "user:1");
        assert_eq!(RoleIdentity::wildcard("data").to_string(), "data:*");

        let key = RuleKey::new("data", "", "update", "document", "3");
        assert_eq!(key.to_string(), "data:* update document:3");

        // no resource wildcard exists, so an absent id is simply omitted
        let key = RuleKey::new("user", "3", "read", "report", "");
        assert_eq!(key.to_string(), "user:3 read report");
        assert_eq!(
            key.to_string(),
            format!("user:3 read {}", ResourceRef::without_id("report"))
        );
    }

    #[test]
    fn test_rule_key_for_role() {
        let role = RoleIdentity::new("user", "3");
        let resource = ResourceRef::without_id("report");
        let key = RuleKey::for_role(&role, "read", &resource);

        assert_eq!(key.resource_id, "");
        assert_eq!(key.role(), role);
    }

    #[test]
    fn test_role_identity_serde() {
        let role: RoleIdentity = serde_json::from_str(r#"{"type": "group"}"#).unwrap();
        assert!(role.is_wildcard());
        assert_eq!(role.role_type, "group");
    }
}
