//! End-to-end resolution scenarios
//!
//! Users, groups and custom roles are plain domain structs adapted through
//! `RoleBearer`; documents are resources adapted through `Identifiable`.

use cretoai_rbac::{
    AccessEngine, DecisionSource, Effect, Identifiable, PrivilegeAction, PrivilegeQuery,
    RoleBearer, RoleIdentity, RuleKey, SearchOrder, Settings,
};
use std::collections::HashSet;

struct User {
    id: u32,
}

impl RoleBearer for User {
    fn role_identity(&self) -> RoleIdentity {
        RoleIdentity::new("user", self.id.to_string())
    }
}

struct Group {
    id: u32,
}

impl RoleBearer for Group {
    fn role_identity(&self) -> RoleIdentity {
        RoleIdentity::new("group", self.id.to_string())
    }
}

/// Custom role; roles without an id stand for their whole type
struct CustomRole {
    kind: &'static str,
    rid: Option<u32>,
}

impl RoleBearer for CustomRole {
    fn role_identity(&self) -> RoleIdentity {
        match self.rid {
            Some(rid) => RoleIdentity::new(self.kind, rid.to_string()),
            None => RoleIdentity::wildcard(self.kind),
        }
    }
}

struct Document {
    id: u32,
}

impl Identifiable for Document {
    fn resource_type(&self) -> Option<String> {
        Some("document".to_string())
    }

    fn resource_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

struct Organization {
    engine: AccessEngine,
    users: Vec<User>,
    groups: Vec<Group>,
    roles: Vec<CustomRole>,
    documents: Vec<Document>,
}

fn key(role_type: &str, role_id: &str, access_type: &str, resource_id: &str) -> RuleKey {
    RuleKey::new(role_type, role_id, access_type, "document", resource_id)
}

fn identities<B: RoleBearer>(bearers: &[&B]) -> HashSet<RoleIdentity> {
    bearers.iter().map(|b| b.role_identity()).collect()
}

fn as_set(roles: Vec<RoleIdentity>) -> HashSet<RoleIdentity> {
    roles.into_iter().collect()
}

/// Hierarchy:
/// groups[0] -> users[0], groups[1] -> users[0], groups[1] -> users[1],
/// roles[0] -> users[0], roles[1] -> users[1], roles[2] -> users[2],
/// groups[2] -> roles[2]
fn organization() -> Organization {
    let settings = Settings::default()
        .with_roles_list(["user", "group", "security", "audit", "data"])
        .with_resources_list(["document"]);

    let org = Organization {
        engine: AccessEngine::new(settings),
        users: (1..=3).map(|id| User { id }).collect(),
        groups: (1..=3).map(|id| Group { id }).collect(),
        roles: vec![
            CustomRole { kind: "security", rid: None },
            CustomRole { kind: "audit", rid: Some(15) },
            CustomRole { kind: "data", rid: None },
        ],
        documents: (1..=3).map(|id| Document { id }).collect(),
    };

    let engine = &org.engine;
    engine.role(&org.users[0]).take_role_from(&org.groups[0]).unwrap();
    engine.role(&org.users[0]).take_role_from(&org.groups[1]).unwrap();
    engine.role(&org.groups[1]).convey_to(&org.users[1]).unwrap();
    engine.role(&org.roles[0]).convey_to(&org.users[0]).unwrap();
    engine.role(&org.roles[1]).convey_to(&org.users[1]).unwrap();
    engine.role(&org.roles[2]).convey_to(&org.users[2]).unwrap();
    engine.role(&org.roles[2]).take_role_from(&org.groups[2]).unwrap();

    engine.allow(key("user", "1", "do stuff on", "1")).unwrap();
    engine.allow(key("user", "2", "do stuff on", "2")).unwrap();
    engine.allow(key("user", "3", "do stuff on", "3")).unwrap();
    engine.deny(key("user", "1", "do stuff on", "2")).unwrap();
    engine.deny(key("user", "2", "do stuff on", "3")).unwrap();
    engine.deny(key("user", "3", "do stuff on", "1")).unwrap();
    engine.allow(key("group", "3", "read", "3")).unwrap();
    engine.allow(key("group", "3", "delete", "3")).unwrap();
    engine.forget(&key("group", "3", "delete", "3")).unwrap();
    engine.forget(&key("group", "3", "create", "3")).unwrap();
    engine.allow(key("data", "", "update", "3")).unwrap();

    org
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[test]
fn test_role_hierarchy() {
    let org = organization();
    let engine = &org.engine;
    let (users, groups, roles) = (&org.users, &org.groups, &org.roles);

    assert!(engine.role(&users[0]).has_direct_role(&groups[0]));
    assert!(engine.role(&users[0]).has_direct_role(&groups[1]));
    assert!(!engine.role(&users[0]).has_direct_role(&groups[2]));
    assert!(!engine.role(&groups[2]).conveys_directly_to(&groups[1]));

    assert_eq!(
        as_set(engine.role(&groups[1]).heirs(SearchOrder::BreadthFirst)),
        identities(&[&users[0], &users[1]])
    );
    assert!(engine.role(&roles[0]).conveys_directly_to(&users[0]));
    assert!(engine.role(&roles[1]).conveys_directly_to(&users[1]));
    assert!(engine.role(&roles[2]).conveys_directly_to(&users[2]));

    let conveyors = as_set(engine.role(&users[0]).conveyors(SearchOrder::BreadthFirst));
    let mut expected = identities(&[&groups[0], &groups[1]]);
    expected.insert(roles[0].role_identity());
    assert_eq!(conveyors, expected);

    assert!(engine.role(&groups[2]).is_ascendant_of(&users[2]));
    assert!(!engine.role(&users[2]).is_ascendant_of(&groups[2]));
}

#[test]
fn test_search_orders_agree() {
    let org = organization();
    let engine = &org.engine;

    let user = engine.role(&org.users[2]);
    assert_eq!(
        as_set(user.ascendants(SearchOrder::DepthFirst)),
        as_set(user.ascendants(SearchOrder::BreadthFirst))
    );

    let group = engine.role(&org.groups[2]);
    assert_eq!(
        as_set(group.descendants(SearchOrder::DepthFirst)),
        as_set(group.descendants(SearchOrder::BreadthFirst))
    );
    assert_eq!(group.descendants(SearchOrder::DepthFirst).len(), 2);
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[test]
fn test_direct_explicit_permission() {
    let org = organization();
    let engine = &org.engine;
    let (users, docs) = (&org.users, &org.documents);

    for (u, user) in users.iter().enumerate() {
        for (d, doc) in docs.iter().enumerate() {
            let allowed = engine.role(user).can("do stuff on", doc).unwrap();
            assert_eq!(allowed, u == d, "user {} on document {}", u + 1, d + 1);
        }
    }
}

#[test]
fn test_indirect_permission_at_distance_one() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);

    let resolution = user.explain("update", &org.documents[2]).unwrap();
    assert!(resolution.allowed);
    assert_eq!(resolution.source.distance(), Some(1));
}

#[test]
fn test_indirect_permission_at_distance_two() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);

    let resolution = user.explain("read", &org.documents[2]).unwrap();
    assert!(resolution.allowed);
    assert_eq!(resolution.source.distance(), Some(2));
}

#[test]
fn test_direct_rule_overrides_inherited() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);
    assert!(user.can("update", &org.documents[2]).unwrap());

    org.engine.deny(key("user", "3", "update", "3")).unwrap();

    let resolution = user.explain("update", &org.documents[2]).unwrap();
    assert!(!resolution.allowed);
    assert!(matches!(resolution.source, DecisionSource::Direct { .. }));
}

#[test]
fn test_own_type_wildcard_overrides_inherited() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);
    assert!(user.can("read", &org.documents[2]).unwrap());

    // user:* sits at distance 0 for every user, ahead of group:3 at distance 2
    org.engine.deny(key("user", "", "read", "3")).unwrap();

    let resolution = user.explain("read", &org.documents[2]).unwrap();
    assert!(!resolution.allowed);
    assert_eq!(resolution.source.distance(), Some(0));
    match &resolution.source {
        DecisionSource::Direct { rule } => assert!(rule.key.role().is_wildcard()),
        other => panic!("expected a direct rule, got {:?}", other),
    }

    // an exact rule on the principal still beats its type wildcard
    org.engine.allow(key("user", "3", "read", "3")).unwrap();
    assert!(user.can("read", &org.documents[2]).unwrap());
}

#[test]
fn test_nearer_deny_overrides_farther_allow() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);
    assert!(user.can("read", &org.documents[2]).unwrap());

    org.engine.deny(key("data", "", "read", "3")).unwrap();

    let resolution = user.explain("read", &org.documents[2]).unwrap();
    assert!(!resolution.allowed);
    assert_eq!(resolution.source.distance(), Some(1));
}

#[test]
fn test_farther_rules_never_consulted() {
    let engine = AccessEngine::new(Settings::default());
    let user = RoleIdentity::new("user", "1");
    let near = RoleIdentity::new("team", "1");

    engine.add_edge(near.clone(), user.clone()).unwrap();
    for id in 1..=3 {
        let far = RoleIdentity::new("division", id.to_string());
        engine.add_edge(far.clone(), near.clone()).unwrap();
        engine
            .deny(RuleKey::new("division", id.to_string(), "read", "document", "1"))
            .unwrap();
    }
    engine.allow(RuleKey::new("team", "1", "read", "document", "1")).unwrap();

    let resolution = engine
        .explain(&user, "read", &Document { id: 1 })
        .unwrap();
    assert!(resolution.allowed);
    assert_eq!(resolution.source.rules().len(), 1);
}

#[test]
fn test_wildcard_role_applies_to_every_id() {
    let org = organization();
    // data:* conveys to users[2] only; a second data role gets the same grant
    let analyst = CustomRole { kind: "data", rid: Some(9) };
    let intern = User { id: 9 };
    org.engine.role(&analyst).convey_to(&intern).unwrap();

    assert!(org.engine.role(&intern).can("update", &org.documents[2]).unwrap());
    assert!(!org.engine.role(&intern).can("update", &org.documents[1]).unwrap());
}

#[test]
fn test_default_response_when_nothing_applies() {
    let org = organization();
    assert!(!org.engine.role(&org.users[0]).can("archive", &org.documents[0]).unwrap());

    let permissive = AccessEngine::new(Settings::default().with_default_response(Effect::Allow));
    assert!(permissive
        .role(&User { id: 1 })
        .can("archive", &Document { id: 1 })
        .unwrap());
}

#[test]
fn test_forget_reverts_to_default() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);
    assert!(user.can("update", &org.documents[2]).unwrap());

    org.engine.forget(&key("data", "", "update", "3")).unwrap();

    let resolution = user.explain("update", &org.documents[2]).unwrap();
    assert!(!resolution.allowed);
    assert_eq!(resolution.source, DecisionSource::Default);
}

#[test]
fn test_forgotten_rule_no_longer_applies() {
    let org = organization();
    let user = org.engine.role(&org.users[2]);

    assert!(!user.can("delete", &org.documents[2]).unwrap());
    assert!(!user.can("create", &org.documents[2]).unwrap());
    assert!(org
        .engine
        .current_rule(&key("group", "3", "delete", "3"))
        .unwrap()
        .is_none());
}

// ============================================================================
// HISTORY
// ============================================================================

#[test]
fn test_role_privileges_history() {
    let org = organization();
    let log = org.engine.audit_log();

    for i in 1..=3 {
        let j = match i {
            1 => 2,
            2 => 3,
            _ => 1,
        };
        let user = RoleIdentity::new("user", i.to_string());

        let granted = log
            .privilege_records(
                &PrivilegeQuery::new()
                    .role(&user)
                    .access_type("do stuff on")
                    .resource("document", i.to_string())
                    .authorized(true),
            )
            .unwrap();
        assert_eq!(granted.len(), 1);

        let refused = log
            .privilege_records(
                &PrivilegeQuery::new()
                    .role(&user)
                    .access_type("do stuff on")
                    .resource("document", j.to_string())
                    .authorized(false),
            )
            .unwrap();
        assert_eq!(refused.len(), 1);
    }
}

#[test]
fn test_forget_history() {
    let org = organization();
    let log = org.engine.audit_log();

    let forgets = log
        .privilege_records(&PrivilegeQuery::new().action(PrivilegeAction::Forget))
        .unwrap();
    assert_eq!(forgets.len(), 1, "forgetting a missing rule writes nothing");
    assert_eq!(forgets[0].key(), &key("group", "3", "delete", "3"));

    let history = org
        .engine
        .history(&key("group", "3", "delete", "3"))
        .unwrap();
    let actions: Vec<_> = history.iter().map(|record| record.action).collect();
    assert_eq!(actions, vec![PrivilegeAction::Allow, PrivilegeAction::Forget]);
}

#[test]
fn test_resolution_and_rules_display() {
    let org = organization();
    let resolution = org
        .engine
        .role(&org.users[2])
        .explain("read", &org.documents[2])
        .unwrap();
    assert_eq!(
        resolution.to_string(),
        "user:3 can read document:3 (inherited at distance 2 from 1 rule(s))"
    );

    let rules: Vec<String> = org
        .engine
        .current_rules()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert!(rules.contains(&"allow data:* update document:3".to_string()));
    assert!(!rules.iter().any(|rule| rule.contains("delete")));
}
