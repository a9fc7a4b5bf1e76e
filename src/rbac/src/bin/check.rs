//! RBAC fixture checker
//!
//! Replays a JSON fixture (hierarchy edges, rule mutations, access queries)
//! into an engine and prints one decision per query.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=cretoai_rbac=debug rbac-check fixture.json
//! ```
//!
//! ## Configuration
//!
//! Engine settings come from `RBAC_*` environment variables:
//! - `RBAC_DEFAULT_RESPONSE`: `allow` or `deny` (default: deny)
//! - `RBAC_SKIP_IMPLICIT`: `true` to ignore inherited rules
//! - `RBAC_LOG_ACCESS`, `RBAC_LOG_PRIVILEGES`, `RBAC_LOG_HIERARCHY`: booleans
//! - `RBAC_ROLES_LIST`, `RBAC_RESOURCES_LIST`: JSON lists of type names
//!
//! ## Fixture
//!
//! ```json
//! {
//!   "edges": [{ "ascendant": { "type": "group", "id": "1" },
//!               "descendant": { "type": "user", "id": "1" } }],
//!   "rules": [{ "action": "allow", "role_type": "group", "role_id": "1",
//!               "access_type": "read", "resource_type": "document", "resource_id": "1" }],
//!   "queries": [{ "principal": { "type": "user", "id": "1" },
//!                 "access_type": "read", "resource": { "type": "document", "id": "1" } }]
//! }
//! ```

use anyhow::{bail, Context};
use cretoai_rbac::{AccessEngine, PrivilegeAction, ResourceRef, RoleIdentity, RuleKey, Settings};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    rules: Vec<RuleMutation>,
    #[serde(default)]
    queries: Vec<Query>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    ascendant: RoleIdentity,
    descendant: RoleIdentity,
}

#[derive(Debug, Deserialize)]
struct RuleMutation {
    action: PrivilegeAction,
    #[serde(flatten)]
    key: RuleKey,
}

#[derive(Debug, Deserialize)]
struct Query {
    principal: RoleIdentity,
    access_type: String,
    resource: ResourceRef,
}

fn replay(engine: &AccessEngine, fixture: Fixture) -> anyhow::Result<Vec<String>> {
    for edge in fixture.edges {
        engine
            .add_edge(edge.ascendant, edge.descendant)
            .context("adding hierarchy edge")?;
    }

    for rule in fixture.rules {
        match rule.action {
            PrivilegeAction::Allow => engine.allow(rule.key).map(drop),
            PrivilegeAction::Deny => engine.deny(rule.key).map(drop),
            PrivilegeAction::Forget => engine.forget(&rule.key).map(drop),
        }
        .context("applying rule mutation")?;
    }

    fixture
        .queries
        .iter()
        .map(|query| {
            engine
                .explain(&query.principal, &query.access_type, &query.resource)
                .map(|resolution| resolution.to_string())
                .map_err(anyhow::Error::from)
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cretoai_rbac=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: rbac-check <fixture.json>");
    };

    let settings = Settings::from_env().context("invalid RBAC_* settings")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let fixture: Fixture =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    info!(
        edges = fixture.edges.len(),
        rules = fixture.rules.len(),
        queries = fixture.queries.len(),
        "Replaying fixture"
    );

    let engine = AccessEngine::new(settings);
    for line in replay(&engine, fixture)? {
        println!("{}", line);
    }

    Ok(())
}
