//! Role hierarchy module
//!
//! Provides the directed role graph and its traversal primitives:
//! direct membership, transitive ascendancy, ascendant/descendant
//! enumeration in either search order, and distance layering used by the
//! resolution engine.
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::hierarchy::{RoleGraph, SearchOrder};
//! use cretoai_rbac::RoleIdentity;
//!
//! let mut graph = RoleGraph::new();
//! let group = RoleIdentity::new("group", "1");
//! let user = RoleIdentity::new("user", "1");
//!
//! graph.add_edge(group.clone(), user.clone());
//!
//! assert!(graph.has_direct_edge(&group, &user));
//! assert_eq!(graph.ascendants(&user, SearchOrder::DepthFirst), vec![group]);
//! ```

pub mod graph;


pub use graph::{AscendantLayers, RoleGraph, SearchOrder};
