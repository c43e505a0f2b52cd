//! Dependency-closed, topologically sorted resolution of a subset of a
//! lock file's assets.
//!
//! A `petgraph::DiGraph` keyed on asset name, Kahn's-algorithm topological
//! sort (via `petgraph::algo::toposort`) with a lexicographic tie-break for
//! determinism, and explicit cycle reporting rather than a bare `Err(())`.

use crate::asset::Asset;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use thiserror::Error;

/// A dependency cycle, carrying the participating asset names in cycle
/// order for display.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{}", cycle.join(" -> "))]
pub struct CycleError {
    /// Asset names forming the cycle, first element repeated at the end.
    pub cycle: Vec<String>,
}

/// Resolve `subset` (by name) against the full asset list `all`, closing
/// under transitive dependencies and returning a topologically sorted
/// list: for every edge `A -> B` (A depends on B), B precedes A.
///
/// Ties are broken by asset name so the output is deterministic across
/// runs for the same input.
pub fn resolve(all: &[Asset], subset: &[String]) -> Result<Vec<Asset>, CycleError> {
    let by_name: HashMap<&str, &Asset> = all.iter().map(|a| (a.name.as_str(), a)).collect();

    // Close `subset` under transitive dependencies.
    let mut closed: Vec<&str> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut stack: Vec<&str> = subset.iter().map(String::as_str).collect();
    while let Some(name) = stack.pop() {
        if !seen.insert(name) {
            continue;
        }
        closed.push(name);
        if let Some(asset) = by_name.get(name) {
            for dep in &asset.dependencies {
                stack.push(dep.as_str());
            }
        }
    }
    closed.sort_unstable();

    let mut graph = DiGraph::<&str, ()>::new();
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::new();
    for name in &closed {
        index_of.insert(name, graph.add_node(name));
    }
    for name in &closed {
        if let Some(asset) = by_name.get(name) {
            let mut deps: Vec<&str> = asset.dependencies.iter().map(String::as_str).collect();
            deps.sort_unstable();
            for dep in deps {
                // Edge dep -> name: dep must be installed before name, so
                // toposort (which yields sources first) must visit `dep`
                // first. petgraph's toposort visits edge sources before
                // targets, so we point the edge from dependency to
                // dependent's *reverse*: we want dep before name, i.e. an
                // edge name -> dep would put dep after name under
                // toposort's "no incoming edges first" rule. We instead add
                // dep -> name so dep (no dependents pointing into it from
                // unprocessed nodes) surfaces first.
                graph.add_edge(index_of[dep], index_of[name], ());
            }
        }
    }

    let order = petgraph::algo::toposort(&graph, None).map_err(|cycle_node| {
        let start = graph[cycle_node.node_id()];
        CycleError { cycle: find_cycle(&graph, &index_of, start) }
    })?;

    Ok(order.into_iter().filter_map(|idx| by_name.get(graph[idx]).copied().cloned()).collect())
}

/// Walk forward from `start` following edges until we return to a
/// previously visited node, to produce a human-readable cycle path.
fn find_cycle(
    graph: &DiGraph<&str, ()>,
    index_of: &HashMap<&str, NodeIndex>,
    start: &str,
) -> Vec<String> {
    let mut path = vec![start.to_string()];
    let mut visited = std::collections::HashSet::new();
    visited.insert(start);
    let mut current = index_of[start];

    loop {
        let Some(next) = graph.neighbors(current).next() else {
            break;
        };
        let next_name = graph[next];
        path.push(next_name.to_string());
        if !visited.insert(next_name) {
            break;
        }
        current = next;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetKind, AssetSource};
    use std::collections::HashMap;

    fn asset(name: &str, deps: Vec<&str>) -> Asset {
        Asset {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            kind: AssetKind::Skill,
            config: HashMap::new(),
            scopes: vec![],
            clients: vec![],
            source: AssetSource::SourcePath { path: format!("{name}.zip") },
            dependencies: deps.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn dependency_installs_before_dependent() {
        let all = vec![asset("a", vec!["b"]), asset("b", vec![])];
        let order = resolve(&all, &["a".to_string()]).unwrap();
        let names: Vec<_> = order.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn closes_transitively() {
        let all = vec![asset("a", vec!["b"]), asset("b", vec!["c"]), asset("c", vec![])];
        let order = resolve(&all, &["a".to_string()]).unwrap();
        let names: Vec<_> = order.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn detects_cycles() {
        let all = vec![asset("a", vec!["b"]), asset("b", vec!["a"])];
        let err = resolve(&all, &["a".to_string()]).unwrap_err();
        assert!(err.cycle.len() >= 2);
    }

    #[test]
    fn deterministic_tie_break_by_name() {
        let all =
            vec![asset("z", vec![]), asset("a", vec![]), asset("m", vec![])];
        let order1 = resolve(&all, &["z".to_string(), "a".to_string(), "m".to_string()]).unwrap();
        let order2 = resolve(&all, &["m".to_string(), "z".to_string(), "a".to_string()]).unwrap();
        let names1: Vec<_> = order1.iter().map(|a| a.name.clone()).collect();
        let names2: Vec<_> = order2.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names1, names2);
    }
}
