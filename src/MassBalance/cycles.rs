//! Cycle search over the mass-inequality graph.
//!
//! The graph module builds a `petgraph` `DiGraph` over the live SOMs (node
//! weights are SOM ids, one edge per inequality arc).
//! 1) `simple_cycles` - every elementary cycle (Johnson, 1975), iterative; the
//!    strongly connected components come from `petgraph::algo::tarjan_scc`
//! 2) `shortest_path` - path with the fewest arcs (`petgraph::algo::astar`),
//!    used to explain a contradicted equality
use petgraph::algo::{astar, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashSet};

/// Strongly connected component of `start` in the subgraph induced by the
/// nodes with index >= `start`.
fn component_from<N, E>(graph: &DiGraph<N, E>, start: NodeIndex) -> HashSet<NodeIndex> {
    let sub: DiGraph<NodeIndex, ()> =
        graph.filter_map(|node, _| (node >= start).then_some(node), |_, _| Some(()));
    // filter_map keeps the node order: `start` is node 0 of `sub`
    tarjan_scc(&sub)
        .into_iter()
        .find(|scc| scc.contains(&NodeIndex::new(0)))
        .map(|scc| scc.into_iter().map(|n| sub[n]).collect())
        .unwrap_or_default()
}

/// Enumerates every elementary cycle of the graph (Johnson's algorithm).
///
/// Each cycle is listed once, starting from its smallest node index, in
/// traversal order. Self-loops are reported as cycles of length 1; a pair of
/// opposite edges is a cycle of length 2.
pub fn simple_cycles<N, E>(graph: &DiGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let num_nodes = graph.node_count();
    let mut cycles = Vec::new();
    let mut blocked = vec![false; num_nodes];
    let mut block_map: Vec<BTreeSet<NodeIndex>> = vec![BTreeSet::new(); num_nodes];

    for start in graph.node_indices() {
        let component = component_from(graph, start);
        let has_self_loop = graph.contains_edge(start, start);
        if component.len() < 2 && !has_self_loop {
            continue;
        }
        let successors = |u: NodeIndex| -> Vec<NodeIndex> {
            let mut next: Vec<NodeIndex> = graph
                .neighbors(u)
                .filter(|w| component.contains(w))
                .collect();
            next.sort();
            next.dedup();
            next
        };
        for node in &component {
            blocked[node.index()] = false;
            block_map[node.index()].clear();
        }

        let mut path = vec![start];
        blocked[start.index()] = true;
        // (node, successors, next position, closed a cycle)
        let mut frames: Vec<(NodeIndex, Vec<NodeIndex>, usize, bool)> =
            vec![(start, successors(start), 0, false)];

        while let Some(frame) = frames.last_mut() {
            if frame.2 < frame.1.len() {
                let w = frame.1[frame.2];
                frame.2 += 1;
                if w == start {
                    cycles.push(path.clone());
                    frame.3 = true;
                } else if !blocked[w.index()] {
                    path.push(w);
                    blocked[w.index()] = true;
                    let next = successors(w);
                    frames.push((w, next, 0, false));
                }
                continue;
            }
            let Some((v, succ, _, found)) = frames.pop() else {
                break;
            };
            if found {
                unblock(v, &mut blocked, &mut block_map);
            } else {
                for w in succ {
                    block_map[w.index()].insert(v);
                }
            }
            path.pop();
            if let Some(parent) = frames.last_mut() {
                parent.3 |= found;
            }
        }
    }
    cycles
}

fn unblock(node: NodeIndex, blocked: &mut [bool], block_map: &mut [BTreeSet<NodeIndex>]) {
    let mut pending = vec![node];
    while let Some(u) = pending.pop() {
        if !blocked[u.index()] {
            continue;
        }
        blocked[u.index()] = false;
        let waiting = std::mem::take(&mut block_map[u.index()]);
        pending.extend(waiting);
    }
}

/// Directed path with the fewest arcs from `from` to `to` (both included), if any.
pub fn shortest_path<N, E>(
    graph: &DiGraph<N, E>,
    from: NodeIndex,
    to: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if from.index() >= graph.node_count() || to.index() >= graph.node_count() {
        return None;
    }
    astar(graph, from, |node| node == to, |_| 1usize, |_| 0).map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(num_nodes: usize, edges: &[(usize, usize)]) -> DiGraph<usize, ()> {
        let mut g = DiGraph::new();
        for i in 0..num_nodes {
            g.add_node(i);
        }
        for &(a, b) in edges {
            g.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
        g
    }

    fn indices(cycles: Vec<Vec<NodeIndex>>) -> Vec<Vec<usize>> {
        let mut cycles: Vec<Vec<usize>> = cycles
            .into_iter()
            .map(|c| c.into_iter().map(|n| n.index()).collect())
            .collect();
        cycles.sort();
        cycles
    }

    #[test]
    fn test_component_ignores_lower_nodes() {
        // 0 <-> 1, 2 -> 3 -> 4 -> 2, 1 -> 2
        let g = graph(5, &[(0, 1), (1, 0), (1, 2), (2, 3), (3, 4), (4, 2)]);
        let sorted = |set: HashSet<NodeIndex>| {
            let mut v: Vec<usize> = set.into_iter().map(|n| n.index()).collect();
            v.sort();
            v
        };
        assert_eq!(sorted(component_from(&g, NodeIndex::new(0))), vec![0, 1]);
        assert_eq!(sorted(component_from(&g, NodeIndex::new(2))), vec![2, 3, 4]);
        // without node 0, node 1 is alone
        assert_eq!(sorted(component_from(&g, NodeIndex::new(1))), vec![1]);
    }

    #[test]
    fn test_no_cycles_in_dag() {
        let g = graph(3, &[(0, 1), (0, 2), (1, 2)]);
        assert!(simple_cycles(&g).is_empty());
        assert!(simple_cycles(&graph(0, &[])).is_empty());
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph(2, &[(0, 1), (1, 0)]);
        assert_eq!(indices(simple_cycles(&g)), vec![vec![0, 1]]);
    }

    #[test]
    fn test_three_node_cycle_without_shortcuts() {
        let g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(indices(simple_cycles(&g)), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(2, &[(0, 0), (0, 1)]);
        assert_eq!(indices(simple_cycles(&g)), vec![vec![0]]);
    }

    #[test]
    fn test_all_elementary_cycles_are_found() {
        // 0 -> 1 -> 2 -> 0 and 0 -> 2 -> 0 and 1 -> 0
        let g = graph(3, &[(0, 1), (0, 2), (1, 2), (1, 0), (2, 0)]);
        assert_eq!(
            indices(simple_cycles(&g)),
            vec![vec![0, 1], vec![0, 1, 2], vec![0, 2]]
        );
    }

    #[test]
    fn test_complete_graph_cycle_count() {
        // complete digraph on 4 nodes has 20 elementary cycles
        let edges: Vec<(usize, usize)> = (0..4)
            .flat_map(|u| (0..4).filter(move |&v| v != u).map(move |v| (u, v)))
            .collect();
        assert_eq!(simple_cycles(&graph(4, &edges)).len(), 20);
    }

    #[test]
    fn test_disjoint_cycles() {
        let g = graph(5, &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        assert_eq!(indices(simple_cycles(&g)), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_shortest_path() {
        let g = graph(4, &[(0, 1), (0, 3), (1, 2), (3, 2)]);
        let path = shortest_path(&g, NodeIndex::new(0), NodeIndex::new(2)).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].index(), 0);
        assert_eq!(path[2].index(), 2);
        assert_eq!(shortest_path(&g, NodeIndex::new(2), NodeIndex::new(0)), None);
        assert_eq!(
            shortest_path(&g, NodeIndex::new(1), NodeIndex::new(1)),
            Some(vec![NodeIndex::new(1)])
        );
        assert_eq!(shortest_path(&g, NodeIndex::new(0), NodeIndex::new(9)), None);
    }
}
