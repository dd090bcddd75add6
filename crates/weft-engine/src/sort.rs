//! Topological ordering of the executable subgraph.

use std::collections::{HashMap, HashSet, VecDeque};

use weft_core::{Edge, Node};

/// The executable subgraph contains a cycle.
#[derive(Debug, thiserror::Error)]
#[error("cycle detected")]
pub struct CycleError;

/// Kahn's algorithm over the executable nodes and data edges, FIFO
/// queue, ties broken by document order. Edges touching nodes outside
/// the executable set (tool providers) are ignored.
pub fn topological_order(nodes: &[&Node], edges: &[&Edge]) -> Result<Vec<String>, CycleError> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    let mut in_degree: HashMap<&str, usize> =
        nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for edge in edges {
        if ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str()) {
            *in_degree.get_mut(edge.target.as_str()).expect("known target") += 1;
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .filter(|n| in_degree[n.id.as_str()] == 0)
        .map(|n| n.id.as_str())
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());
        for edge in edges {
            if edge.source != current || !ids.contains(edge.target.as_str()) {
                continue;
            }
            let degree = in_degree.get_mut(edge.target.as_str()).expect("known target");
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(edge.target.as_str());
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(CycleError);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Workflow;

    fn doc(nodes: &[&str], edges: &[(&str, &str)]) -> Workflow {
        let mut wf = Workflow::new("wf_sort", "sort");
        for id in nodes {
            wf = wf.with_node(Node::new(*id, "text-input", *id));
        }
        for (i, (from, to)) in edges.iter().enumerate() {
            wf = wf.with_edge(format!("e{i}"), *from, *to);
        }
        wf
    }

    fn order_of(wf: &Workflow) -> Result<Vec<String>, CycleError> {
        let nodes: Vec<&Node> = wf.nodes.iter().collect();
        let edges: Vec<&Edge> = wf.edges.iter().collect();
        topological_order(&nodes, &edges)
    }

    #[test]
    fn linear_chain_keeps_its_order() {
        let wf = doc(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert_eq!(order_of(&wf).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_breaks_ties_by_document_order() {
        let wf = doc(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert_eq!(order_of(&wf).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn independent_roots_enqueue_in_document_order() {
        let wf = doc(&["x", "y", "z"], &[]);
        assert_eq!(order_of(&wf).unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn cycle_is_detected() {
        let wf = doc(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert!(order_of(&wf).is_err());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let wf = doc(&["a"], &[("a", "a")]);
        assert!(order_of(&wf).is_err());
    }
}
