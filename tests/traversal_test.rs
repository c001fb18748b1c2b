use std::collections::BTreeSet;

use tantu::{AttrMap, Graph, NodeId};

fn ids(path: &[&str]) -> Vec<NodeId> {
    path.iter().map(|s| NodeId::new(*s)).collect()
}

fn chain(graph: &Graph, nodes: &[&str], rel: &str) {
    for id in nodes {
        graph.add_node(*id, AttrMap::new()).unwrap();
    }
    for pair in nodes.windows(2) {
        graph.add_edge(pair[0], pair[1], rel, AttrMap::new()).unwrap();
    }
}

#[test]
fn test_acyclic_chain_properties() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c"], "r");

    assert_eq!(
        graph
            .shortest_path(&"a".into(), &"c".into(), None)
            .unwrap(),
        Some(ids(&["a", "b", "c"]))
    );
    assert!(!graph.has_cycles().unwrap());
    assert_eq!(graph.topological_sort().unwrap(), Some(ids(&["a", "b", "c"])));
}

#[test]
fn test_closing_the_cycle_flips_both_answers() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c"], "r");
    graph.add_edge("c", "a", "r", AttrMap::new()).unwrap();

    assert!(graph.has_cycles().unwrap());
    assert_eq!(graph.topological_sort().unwrap(), None);
}

#[test]
fn test_connected_components_partition() {
    let graph = Graph::new();
    chain(&graph, &["a", "b"], "r");
    chain(&graph, &["c", "d"], "r");

    let components = graph.connected_components().unwrap();
    assert_eq!(
        components,
        vec![
            BTreeSet::from([NodeId::new("a"), NodeId::new("b")]),
            BTreeSet::from([NodeId::new("c"), NodeId::new("d")]),
        ]
    );

    // Weakly-connected is the same construction for directed graphs.
    assert_eq!(graph.weakly_connected_components().unwrap(), components);
}

#[test]
fn test_bfs_depths_and_truncation() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c", "d"], "r");

    let full = graph.bfs(&"a".into(), None, None).unwrap();
    assert_eq!(full.node_count(), 4);
    assert_eq!(full.depth_of(&"d".into()), Some(3));
    assert!(!full.truncated);

    let cut = graph.bfs(&"a".into(), Some(2), None).unwrap();
    assert_eq!(cut.node_count(), 3);
    assert!(cut.truncated);
    assert_eq!(cut.max_depth_reached, 2);
}

#[test]
fn test_bfs_ignores_incoming_edges() {
    let graph = Graph::new();
    chain(&graph, &["a", "b"], "r");
    graph.add_node("c", AttrMap::new()).unwrap();
    graph.add_edge("c", "a", "r", AttrMap::new()).unwrap();

    let result = graph.bfs(&"a".into(), None, None).unwrap();
    assert!(result.contains(&"b".into()));
    assert!(!result.contains(&"c".into()));
}

#[test]
fn test_dfs_discovers_same_set_as_bfs() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c"], "r");
    graph.add_node("d", AttrMap::new()).unwrap();
    graph.add_edge("a", "d", "r", AttrMap::new()).unwrap();
    graph.add_edge("c", "a", "r", AttrMap::new()).unwrap();

    let bfs: BTreeSet<NodeId> = graph
        .bfs(&"a".into(), None, None)
        .unwrap()
        .order
        .into_iter()
        .collect();
    let dfs: BTreeSet<NodeId> = graph
        .dfs(&"a".into(), None, None)
        .unwrap()
        .order
        .into_iter()
        .collect();
    assert_eq!(bfs, dfs);
}

#[test]
fn test_shortest_path_no_path_is_not_an_error() {
    let graph = Graph::new();
    chain(&graph, &["a", "b"], "r");
    graph.add_node("island", AttrMap::new()).unwrap();

    assert_eq!(
        graph
            .shortest_path(&"a".into(), &"island".into(), None)
            .unwrap(),
        None
    );

    // Direction matters: b cannot reach a.
    assert_eq!(
        graph.shortest_path(&"b".into(), &"a".into(), None).unwrap(),
        None
    );
}

#[test]
fn test_all_shortest_paths() {
    let graph = Graph::new();
    for id in ["a", "b", "c", "d"] {
        graph.add_node(id, AttrMap::new()).unwrap();
    }
    for (src, dst) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
        graph.add_edge(src, dst, "r", AttrMap::new()).unwrap();
    }

    let paths = graph
        .all_shortest_paths(&"a".into(), &"d".into(), None)
        .unwrap();
    assert_eq!(paths, vec![ids(&["a", "b", "d"]), ids(&["a", "c", "d"])]);
}

#[test]
fn test_path_enumeration_bounded_on_cycles() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c"], "r");
    graph.add_edge("c", "a", "r", AttrMap::new()).unwrap();
    graph.add_edge("a", "c", "r", AttrMap::new()).unwrap();

    let mut paths = graph
        .find_paths(&"a".into(), &"c".into(), None, None)
        .unwrap();
    paths.sort();
    assert_eq!(paths, vec![ids(&["a", "b", "c"]), ids(&["a", "c"])]);

    let capped = graph
        .find_paths(&"a".into(), &"c".into(), Some(1), None)
        .unwrap();
    assert_eq!(capped, vec![ids(&["a", "c"])]);
}

#[test]
fn test_lazy_paths_through_read_guard() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c", "d"], "r");

    // Take just the first path without materializing the rest.
    let first = graph
        .read_with(|core| {
            tantu::traverse::find_paths(core, &"a".into(), &"d".into(), None, None)
                .unwrap()
                .next()
        })
        .unwrap();
    assert_eq!(first, Some(ids(&["a", "b", "c", "d"])));
}

#[test]
fn test_relation_filtered_traversal() {
    let graph = Graph::new();
    for id in ["a", "b", "c"] {
        graph.add_node(id, AttrMap::new()).unwrap();
    }
    graph.add_edge("a", "b", "road", AttrMap::new()).unwrap();
    graph.add_edge("b", "c", "rail", AttrMap::new()).unwrap();

    let road_only = graph
        .bfs(&"a".into(), None, Some(&"road".into()))
        .unwrap();
    assert!(road_only.contains(&"b".into()));
    assert!(!road_only.contains(&"c".into()));

    assert_eq!(
        graph
            .shortest_path(&"a".into(), &"c".into(), Some(&"road".into()))
            .unwrap(),
        None
    );
}

#[test]
fn test_traversals_see_mutations() {
    let graph = Graph::new();
    chain(&graph, &["a", "b", "c"], "r");
    assert!(!graph.has_cycles().unwrap());

    graph.add_edge("c", "a", "r", AttrMap::new()).unwrap();
    assert!(graph.has_cycles().unwrap());

    graph.remove_edge("c", "a", "r").unwrap();
    assert!(!graph.has_cycles().unwrap());
    assert_eq!(graph.topological_sort().unwrap(), Some(ids(&["a", "b", "c"])));
}
