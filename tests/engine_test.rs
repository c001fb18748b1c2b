use std::thread;
use std::time::Duration;

use tantu::{
    attrs, AttrMap, AttrValue, AutoIndexPolicy, CacheConfig, Edge, EdgeSelector, EngineConfig,
    EngineError, Graph, GraphError, IndexScope, LimitsConfig, NodeId, NodeQuery,
};

fn person(name: &str, age: i64) -> AttrMap {
    attrs([
        ("type", AttrValue::from("person")),
        ("name", AttrValue::from(name)),
        ("age", AttrValue::Int(age)),
    ])
}

#[test]
fn test_edge_uniqueness() {
    let graph = Graph::new();
    graph.add_node("a", AttrMap::new()).unwrap();
    graph.add_node("b", AttrMap::new()).unwrap();

    assert!(graph.add_edge("a", "b", "knows", attrs([("w", 1i64)])).unwrap());
    assert!(!graph.add_edge("a", "b", "knows", attrs([("w", 2i64)])).unwrap());

    assert_eq!(graph.edge_count().unwrap(), 1);
    let edge_attrs = graph.get_edge("a", "b", "knows").unwrap().unwrap();
    assert_eq!(edge_attrs.get("w").and_then(|v| v.as_int()), Some(2));

    // Same endpoints under a different relation is a distinct edge.
    assert!(graph.add_edge("a", "b", "likes", AttrMap::new()).unwrap());
    assert_eq!(graph.edge_count().unwrap(), 2);
}

#[test]
fn test_cascade_deletion() {
    let graph = Graph::new();
    for id in ["hub", "x", "y", "z"] {
        graph.add_node(id, AttrMap::new()).unwrap();
    }
    graph.add_edge("hub", "x", "r", AttrMap::new()).unwrap();
    graph.add_edge("hub", "y", "r", AttrMap::new()).unwrap();
    graph.add_edge("z", "hub", "r", AttrMap::new()).unwrap();
    graph.add_edge("x", "y", "r", AttrMap::new()).unwrap();

    let removed = graph.remove_node(&"hub".into()).unwrap();
    assert_eq!(removed, 3);
    assert_eq!(graph.edge_count().unwrap(), 1);
    assert_eq!(graph.node_count().unwrap(), 3);

    // No edge referencing the removed node survives anywhere.
    for id in ["x", "y", "z"] {
        let id: NodeId = id.into();
        for neighbor in graph.neighbors(&id, None).unwrap() {
            assert_ne!(neighbor, NodeId::new("hub"));
        }
    }
}

#[test]
fn test_missing_endpoint_rejected() {
    let graph = Graph::new();
    graph.add_node("a", AttrMap::new()).unwrap();

    let err = graph.add_edge("a", "ghost", "r", AttrMap::new()).unwrap_err();
    match err {
        EngineError::Graph(GraphError::EndpointMissing { missing, .. }) => {
            assert_eq!(missing, NodeId::new("ghost"));
        }
        other => panic!("expected EndpointMissing, got {other:?}"),
    }
    assert_eq!(graph.edge_count().unwrap(), 0);
}

#[test]
fn test_index_no_index_equivalence() {
    let graph = Graph::new();
    for i in 0..200 {
        graph
            .add_node(
                format!("p{}", i),
                attrs([
                    ("type", AttrValue::from(if i % 3 == 0 { "person" } else { "robot" })),
                    ("age", AttrValue::Int(i % 40)),
                ]),
            )
            .unwrap();
    }

    let by_type = NodeQuery::new().eq("type", "person");
    let by_both = NodeQuery::new().eq("type", "person").range("age", 10i64, 20i64);

    let scan_type = graph.find_nodes(&by_type).unwrap();
    let scan_both = graph.find_nodes(&by_both).unwrap();

    graph.build_index("type", IndexScope::Node).unwrap();
    assert_eq!(graph.find_nodes(&by_type).unwrap(), scan_type);
    assert_eq!(graph.find_nodes(&by_both).unwrap(), scan_both);

    graph.build_index("age", IndexScope::Node).unwrap();
    assert_eq!(graph.find_nodes(&by_both).unwrap(), scan_both);

    graph.drop_index("type", IndexScope::Node).unwrap();
    assert_eq!(graph.find_nodes(&by_type).unwrap(), scan_type);
}

#[test]
fn test_view_transparency() {
    let graph = Graph::new();
    graph.add_node("alice", person("Alice", 30)).unwrap();
    graph.add_node("acme", attrs([("type", "company")])).unwrap();

    let view = graph
        .create_view("people", |_, attrs| {
            attrs.get("type").and_then(|v| v.as_str()) == Some("person")
        })
        .unwrap();
    assert_eq!(view.node_count().unwrap(), 1);

    // Adding a matching node to the store grows the view with no call on
    // the view itself.
    graph.add_node("bob", person("Bob", 25)).unwrap();
    assert_eq!(view.node_count().unwrap(), 2);

    // Removal is equally visible.
    graph.remove_node(&"alice".into()).unwrap();
    assert_eq!(view.node_count().unwrap(), 1);
    assert!(!view.contains(&"alice".into()).unwrap());
}

#[test]
fn test_view_neighbors_restricted_to_members() {
    let graph = Graph::new();
    graph.add_node("a", person("A", 1)).unwrap();
    graph.add_node("b", person("B", 2)).unwrap();
    graph.add_node("c", attrs([("type", "company")])).unwrap();
    graph.add_edge("a", "b", "knows", AttrMap::new()).unwrap();
    graph.add_edge("a", "c", "works_at", AttrMap::new()).unwrap();

    let view = graph
        .create_view("people", |_, attrs| {
            attrs.get("type").and_then(|v| v.as_str()) == Some("person")
        })
        .unwrap();

    assert_eq!(view.neighbors(&"a".into()).unwrap(), vec![NodeId::new("b")]);
    assert_eq!(view.edge_count().unwrap(), 1);
}

#[test]
fn test_view_detaches_when_graph_dropped() {
    let graph = Graph::new();
    graph.add_node("a", person("A", 1)).unwrap();
    let view = graph.create_view("all", |_, _| true).unwrap();

    drop(graph);
    assert!(matches!(
        view.node_count(),
        Err(EngineError::ViewDetached { .. })
    ));
}

#[test]
fn test_frozen_view_membership() {
    let graph = Graph::new();
    graph.add_node("a", AttrMap::new()).unwrap();
    graph.add_node("b", AttrMap::new()).unwrap();

    let view = graph
        .create_view_frozen("pair", [NodeId::new("a"), NodeId::new("b")])
        .unwrap();
    assert_eq!(view.node_count().unwrap(), 2);

    // New store nodes never join a frozen view...
    graph.add_node("c", AttrMap::new()).unwrap();
    assert_eq!(view.node_count().unwrap(), 2);

    // ...but removed members report absent (live store, no stale data).
    graph.remove_node(&"a".into()).unwrap();
    assert_eq!(view.node_count().unwrap(), 1);
    assert!(!view.contains(&"a".into()).unwrap());
}

#[test]
fn test_concurrent_disjoint_writers() {
    let graph = Graph::new();
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let graph = graph.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    graph
                        .add_node(format!("t{}-n{}", t, i), attrs([("owner", AttrValue::Int(t))]))
                        .unwrap();
                }
                for i in 0..per_thread - 1 {
                    graph
                        .add_edge(
                            format!("t{}-n{}", t, i),
                            format!("t{}-n{}", t, i + 1),
                            "next",
                            AttrMap::new(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // No lost updates, no duplicate keys.
    assert_eq!(graph.node_count().unwrap(), (threads * per_thread) as usize);
    assert_eq!(
        graph.edge_count().unwrap(),
        (threads * (per_thread - 1)) as usize
    );
}

#[test]
fn test_concurrent_readers_during_writes() {
    let graph = Graph::new();
    for i in 0..100 {
        graph
            .add_node(format!("n{}", i), attrs([("v", AttrValue::Int(i))]))
            .unwrap();
    }
    for i in 0..99 {
        graph
            .add_edge(format!("n{}", i), format!("n{}", i + 1), "next", AttrMap::new())
            .unwrap();
    }

    let writer = {
        let graph = graph.clone();
        thread::spawn(move || {
            for i in 100..200 {
                graph.add_node(format!("n{}", i), AttrMap::new()).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    // Every read sees a consistent adjacency: the walk
                    // from n0 never hits a dangling edge.
                    let result = graph.bfs(&"n0".into(), None, None).unwrap();
                    assert!(result.node_count() >= 100);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(graph.node_count().unwrap(), 200);
}

#[test]
fn test_lock_timeout_surfaces() {
    let config = EngineConfig {
        lock_timeout_ms: Some(30),
        ..EngineConfig::default()
    };
    let graph = Graph::with_config(config).unwrap();
    graph.add_node("a", AttrMap::new()).unwrap();

    let holder = {
        let graph = graph.clone();
        thread::spawn(move || {
            graph
                .read_with(|_| thread::sleep(Duration::from_millis(300)))
                .unwrap();
        })
    };
    thread::sleep(Duration::from_millis(50));

    let err = graph.add_node("b", AttrMap::new()).unwrap_err();
    assert!(matches!(err, EngineError::ConcurrencyTimeout { .. }));
    holder.join().unwrap();

    // After the reader releases, writes proceed.
    graph.add_node("b", AttrMap::new()).unwrap();
    assert_eq!(graph.node_count().unwrap(), 2);
}

#[test]
fn test_batch_operations() {
    let graph = Graph::new();
    let created = graph
        .add_nodes_batch((0..10).map(|i| (NodeId::new(format!("n{}", i)), AttrMap::new())))
        .unwrap();
    assert_eq!(created, 10);

    let edges: Vec<Edge> = (0..9)
        .map(|i| Edge::new(format!("n{}", i), format!("n{}", i + 1), "next", AttrMap::new()))
        .collect();
    assert_eq!(graph.add_edges_batch(edges).unwrap(), 9);
    assert_eq!(graph.edge_count().unwrap(), 9);
}

#[test]
fn test_remove_edges_by_selector() {
    let graph = Graph::new();
    for id in ["a", "b", "c"] {
        graph.add_node(id, AttrMap::new()).unwrap();
    }
    graph.add_edge("a", "b", "r", AttrMap::new()).unwrap();
    graph.add_edge("a", "c", "r", AttrMap::new()).unwrap();
    graph.add_edge("b", "c", "s", AttrMap::new()).unwrap();

    assert_eq!(
        graph.remove_edges(&EdgeSelector::new().rel("r")).unwrap(),
        2
    );
    assert_eq!(graph.edge_count().unwrap(), 1);
}

#[test]
fn test_strict_insert() {
    let graph = Graph::new();
    graph.try_insert_node("a", AttrMap::new()).unwrap();
    let err = graph.try_insert_node("a", AttrMap::new()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::DuplicateNode(_))
    ));
}

#[test]
fn test_cache_hit_rate_in_stats() {
    let config = EngineConfig {
        cache: CacheConfig {
            capacity: 8,
            ttl_secs: 0,
        },
        ..EngineConfig::default()
    };
    let graph = Graph::with_config(config).unwrap();
    graph.add_node("a", person("Alice", 30)).unwrap();

    let query = NodeQuery::new().eq("type", "person");
    graph.find_nodes(&query).unwrap();
    graph.find_nodes(&query).unwrap();
    graph.find_nodes(&query).unwrap();

    let stats = graph.stats().unwrap();
    assert_eq!(stats.cache.hits, 2);
    assert_eq!(stats.cache.misses, 1);
    assert!(stats.cache.hit_rate > 0.6);
    assert_eq!(stats.metrics.queries, 3);
}

#[test]
fn test_zero_capacity_cache_same_results() {
    let cached = Graph::new();
    let uncached = Graph::with_config(EngineConfig {
        cache: CacheConfig {
            capacity: 0,
            ttl_secs: 0,
        },
        ..EngineConfig::default()
    })
    .unwrap();

    for graph in [&cached, &uncached] {
        for i in 0..20 {
            graph
                .add_node(format!("n{}", i), attrs([("band", AttrValue::Int(i % 4))]))
                .unwrap();
        }
    }

    let query = NodeQuery::new().eq("band", 2i64);
    assert_eq!(
        cached.find_nodes(&query).unwrap(),
        uncached.find_nodes(&query).unwrap()
    );
}

#[test]
fn test_auto_index_builds_after_repeated_queries() {
    let config = EngineConfig {
        auto_index: AutoIndexPolicy {
            enabled: true,
            min_queries: 2,
            selectivity_threshold: 0.5,
        },
        cache: CacheConfig {
            capacity: 0,
            ttl_secs: 0,
        },
        ..EngineConfig::default()
    };
    let graph = Graph::with_config(config).unwrap();
    for i in 0..40 {
        graph
            .add_node(
                format!("n{}", i),
                attrs([("shard", AttrValue::Int(i % 4))]),
            )
            .unwrap();
    }

    let query = NodeQuery::new().eq("shard", 1i64);
    let before = graph.find_nodes(&query).unwrap();
    assert!(!graph.has_index("shard", IndexScope::Node).unwrap());

    graph.find_nodes(&query).unwrap();
    graph.find_nodes(&query).unwrap();
    assert!(graph.has_index("shard", IndexScope::Node).unwrap());

    // Same answer once the index exists.
    assert_eq!(graph.find_nodes(&query).unwrap(), before);
}

#[test]
fn test_stats_counts() {
    let graph = Graph::new();
    graph.add_node("a", AttrMap::new()).unwrap();
    graph.add_node("b", AttrMap::new()).unwrap();
    graph.add_node("c", AttrMap::new()).unwrap();
    graph.add_edge("a", "b", "r", AttrMap::new()).unwrap();
    graph.build_index("type", IndexScope::Node).unwrap();
    graph.create_view("all", |_, _| true).unwrap();

    let stats = graph.stats().unwrap();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.edges, 1);
    assert_eq!(stats.views, 1);
    assert_eq!(stats.indexes, 1);
    assert_eq!(stats.components, 2);
    assert_eq!(stats.metrics.nodes_added, 3);
}

#[test]
fn test_memory_usage_and_reclaim() {
    let config = EngineConfig {
        limits: LimitsConfig {
            memory_budget_bytes: Some(1),
            ..LimitsConfig::default()
        },
        ..EngineConfig::default()
    };
    let graph = Graph::with_config(config).unwrap();
    for i in 0..50 {
        graph
            .add_node(format!("n{}", i), attrs([("g", AttrValue::Int(i % 5))]))
            .unwrap();
    }
    graph.find_nodes(&NodeQuery::new().eq("g", 1i64)).unwrap();

    let usage = graph.memory_usage().unwrap();
    assert!(usage.total_bytes > 0);

    let after = graph.reclaim_memory().unwrap().unwrap();
    assert_eq!(after.cache_bytes, 0);
    // Data survives reclamation untouched.
    assert_eq!(graph.node_count().unwrap(), 50);
}

#[test]
fn test_clear_resets_everything() {
    let graph = Graph::new();
    graph.add_node("a", person("A", 1)).unwrap();
    graph.add_node("b", person("B", 2)).unwrap();
    graph.add_edge("a", "b", "r", AttrMap::new()).unwrap();
    graph.build_index("type", IndexScope::Node).unwrap();

    graph.clear().unwrap();
    assert_eq!(graph.node_count().unwrap(), 0);
    assert_eq!(graph.edge_count().unwrap(), 0);
    assert!(!graph.has_index("type", IndexScope::Node).unwrap());
}
