//! City route graph tests

use ride_dispatch::simulation::{DispatchError, NodeId, RouteGraph};

fn two_node_graph() -> RouteGraph {
    let mut graph = RouteGraph::new();
    graph.add_location(NodeId(1), "A");
    graph.add_location(NodeId(2), "B");
    graph.add_edge(NodeId(1), NodeId(2), 10.0).unwrap();
    graph
}

#[test]
fn test_congestion_scales_route_cost() {
    let mut graph = two_node_graph();

    let route = graph.shortest_route(NodeId(1), NodeId(2)).unwrap();
    assert_eq!(route.nodes, vec![NodeId(1), NodeId(2)]);
    assert_eq!(route.total_cost, 10.0);

    graph.update_congestion(NodeId(1), NodeId(2), 2.0).unwrap();
    let route = graph.shortest_route(NodeId(1), NodeId(2)).unwrap();
    assert_eq!(route.total_cost, 20.0);
}

#[test]
fn test_congestion_is_not_compounded() {
    let mut graph = two_node_graph();
    graph.update_congestion(NodeId(1), NodeId(2), 2.0).unwrap();
    graph.update_congestion(NodeId(1), NodeId(2), 3.0).unwrap();

    let edge = graph.edge(NodeId(1), NodeId(2)).unwrap();
    assert_eq!(edge.base_weight, 10.0);
    assert_eq!(edge.congestion, 3.0);
    assert_eq!(edge.weight, 30.0);
}

#[test]
fn test_route_to_self_costs_nothing() {
    let graph = RouteGraph::demo_city().unwrap();
    for location in graph.locations() {
        let route = graph.shortest_route(location.id, location.id).unwrap();
        assert_eq!(route.nodes, vec![location.id]);
        assert_eq!(route.total_cost, 0.0);
    }
}

#[test]
fn test_edges_are_one_way() {
    let graph = two_node_graph();
    assert_eq!(
        graph.shortest_route(NodeId(2), NodeId(1)),
        Err(DispatchError::RouteUnreachable {
            from: NodeId(2),
            to: NodeId(1)
        })
    );
}

#[test]
fn test_unknown_node_is_reported() {
    let mut graph = two_node_graph();
    assert_eq!(
        graph.shortest_route(NodeId(1), NodeId(9)),
        Err(DispatchError::UnknownNode(NodeId(9)))
    );
    assert_eq!(
        graph.update_congestion(NodeId(7), NodeId(1), 1.5),
        Err(DispatchError::UnknownNode(NodeId(7)))
    );
    assert_eq!(
        graph.add_edge(NodeId(1), NodeId(3), 1.0),
        Err(DispatchError::UnknownNode(NodeId(3)))
    );
}

#[test]
fn test_invalid_updates_are_rejected() {
    let mut graph = two_node_graph();
    assert_eq!(
        graph.update_congestion(NodeId(1), NodeId(2), 0.0),
        Err(DispatchError::InvalidCongestion(0.0))
    );
    assert_eq!(
        graph.update_congestion(NodeId(1), NodeId(2), -1.0),
        Err(DispatchError::InvalidCongestion(-1.0))
    );
    assert_eq!(
        graph.update_congestion(NodeId(2), NodeId(1), 2.0),
        Err(DispatchError::UnknownEdge(NodeId(2), NodeId(1)))
    );
    assert_eq!(
        graph.add_edge(NodeId(2), NodeId(1), -5.0),
        Err(DispatchError::InvalidWeight(-5.0))
    );
    // Nothing changed
    assert_eq!(graph.shortest_route(NodeId(1), NodeId(2)).unwrap().total_cost, 10.0);
}

#[test]
fn test_demo_city_shortest_route() {
    let graph = RouteGraph::demo_city().unwrap();
    assert_eq!(graph.location_count(), 6);
    assert_eq!(graph.edge_count(), 24);

    // Hostels -> Gate 1 -> F-10 Markaz = 3 + 15
    let route = graph.shortest_route(NodeId(1), NodeId(6)).unwrap();
    assert_eq!(route.nodes, vec![NodeId(1), NodeId(2), NodeId(6)]);
    assert_eq!(route.total_cost, 18.0);
    assert_eq!(
        route.describe(&graph),
        "NUST Hostels -> NUST Gate 1 -> F-10 Markaz"
    );
}

#[test]
fn test_congestion_reroutes() {
    let mut graph = RouteGraph::demo_city().unwrap();
    graph.update_congestion(NodeId(2), NodeId(6), 3.0).unwrap();

    // Gate 1 -> F-10 now costs 45; Hostels -> Gate 2 -> F-10 is 2 + 25
    let route = graph.shortest_route(NodeId(1), NodeId(6)).unwrap();
    assert_eq!(route.nodes, vec![NodeId(1), NodeId(3), NodeId(6)]);
    assert_eq!(route.total_cost, 27.0);
}

#[test]
fn test_cost_never_drops_as_congestion_rises() {
    let mut graph = RouteGraph::demo_city().unwrap();
    let pairs = [(1, 5), (1, 6), (4, 5), (5, 1), (6, 4)];

    for (from, to) in pairs {
        let (from, to) = (NodeId(from), NodeId(to));
        let mut previous = graph.shortest_route(from, to).unwrap();
        for factor in [1.5, 2.0, 4.0, 10.0] {
            // Congest the first edge of the current best route
            let first_hop = (previous.nodes[0], previous.nodes[1]);
            graph
                .update_congestion(first_hop.0, first_hop.1, factor)
                .unwrap();
            let next = graph.shortest_route(from, to).unwrap();
            assert!(
                next.total_cost >= previous.total_cost,
                "{:?} -> {:?}: cost fell from {} to {}",
                from,
                to,
                previous.total_cost,
                next.total_cost
            );
            previous = next;
        }
    }
}

#[test]
fn test_locations_are_sorted() {
    let graph = RouteGraph::demo_city().unwrap();
    let ids: Vec<u32> = graph.locations().iter().map(|l| l.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_adding_same_road_twice_replaces_it() {
    let mut graph = two_node_graph();
    graph.add_edge(NodeId(1), NodeId(2), 10.0).unwrap();
    assert_eq!(graph.edge_count(), 1);

    graph.update_congestion(NodeId(1), NodeId(2), 2.0).unwrap();
    assert_eq!(graph.shortest_route(NodeId(1), NodeId(2)).unwrap().total_cost, 20.0);

    // A new base weight resets the congestion on that road
    graph.add_edge(NodeId(1), NodeId(2), 4.0).unwrap();
    let edge = graph.edge(NodeId(1), NodeId(2)).unwrap();
    assert_eq!(edge.congestion, 1.0);
    assert_eq!(graph.shortest_route(NodeId(1), NodeId(2)).unwrap().total_cost, 4.0);
}
