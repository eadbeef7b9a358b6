//! Small labeled street networks shared by unit and integration tests.

use ltn_core::{Junction, JunctionId, Street, StreetId, StreetNetwork};
use petgraph::graph::NodeIndex;

/// 4-junction square, directed cycle 0 → 1 → 2 → 3 → 0, unit lengths. The two
/// opposite streets 0→1 and 2→3 carry label "A"; the other two are unassigned.
pub fn square_network() -> StreetNetwork {
    let mut network = StreetNetwork::with_crs("EPSG:32633");
    let nodes: Vec<NodeIndex> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            network.add_junction(
                Junction::new(JunctionId::new(i))
                    .with_projected(x, y)
                    .with_geographic(48.0 + 0.001 * y, 11.0 + 0.001 * x),
            )
        })
        .collect();
    network.add_street(nodes[0], nodes[1], Street::new(StreetId::new(0), 1.0).with_label("A"));
    network.add_street(nodes[1], nodes[2], Street::new(StreetId::new(1), 1.0));
    network.add_street(nodes[2], nodes[3], Street::new(StreetId::new(2), 1.0).with_label("A"));
    network.add_street(nodes[3], nodes[0], Street::new(StreetId::new(3), 1.0));
    network
}

/// A sparsified spine s0 ↔ s1 ↔ s2 (junctions 0, 1, 2; unit lengths) with two
/// labeled cells hanging off it:
///
/// - cell "A": s0 ↔ a ↔ s2 with half-length streets — a shortcut through the
///   interior junction a (junction 3, streets 4..=7)
/// - cell "B": triangle s1 ↔ b1 ↔ b2 ↔ s1 (junctions 4 and 5, streets 8..=13)
///
/// Every street is a paired directed edge, so all distances are two-way.
/// Interiors after a default run: A = {3}, B = {4, 5}.
pub fn spine_and_cells() -> StreetNetwork {
    let mut network = StreetNetwork::with_crs("EPSG:32633");
    let coords = [
        (0.0, 0.0),     // s0
        (100.0, 0.0),   // s1
        (200.0, 0.0),   // s2
        (100.0, -50.0), // a
        (50.0, 80.0),   // b1
        (150.0, 80.0),  // b2
    ];
    let nodes: Vec<NodeIndex> = coords
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            network.add_junction(
                Junction::new(JunctionId::new(i))
                    .with_projected(x, y)
                    .with_geographic(48.0 + y * 1e-5, 11.0 + x * 1e-5),
            )
        })
        .collect();

    let mut next_street = 0usize;
    let mut both_ways =
        |network: &mut StreetNetwork, u: usize, v: usize, length: f64, label: Option<&str>| {
            for (from, to) in [(u, v), (v, u)] {
                let mut street = Street::new(StreetId::new(next_street), length);
                if let Some(label) = label {
                    street = street.with_label(label);
                }
                network.add_street(nodes[from], nodes[to], street);
                next_street += 1;
            }
        };

    // spine (unassigned)
    both_ways(&mut network, 0, 1, 1.0, None);
    both_ways(&mut network, 1, 2, 1.0, None);
    // cell A: shortcut through the interior junction a
    both_ways(&mut network, 0, 3, 0.5, Some("A"));
    both_ways(&mut network, 3, 2, 0.5, Some("A"));
    // cell B: triangle on s1
    both_ways(&mut network, 1, 4, 1.0, Some("B"));
    both_ways(&mut network, 4, 5, 1.0, Some("B"));
    both_ways(&mut network, 5, 1, 1.0, Some("B"));
    network
}

/// Two one-street cells "X" and "Y" sharing the junction m, which ends up
/// interior to both — an overlapping decomposition the restricted distance
/// computation must reject.
pub fn overlapping_cells() -> StreetNetwork {
    let mut network = StreetNetwork::with_crs("EPSG:32633");
    let nodes: Vec<NodeIndex> = (0..5)
        .map(|i| {
            network.add_junction(
                Junction::new(JunctionId::new(i)).with_projected(i as f64 * 10.0, 0.0),
            )
        })
        .collect();
    let (p, q, r, t, m) = (nodes[0], nodes[1], nodes[2], nodes[3], nodes[4]);
    network.add_street(p, m, Street::new(StreetId::new(0), 1.0).with_label("X"));
    network.add_street(m, q, Street::new(StreetId::new(1), 1.0).with_label("X"));
    network.add_street(r, m, Street::new(StreetId::new(2), 1.0).with_label("Y"));
    network.add_street(m, t, Street::new(StreetId::new(3), 1.0).with_label("Y"));
    // skeleton keeping the cell boundary junctions on the sparsified graph
    network.add_street(q, p, Street::new(StreetId::new(4), 1.0));
    network.add_street(t, r, Street::new(StreetId::new(5), 1.0));
    network
}
