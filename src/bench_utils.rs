//! Deterministic graph generators shared by benchmarks and randomized tests.
//!
//! All generators are seeded so runs are repeatable and fair across
//! implementations under comparison.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::snapshot::SnapshotGraph;
use crate::storage::{NodeId, Token};

/// Deterministic seed shared by benches and fuzz-style tests.
pub const DEFAULT_SEED: u64 = 0x5F3759DF;

/// Relationship type used by the generated graphs.
pub const LINK: Token = 0;

/// Graph topology types for benchmarking.
#[derive(Debug, Clone, Copy)]
pub enum GraphTopology {
    /// Linear chain of nodes
    Chain,
    /// Star topology (one central node)
    Star,
    /// Grid topology (2D grid)
    Grid,
    /// Random graph with a given edge count
    Random { edge_count: usize },
}

/// A generated snapshot plus its node ids in creation order.
pub struct GeneratedGraph {
    pub graph: SnapshotGraph,
    pub nodes: Vec<NodeId>,
}

/// Build a deterministic graph of the given topology and size.
pub fn build_graph(topology: GraphTopology, node_count: usize, seed: u64) -> GeneratedGraph {
    let mut graph = SnapshotGraph::new();
    let nodes: Vec<NodeId> = (0..node_count).map(|_| graph.add_node(&[])).collect();
    match topology {
        GraphTopology::Chain => {
            for window in nodes.windows(2) {
                graph.add_relationship(window[0], LINK, window[1]);
            }
        }
        GraphTopology::Star => {
            for &node in &nodes[1..] {
                graph.add_relationship(nodes[0], LINK, node);
            }
        }
        GraphTopology::Grid => {
            let width = (node_count as f64).sqrt().ceil() as usize;
            for (i, &node) in nodes.iter().enumerate() {
                if (i + 1) % width != 0 && i + 1 < node_count {
                    graph.add_relationship(node, LINK, nodes[i + 1]);
                }
                if i + width < node_count {
                    graph.add_relationship(node, LINK, nodes[i + width]);
                }
            }
        }
        GraphTopology::Random { edge_count } => {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..edge_count {
                let from = nodes[rng.gen_range(0..node_count)];
                let to = nodes[rng.gen_range(0..node_count)];
                graph.add_relationship(from, LINK, to);
            }
        }
    }
    GeneratedGraph { graph, nodes }
}

/// Build a graph where every node carries a random subset of `label_count`
/// label tokens. Used by the set-algebra benches and tests.
pub fn build_labeled_graph(node_count: usize, label_count: usize, seed: u64) -> GeneratedGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = SnapshotGraph::new();
    let mut nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let labels: Vec<Token> = (0..label_count as Token)
            .filter(|_| rng.gen_bool(0.5))
            .collect();
        nodes.push(graph.add_node(&labels));
    }
    GeneratedGraph { graph, nodes }
}
