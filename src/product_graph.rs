//! Pattern-constrained traversal over the product graph.
//!
//! A pattern is compiled (by the caller) into a finite-state automaton whose
//! states live in an arena ([`StateGraph`]) and whose transitions are either
//! same-node juxtapositions or cross-edge relationship expansions. The
//! product graph — data nodes paired with automaton states — is never
//! materialized: [`ProductGraphTraversalCursor`] computes the outgoing
//! product-graph edges of one (node, state-set) pair at a time.

mod cursor;
mod state;

pub use cursor::ProductGraphTraversalCursor;
pub use state::{
    NodeJuxtaposition, RelationshipExpansion, State, StateGraph, StateGraphBuilder, StateId,
};
