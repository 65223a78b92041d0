//! Static network topology and routing picks.

use crate::{LinkId, NodeId};
use rand::Rng;
use std::time::Duration;

/// One directed link out of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Peer on the far end.
    pub to: NodeId,
    /// Propagation delay applied to traffic crossing the link.
    pub delay: Duration,
    /// Probability that traffic crossing the link is dropped in transit.
    pub loss: f64,
}

impl Link {
    /// A lossless, zero-delay link to the given peer.
    pub fn to(peer: NodeId) -> Self {
        Self {
            to: peer,
            delay: Duration::ZERO,
            loss: 0.0,
        }
    }

    /// Set the propagation delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the transit loss probability, clamped to [0, 1].
    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = loss.clamp(0.0, 1.0);
        self
    }
}

/// Errors from topology lookups and routing picks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Node index outside the topology.
    #[error("node {0} is not in the topology")]
    UnknownNode(NodeId),

    /// Node has an empty link list.
    #[error("node {0} has no outgoing links")]
    NoLinks(NodeId),

    /// Link index outside the node's link list.
    #[error("node {node} has no link {link}")]
    NoSuchLink { node: NodeId, link: LinkId },

    /// Excluding self from a destination pick left zero candidates.
    #[error("no eligible destination for {0}: excluding self leaves no candidates")]
    NoEligibleDestination(NodeId),
}

/// Immutable network shape: one outgoing link list per node.
///
/// Built once from the scenario description and never mutated afterward.
/// All routing randomness comes from the caller's simulation-scoped RNG
/// stream, so a fixed seed replays a run exactly.
#[derive(Debug, Clone)]
pub struct Topology {
    links: Vec<Vec<Link>>,
}

impl Topology {
    /// Build a topology from explicit per-node link lists.
    pub fn new(links: Vec<Vec<Link>>) -> Self {
        Self { links }
    }

    /// Two nodes joined by symmetric links with the given delay.
    pub fn pair(delay: Duration) -> Self {
        Self::new(vec![
            vec![Link::to(NodeId(1)).with_delay(delay)],
            vec![Link::to(NodeId(0)).with_delay(delay)],
        ])
    }

    /// Unidirectional cycle: node `i` links to node `(i + 1) % n`.
    pub fn ring(n: u32, delay: Duration) -> Self {
        let links = (0..n)
            .map(|i| vec![Link::to(NodeId((i + 1) % n)).with_delay(delay)])
            .collect();
        Self::new(links)
    }

    /// Every ordered pair of distinct nodes is linked.
    pub fn full_mesh(n: u32, delay: Duration) -> Self {
        let links = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| Link::to(NodeId(j)).with_delay(delay))
                    .collect()
            })
            .collect();
        Self::new(links)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.links.len()
    }

    /// Whether the node index is in range.
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.links.len()
    }

    /// Out-degree of a node.
    pub fn neighbor_count(&self, node: NodeId) -> Result<usize, TopologyError> {
        Ok(self.links(node)?.len())
    }

    /// The node's outgoing link list.
    pub fn links(&self, node: NodeId) -> Result<&[Link], TopologyError> {
        self.links
            .get(node.index())
            .map(Vec::as_slice)
            .ok_or(TopologyError::UnknownNode(node))
    }

    /// Look up one outgoing link.
    pub fn link(&self, node: NodeId, link: LinkId) -> Result<&Link, TopologyError> {
        self.links(node)?
            .get(link.index())
            .ok_or(TopologyError::NoSuchLink { node, link })
    }

    /// Pick a destination uniformly over node indices.
    ///
    /// With `exclude_self`, the pick is uniform over the other nodes,
    /// computed by index arithmetic rather than rejection sampling: the
    /// distribution matches a retrying draw, but a degenerate topology
    /// (one node, excluding self) fails fast instead of spinning.
    pub fn pick_uniform_destination<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        exclude_self: bool,
        rng: &mut R,
    ) -> Result<NodeId, TopologyError> {
        if !self.contains(node) {
            return Err(TopologyError::UnknownNode(node));
        }
        let n = self.links.len() as u32;
        if !exclude_self {
            return Ok(NodeId(rng.gen_range(0..n)));
        }
        if n <= 1 {
            return Err(TopologyError::NoEligibleDestination(node));
        }
        let pick = rng.gen_range(0..n - 1);
        Ok(NodeId(if pick >= node.0 { pick + 1 } else { pick }))
    }

    /// Pick an outgoing link uniformly over the node's full link set,
    /// including the link a message may have just arrived on.
    pub fn pick_uniform_link<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        rng: &mut R,
    ) -> Result<LinkId, TopologyError> {
        let links = self.links(node)?;
        if links.is_empty() {
            return Err(TopologyError::NoLinks(node));
        }
        Ok(LinkId(rng.gen_range(0..links.len() as u32)))
    }
}
