use nalgebra_glm as glm;
use rustc_hash::FxHashMap;

use crate::error::{ColorError, Result};

/// Identifier of a node in a Mapper graph; also the index used by
/// node-level targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single node as seen by the coloring pipeline: the samples it
/// clusters and its position in the layout
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: glm::DVec2,
    pub samples: Vec<usize>,
}

/// A Mapper graph produced by an external pipeline.
///
/// `node_ids`, `positions` and `samples` are index aligned; the
/// graph is read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    node_ids: Vec<NodeId>,
    node_index: FxHashMap<NodeId, usize>,
    positions: Vec<glm::DVec2>,
    samples: Vec<Vec<usize>>,
    edges: Vec<(NodeId, NodeId)>,
    sample_names: Option<Vec<String>>,
}

impl Graph {
    pub fn from_nodes<I>(
        nodes: I,
        edges: Vec<(NodeId, NodeId)>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut node_ids = Vec::new();
        let mut node_index = FxHashMap::default();
        let mut positions = Vec::new();
        let mut samples = Vec::new();

        for node in nodes {
            if node_index.insert(node.id, node_ids.len()).is_some() {
                return Err(ColorError::invalid_argument(format!(
                    "node {} appears more than once",
                    node.id
                )));
            }
            node_ids.push(node.id);
            positions.push(node.position);
            samples.push(node.samples);
        }

        for (a, b) in edges.iter() {
            if !node_index.contains_key(a) || !node_index.contains_key(b) {
                return Err(ColorError::invalid_argument(format!(
                    "edge ({}, {}) refers to an unknown node",
                    a, b
                )));
            }
        }

        Ok(Self {
            node_ids,
            node_index,
            positions,
            samples,
            edges,
            sample_names: None,
        })
    }

    /// Attaches sample names, indexed by sample; every sample the
    /// nodes refer to must be named
    pub fn with_sample_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() < self.sample_count() {
            return Err(ColorError::invalid_argument(format!(
                "{} sample names given, but the graph has {} samples",
                names.len(),
                self.sample_count()
            )));
        }

        self.sample_names = Some(names);
        Ok(self)
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn positions(&self) -> &[glm::DVec2] {
        &self.positions
    }

    pub fn node_samples(&self) -> &[Vec<usize>] {
        &self.samples
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn sample_names(&self) -> Option<&[String]> {
        self.sample_names.as_deref()
    }

    pub fn sample_name(&self, sample: usize) -> Option<&str> {
        self.sample_names
            .as_ref()
            .and_then(|names| names.get(sample))
            .map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Number of samples referenced by the graph, i.e. the largest
    /// sample index plus one
    pub fn sample_count(&self) -> usize {
        self.samples
            .iter()
            .flat_map(|s| s.iter())
            .max()
            .map(|&ix| ix + 1)
            .unwrap_or(0)
    }

    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    /// Positions each node at the mean of its samples' projected
    /// coordinates. Nodes without samples end up at the origin.
    pub fn node_centroids(
        &self,
        projected: &[glm::DVec2],
    ) -> Result<Vec<glm::DVec2>> {
        let mut centroids = Vec::with_capacity(self.node_count());

        for (node, samples) in self.node_ids.iter().zip(self.samples.iter()) {
            let mut sum = glm::vec2(0.0, 0.0);

            for &ix in samples {
                let p = projected.get(ix).ok_or_else(|| {
                    ColorError::invalid_argument(format!(
                        "node {} refers to sample {}, but only {} \
                         projected samples were given",
                        node,
                        ix,
                        projected.len()
                    ))
                })?;
                sum += p;
            }

            if samples.is_empty() {
                centroids.push(sum);
            } else {
                centroids.push(sum / samples.len() as f64);
            }
        }

        Ok(centroids)
    }
}
