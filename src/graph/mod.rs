//! Per-record entity graph model
//!
//! Each record becomes an isolated star: one center node for the paper and one
//! node per distinct normalized entity, each linked back to the center. Entity
//! node ids are scoped to their record, so identical entities in two records
//! never share a node. Layout and physics belong to the rendering layer.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{AbstractRecord, EntityCategory};
use crate::normalize::Normalizer;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Paper,
    Technology,
    Domain,
    Methodology,
}

impl From<EntityCategory> for NodeType {
    fn from(category: EntityCategory) -> Self {
        match category {
            EntityCategory::Technology => Self::Technology,
            EntityCategory::Domain => Self::Domain,
            EntityCategory::Methodology => Self::Methodology,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// Link from a record's center node to one of its entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    /// Nodes other than paper centers
    pub fn entity_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.node_type != NodeType::Paper)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Separates a record id from the entity suffix in entity node ids
///
/// Record ids containing it are rejected before graph construction.
pub const NODE_ID_SEPARATOR: char = '#';

/// Id of the `index`-th entity node of a record
pub fn entity_node_id(record_id: &str, index: usize) -> String {
    format!("{record_id}{NODE_ID_SEPARATOR}e{index}")
}

/// Builds graph models from records
#[derive(Debug, Clone, Default)]
pub struct GraphModelBuilder {
    normalizer: Normalizer,
}

impl GraphModelBuilder {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Subgraph of a single record
    ///
    /// Entities are normalized without false-positive filtering and
    /// deduplicated case-insensitively in first-seen order; the first
    /// occurrence decides the node type.
    pub fn build(&self, record: &AbstractRecord) -> GraphModel {
        let label = if record.title.trim().is_empty() {
            record.id.clone()
        } else {
            record.title.trim().to_string()
        };

        let mut graph = GraphModel {
            nodes: vec![GraphNode {
                id: record.id.clone(),
                label,
                node_type: NodeType::Paper,
            }],
            edges: Vec::new(),
        };

        let mut seen: HashSet<String> = HashSet::new();
        for (category, raw) in record.entities.iter() {
            let Some(entity) = self.normalizer.normalize(raw, false) else {
                continue;
            };
            if !seen.insert(entity.to_lowercase()) {
                continue;
            }

            let id = entity_node_id(&record.id, seen.len() - 1);
            graph.edges.push(GraphEdge {
                source: record.id.clone(),
                target: id.clone(),
            });
            graph.nodes.push(GraphNode {
                id,
                label: entity,
                node_type: category.into(),
            });
        }

        graph
    }

    /// Disjoint union of per-record subgraphs
    ///
    /// Fails with [`Error::NodeIdCollision`] if two records share an id or a
    /// record id collides with another record's entity node id.
    pub fn build_batch(&self, records: &[AbstractRecord]) -> Result<GraphModel> {
        let mut batch = GraphModel::default();
        let mut ids: HashSet<String> = HashSet::new();

        for record in records {
            let graph = self.build(record);
            for node in &graph.nodes {
                if !ids.insert(node.id.clone()) {
                    return Err(Error::NodeIdCollision(node.id.clone()));
                }
            }
            batch.nodes.extend(graph.nodes);
            batch.edges.extend(graph.edges);
        }

        tracing::debug!(
            records = records.len(),
            nodes = batch.nodes.len(),
            edges = batch.edges.len(),
            "Built graph model"
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_variants_collapse_to_one_node() {
        let record = AbstractRecord::approved("p1", Some(2024)).with_technologies(["AI", "ai", "A.I."]);
        let graph = GraphModelBuilder::default().build(&record);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let entities: Vec<_> = graph.entity_nodes().collect();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].label, "AI");
        assert_eq!(entities[0].node_type, NodeType::Technology);
    }

    #[test]
    fn test_center_node() {
        let record = AbstractRecord::approved("p1", Some(2024)).with_title("  Graph Methods ");
        let graph = GraphModelBuilder::default().build(&record);
        let center = graph.node("p1").unwrap();
        assert_eq!(center.label, "Graph Methods");
        assert_eq!(center.node_type, NodeType::Paper);

        let untitled = GraphModelBuilder::default().build(&AbstractRecord::approved("p2", None));
        assert_eq!(untitled.nodes[0].label, "p2");
        assert!(untitled.edges.is_empty());
    }

    #[test]
    fn test_first_occurrence_decides_type_and_order() {
        let record = AbstractRecord::approved("p1", Some(2024))
            .with_technologies(["Rust"])
            .with_domains(["Systems", "rust"])
            .with_methodologies(["Benchmark"]);
        let graph = GraphModelBuilder::default().build(&record);

        let labels: Vec<_> = graph.entity_nodes().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["rust", "systems", "benchmark"]);
        assert_eq!(graph.nodes[1].node_type, NodeType::Technology);
        assert_eq!(graph.nodes[2].node_type, NodeType::Domain);
        assert_eq!(graph.nodes[3].id, "p1#e2");
    }

    #[test]
    fn test_no_false_positive_filtering() {
        let record = AbstractRecord::approved("p1", Some(2024)).with_technologies(["N/A"]);
        let graph = GraphModelBuilder::default().build(&record);
        assert_eq!(graph.entity_nodes().count(), 1);
    }

    #[test]
    fn test_edges_link_center_to_entities() {
        let record = AbstractRecord::approved("p1", Some(2024)).with_technologies(["Rust", "Go"]);
        let graph = GraphModelBuilder::default().build(&record);
        for edge in &graph.edges {
            assert_eq!(edge.source, "p1");
            assert!(graph.node(&edge.target).is_some());
        }
    }

    #[test]
    fn test_batch_keeps_records_disjoint() {
        let records = vec![
            AbstractRecord::approved("p1", Some(2024)).with_technologies(["Python"]),
            AbstractRecord::approved("p2", Some(2024)).with_technologies(["Python"]),
        ];
        let graph = GraphModelBuilder::default().build_batch(&records).unwrap();

        let python: Vec<_> = graph.entity_nodes().filter(|n| n.label == "python").collect();
        assert_eq!(python.len(), 2);
        assert_ne!(python[0].id, python[1].id);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_batch_rejects_duplicate_record_ids() {
        let records = vec![
            AbstractRecord::approved("p1", Some(2024)),
            AbstractRecord::approved("p1", Some(2023)),
        ];
        let result = GraphModelBuilder::default().build_batch(&records);
        assert!(matches!(result, Err(Error::NodeIdCollision(id)) if id == "p1"));
    }

    #[test]
    fn test_batch_rejects_record_id_shadowing_entity_node() {
        let records = vec![
            AbstractRecord::approved("p1", Some(2024)).with_technologies(["Rust"]),
            AbstractRecord::approved("p1#e0", Some(2024)),
        ];
        let result = GraphModelBuilder::default().build_batch(&records);
        assert!(matches!(result, Err(Error::NodeIdCollision(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let record = AbstractRecord::approved("p1", Some(2024)).with_technologies(["Rust"]);
        let json = serde_json::to_value(GraphModelBuilder::default().build(&record)).unwrap();
        assert_eq!(json["nodes"][1]["type"], "technology");
        assert_eq!(json["edges"][0]["source"], "p1");
        assert_eq!(json["edges"][0]["target"], "p1#e0");
    }
}
