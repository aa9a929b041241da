use crate::tree::model::{Node, NodeId, TreeModel};

/// Queries shorter than this (in characters) return nothing.
pub const MIN_QUERY_CHARS: usize = 2;
/// Maximum number of suggestions returned by a query.
pub const MAX_RESULTS: usize = 10;

/// A single suggestion: the node and its one-line label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: NodeId,
    pub label: String,
}

/// Order-preserving list of every node, built once per load.
///
/// Search covers the full structural tree, not just the visible part, so it
/// can lead to collapsed nodes.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    order: Vec<NodeId>,
}

impl SearchIndex {
    pub fn build(model: &TreeModel) -> Self {
        Self {
            order: model.traverse().map(Node::id).collect(),
        }
    }

    /// Case-insensitive substring match on display labels.
    ///
    /// Results keep document (pre-order) order and stop after
    /// [`MAX_RESULTS`]. Labels are read from the model at query time, so
    /// in-place name edits are found without rebuilding the index.
    pub fn query(&self, model: &TreeModel, text: &str) -> Vec<SearchHit> {
        if text.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        let needle = text.to_lowercase();

        self.order
            .iter()
            .filter_map(|&id| model.lookup(id))
            .filter(|node| node.label().to_lowercase().contains(&needle))
            .take(MAX_RESULTS)
            .map(|node| SearchHit {
                id: node.id(),
                label: node.label().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn family(names: &[&str]) -> TreeModel {
        let children: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        TreeModel::build(&json!({ "name": "Root", "children": children })).unwrap()
    }

    fn labels(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.label.as_str()).collect()
    }

    #[test]
    fn short_queries_return_nothing() {
        let model = family(&["Al", "Bo"]);
        let index = SearchIndex::build(&model);
        assert!(index.query(&model, "").is_empty());
        assert!(index.query(&model, "a").is_empty());
        assert!(index.query(&model, "é").is_empty());
        assert_eq!(index.query(&model, "al").len(), 1);
    }

    #[test]
    fn single_match() {
        let model = family(&["Anna Berg", "Erik Dahl", "Olof Ek"]);
        let index = SearchIndex::build(&model);
        let hits = index.query(&model, "dahl");
        assert_eq!(labels(&hits), vec!["Erik Dahl"]);
    }

    #[test]
    fn matches_are_case_insensitive_and_single_line() {
        let model = family(&[
            "John Smith\nBorn 1820 in Kalmar.",
            "Karin Lund",
            "Joan Park\nEmigrated 1890.",
            "Per Holm",
            "Lars Ek",
            "Nils Ahl",
            "Sven Berg",
            "Eva Dahl",
            "Ulla Sand",
            "Gustaf Ring",
            "Ingrid Vik",
        ]);
        let index = SearchIndex::build(&model);
        let hits = index.query(&model, "JO");
        assert_eq!(labels(&hits), vec!["John Smith", "Joan Park"]);
    }

    #[test]
    fn biography_text_is_not_searched() {
        let model = family(&["Anna Berg\nMarried Johan Ek."]);
        let index = SearchIndex::build(&model);
        assert!(index.query(&model, "johan").is_empty());
    }

    #[test]
    fn results_capped_in_traversal_order() {
        let names: Vec<String> = (0..15).map(|i| format!("Jonsson {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let model = family(&refs);
        let index = SearchIndex::build(&model);
        let hits = index.query(&model, "jo");
        assert_eq!(hits.len(), MAX_RESULTS);
        assert_eq!(hits[0].label, "Jonsson 0");
        assert_eq!(hits[9].label, "Jonsson 9");
    }

    #[test]
    fn nested_matches_follow_preorder() {
        let model = TreeModel::build(&json!({
            "name": "Joakim",
            "children": [
                { "name": "Anna", "children": [ { "name": "Johanna" } ] },
                { "name": "Jon" }
            ]
        }))
        .unwrap();
        let index = SearchIndex::build(&model);
        assert_eq!(
            labels(&index.query(&model, "jo")),
            vec!["Joakim", "Johanna", "Jon"]
        );
    }

    #[test]
    fn edited_labels_are_searchable() {
        let mut model = family(&["Anna"]);
        let index = SearchIndex::build(&model);
        let anna = model.find_by_label("Anna").unwrap();
        model.lookup_mut(anna).unwrap().set_name("Annika", "");
        assert_eq!(labels(&index.query(&model, "nik")), vec!["Annika"]);
    }
}
