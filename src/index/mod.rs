//! Property filter scan.
//!
//! A linear pass over nodes keeping those whose properties satisfy a
//! conjunctive filter: every filter key must be present on the node, and its
//! value must equal one of that key's candidates. Values are compared with
//! `Value` equality, so no coercion happens between kinds.
//!
//! An empty filter matches every node. A key with no candidates matches no
//! node.

use std::collections::HashMap;

use crate::model::{Node, Value};

/// Property key → acceptable values for that key.
pub type PropertyFilter = HashMap<String, Vec<Value>>;

/// Build a filter from `(key, candidates)` pairs.
pub fn property_filter<K, V, I, C>(pairs: I) -> PropertyFilter
where
    I: IntoIterator<Item = (K, C)>,
    C: IntoIterator<Item = V>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, vs)| (k.into(), vs.into_iter().map(Into::into).collect()))
        .collect()
}

/// True if `node` satisfies every key of `filter`.
pub fn matches(node: &Node, filter: &PropertyFilter) -> bool {
    filter.iter().all(|(key, candidates)| {
        node.properties
            .get(key)
            .is_some_and(|value| candidates.contains(value))
    })
}

/// Matching nodes, cloned and sorted by id.
pub fn scan<'a>(nodes: impl IntoIterator<Item = &'a Node>, filter: &PropertyFilter) -> Vec<Node> {
    let mut found: Vec<Node> = nodes
        .into_iter()
        .filter(|n| matches(n, filter))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.id.cmp(&b.id));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::props;

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("1", "Person").with_properties(props([("name", "Alice"), ("type", "Person")])),
            Node::new("2", "Person").with_properties(props([("name", "Bob"), ("type", "Person")])),
            Node::new("3", "Place").with_properties(props([("name", "Wonderland"), ("type", "Place")])),
        ]
    }

    fn ids(found: Vec<Node>) -> Vec<String> {
        found.into_iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_single_key() {
        let f = property_filter([("type", ["Person"])]);
        assert_eq!(ids(scan(&nodes(), &f)), vec!["1", "2"]);
    }

    #[test]
    fn test_no_match() {
        let f = property_filter([("type", ["Animal"])]);
        assert!(scan(&nodes(), &f).is_empty());
    }

    #[test]
    fn test_and_across_keys() {
        let f = property_filter([("type", ["Place"]), ("name", ["Wonderland"])]);
        assert_eq!(ids(scan(&nodes(), &f)), vec!["3"]);

        let f = property_filter([("type", ["Person"]), ("name", ["Wonderland"])]);
        assert!(scan(&nodes(), &f).is_empty());
    }

    #[test]
    fn test_or_across_values() {
        let f = property_filter([("name", ["Bob", "Wonderland"])]);
        assert_eq!(ids(scan(&nodes(), &f)), vec!["2", "3"]);
    }

    #[test]
    fn test_missing_key_short_circuits() {
        let f = property_filter([("age", [Value::Null])]);
        assert!(scan(&nodes(), &f).is_empty());
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert_eq!(scan(&nodes(), &PropertyFilter::new()).len(), 3);
    }

    #[test]
    fn test_key_without_candidates_matches_none() {
        let f: PropertyFilter = HashMap::from([("type".to_string(), Vec::new())]);
        assert!(scan(&nodes(), &f).is_empty());
    }

    #[test]
    fn test_no_coercion() {
        let n = Node::new("n", "X").with_property("age", 30);
        let as_string = property_filter([("age", ["30"])]);
        let as_float = property_filter([("age", [30.0])]);
        let as_int = property_filter([("age", [30])]);
        assert!(!matches(&n, &as_string));
        assert!(!matches(&n, &as_float));
        assert!(matches(&n, &as_int));
    }
}
