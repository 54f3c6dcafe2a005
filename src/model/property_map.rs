//! PropertyMap: the key-value store on nodes and edges.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values.
pub type PropertyMap = HashMap<String, Value>;

/// Build a PropertyMap from (key, value) pairs.
///
/// ```
/// use propgraph::{model::props, Value};
///
/// let p = props([("name", Value::from("Alice")), ("age", Value::from(30))]);
/// assert_eq!(p["age"], Value::Int(30));
/// ```
pub fn props<K, V, I>(pairs: I) -> PropertyMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
