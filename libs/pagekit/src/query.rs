//! Decoded query-parameter model.
//!
//! A parsed query string is a flat multimap: each parameter name carries one
//! value, or a sequence of values when the name repeats on the wire.
//! [`ParamValue`] keeps that distinction as a tagged union and [`QueryMap`]
//! folds decoded pairs into it, preserving wire order inside sequences.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Decoded value of a single query parameter.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// The parameter appeared once.
    One(String),
    /// The parameter repeated; values in wire order.
    Many(Vec<String>),
}

impl ParamValue {
    /// Render the value as one string. A sequence joins with `","`, the
    /// coercion applied whenever a repeated parameter meets a scalar slot.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            ParamValue::One(s) => s.clone(),
            ParamValue::Many(values) => values.join(","),
        }
    }

    /// True for the empty scalar, which counts as not provided.
    #[must_use]
    pub fn is_empty_scalar(&self) -> bool {
        matches!(self, ParamValue::One(s) if s.is_empty())
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::One(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::One(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(values: [&str; N]) -> Self {
        ParamValue::Many(values.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// Decoded query parameters of one request.
///
/// Built from `(name, value)` pairs as they come off the wire; a name seen
/// again folds its values into a [`ParamValue::Many`] sequence.
#[derive(Clone, Debug, Default)]
pub struct QueryMap {
    params: HashMap<String, ParamValue>,
}

impl QueryMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold decoded pairs into a map, in iteration order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.push(name.into(), value.into());
        }
        map
    }

    /// Append one decoded pair. A repeated name extends its entry into a
    /// sequence, keeping earlier values first.
    pub fn push(&mut self, name: String, value: String) {
        match self.params.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(ParamValue::One(value));
            }
            Entry::Occupied(mut slot) => {
                let folded = match slot.get_mut() {
                    ParamValue::One(first) => {
                        ParamValue::Many(vec![std::mem::take(first), value])
                    }
                    ParamValue::Many(values) => {
                        values.push(value);
                        return;
                    }
                };
                slot.insert(folded);
            }
        }
    }

    /// Set a parameter wholesale, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(name.into(), value.into());
    }

    /// Raw lookup, ignoring the presence rule.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Presence-gated lookup: absent names and empty scalars yield `None`.
    /// An empty sequence is still a provided value.
    #[must_use]
    pub fn provided(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name).filter(|value| !value.is_empty_scalar())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_fold_in_wire_order() {
        let map = QueryMap::from_pairs([("populate", "author"), ("populate", "comments")]);
        assert_eq!(
            map.get("populate"),
            Some(&ParamValue::Many(vec![
                "author".to_owned(),
                "comments".to_owned()
            ]))
        );
    }

    #[test]
    fn single_name_stays_scalar() {
        let map = QueryMap::from_pairs([("select", "name email")]);
        assert_eq!(map.get("select"), Some(&ParamValue::One("name email".to_owned())));
    }

    #[test]
    fn empty_scalar_is_not_provided() {
        let map = QueryMap::from_pairs([("sort", "")]);
        assert!(map.contains("sort"));
        assert!(map.provided("sort").is_none());
    }

    #[test]
    fn empty_sequence_is_provided() {
        let mut map = QueryMap::new();
        map.insert("aggregate", ParamValue::Many(vec![]));
        assert!(map.provided("aggregate").is_some());
    }

    #[test]
    fn text_joins_sequences_with_comma() {
        assert_eq!(ParamValue::from(["5", "7"]).text(), "5,7");
        assert_eq!(ParamValue::from("plain").text(), "plain");
    }

    #[test]
    fn insert_replaces_instead_of_folding() {
        let mut map = QueryMap::from_pairs([("page", "1")]);
        map.insert("page", "2");
        assert_eq!(map.get("page"), Some(&ParamValue::One("2".to_owned())));
    }
}
