//! Parameter flattening
//!
//! Turns a nested [`Param`] tree into a single-level map whose keys join the
//! path segments with [`KEY_DELIMITER`]. Sequences contribute their index,
//! mappings their key.

use super::{Param, Scalar};
use std::collections::HashMap;

/// Joins nested key segments
pub const KEY_DELIMITER: &str = "__";

/// Bookkeeping keys skipped when they hold a scalar.
///
/// A nested value under one of these keys is still flattened.
pub const IGNORED_KEYS: [&str; 3] = ["fitted", "distribution", "type"];

/// Flattened parameters in visit order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatParams {
    entries: Vec<(String, Scalar)>,
    positions: HashMap<String, usize>,
}

impl FlatParams {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries were produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, key: String, value: Scalar) {
        if let Some(&index) = self.positions.get(&key) {
            self.entries[index].1 = value;
        } else {
            self.positions.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    /// Look up a value by its compound key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.positions.get(key).map(|&index| &self.entries[index].1)
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Flatten a parameter tree
///
/// Output order follows the tree: sequence items by index, mapping entries by
/// key. Identical input therefore always yields identical output.
#[must_use]
pub fn flatten(params: &Param) -> FlatParams {
    let mut flat = FlatParams::new();
    visit(params, "", &mut flat);
    flat
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{KEY_DELIMITER}{segment}")
    }
}

fn visit(param: &Param, prefix: &str, out: &mut FlatParams) {
    match param {
        Param::Scalar(value) => out.insert(prefix.to_string(), value.clone()),
        Param::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                visit(item, &join(prefix, &index.to_string()), out);
            }
        }
        Param::Mapping(entries) => {
            for (key, value) in entries {
                if IGNORED_KEYS.contains(&key.as_str()) && matches!(value, Param::Scalar(_)) {
                    continue;
                }
                visit(value, &join(prefix, key), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_mapping_and_sequence() {
        let params = Param::mapping([
            (
                "covariance",
                Param::sequence([
                    Param::sequence([Param::number(1.0)]),
                    Param::sequence([Param::number(0.5), Param::number(1.0)]),
                ]),
            ),
            (
                "distribs",
                Param::mapping([(
                    "amount",
                    Param::mapping([
                        ("mean", Param::number(10.0)),
                        ("std", Param::null()),
                        ("type", Param::text("gaussian")),
                        ("fitted", Param::flag(true)),
                    ]),
                )]),
            ),
            ("distribution", Param::text("gaussian")),
        ]);

        let flat = flatten(&params);
        let keys: Vec<&str> = flat.keys().collect();
        assert_eq!(
            keys,
            vec![
                "covariance__0__0",
                "covariance__1__0",
                "covariance__1__1",
                "distribs__amount__mean",
                "distribs__amount__std",
            ]
        );
        assert_eq!(flat.get("covariance__1__0"), Some(&Scalar::Number(0.5)));
        assert_eq!(flat.get("distribs__amount__std"), Some(&Scalar::Null));
    }

    #[test]
    fn test_ignored_keys_recurse_when_nested() {
        let params = Param::mapping([
            ("type", Param::mapping([("mean", Param::number(1.0))])),
            ("fitted", Param::sequence([Param::number(2.0)])),
            ("distribution", Param::number(3.0)),
        ]);

        let flat = flatten(&params);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat.get("type__mean"), Some(&Scalar::Number(1.0)));
        assert_eq!(flat.get("fitted__0"), Some(&Scalar::Number(2.0)));
        assert!(flat.get("distribution").is_none());
    }

    #[test]
    fn test_ignored_keys_skipped_inside_sequences() {
        let params = Param::sequence([Param::mapping([
            ("type", Param::text("x")),
            ("scale", Param::number(4.0)),
        ])]);

        let flat = flatten(&params);
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["0__scale"]);
    }

    #[test]
    fn test_empty_containers_produce_nothing() {
        assert!(flatten(&Param::mapping::<String>([])).is_empty());
        assert!(flatten(&Param::sequence([])).is_empty());
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut flat = FlatParams::new();
        flat.insert("a".into(), Scalar::Number(1.0));
        flat.insert("b".into(), Scalar::Number(2.0));
        flat.insert("a".into(), Scalar::Number(3.0));

        let entries: Vec<_> = flat.iter().collect();
        assert_eq!(entries, vec![("a", &Scalar::Number(3.0)), ("b", &Scalar::Number(2.0))]);
    }
}
