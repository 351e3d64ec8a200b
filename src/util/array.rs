//! Collection helpers for post-processing query results
//!
//! All functions are pure and keep input order unless stated otherwise.
//! Records returned by the dispatcher are JSON values, so [`record_field`]
//! is provided as a ready-made key selector.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use rand::Rng;
use serde_json::Value as JsonValue;

use crate::graphql::SortOrder;

/// Field of a JSON record rendered as a grouping/sorting key.
///
/// Strings are returned as-is, other scalars via their JSON text, and a
/// missing field as an empty string.
pub fn record_field(record: &JsonValue, field: &str) -> String {
    match record.get(field) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Group items by key. Groups keep the input order of their items.
pub fn group_by<T, K, F>(items: &[T], key: F) -> BTreeMap<K, Vec<T>>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item.clone());
    }
    groups
}

/// Distinct items, first occurrence wins.
pub fn unique<T>(items: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Distinct items by a derived key, first occurrence wins.
pub fn unique_by<T, K, F>(items: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(key(item)))
        .cloned()
        .collect()
}

/// One key of a multi-key sort.
pub struct SortKey<'a, T> {
    compare: Box<dyn Fn(&T, &T) -> Ordering + 'a>,
    order: SortOrder,
}

impl<'a, T> SortKey<'a, T> {
    pub fn new<K, F>(key: F, order: SortOrder) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + 'a,
    {
        Self {
            compare: Box::new(move |a, b| key(a).cmp(&key(b))),
            order,
        }
    }

    pub fn asc<K: Ord, F: Fn(&T) -> K + 'a>(key: F) -> Self {
        Self::new(key, SortOrder::Asc)
    }

    pub fn desc<K: Ord, F: Fn(&T) -> K + 'a>(key: F) -> Self {
        Self::new(key, SortOrder::Desc)
    }
}

impl<'a> SortKey<'a, JsonValue> {
    /// Sort JSON records by a named field.
    pub fn field(name: &'a str, order: SortOrder) -> Self {
        Self::new(move |record: &JsonValue| record_field(record, name), order)
    }
}

/// Stable sort by several keys; later keys break ties of earlier ones.
pub fn sort_by<T: Clone>(items: &[T], keys: &[SortKey<'_, T>]) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        for key in keys {
            let ordering = match key.order {
                SortOrder::Asc => (key.compare)(a, b),
                SortOrder::Desc => (key.compare)(b, a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    sorted
}

/// Split into chunks of `size`. A zero size yields no chunks.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return Vec::new();
    }
    items.chunks(size).map(|c| c.to_vec()).collect()
}

/// Move the item at `from` to position `to`. Out-of-range indices leave the
/// list unchanged.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut moved = items.to_vec();
    if from >= moved.len() || to >= moved.len() {
        return moved;
    }
    let item = moved.remove(from);
    moved.insert(to, item);
    moved
}

/// Split into (matching, rest).
pub fn partition<T, F>(items: &[T], predicate: F) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    items.iter().cloned().partition(|item| predicate(item))
}

/// Items of `a` followed by items of `b`, without duplicates.
pub fn union<T: Clone + Eq + Hash>(a: &[T], b: &[T]) -> Vec<T> {
    let combined: Vec<T> = a.iter().chain(b.iter()).cloned().collect();
    unique(&combined)
}

/// Items of `a` also present in `b`, in `a`'s order.
pub fn intersection<T: Clone + Eq + Hash>(a: &[T], b: &[T]) -> Vec<T> {
    let other: HashSet<&T> = b.iter().collect();
    let hits: Vec<T> = a.iter().filter(|item| other.contains(item)).cloned().collect();
    unique(&hits)
}

/// Items of `a` not present in `b`, in `a`'s order.
pub fn difference<T: Clone + Eq + Hash>(a: &[T], b: &[T]) -> Vec<T> {
    let other: HashSet<&T> = b.iter().collect();
    a.iter().filter(|item| !other.contains(item)).cloned().collect()
}

/// Fisher–Yates shuffle into a new vector.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::thread_rng())
}

pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

pub fn sum<T, F>(items: &[T], value: F) -> f64
where
    F: Fn(&T) -> f64,
{
    items.iter().map(value).sum()
}

/// Arithmetic mean, `0.0` for an empty list.
pub fn average<T, F>(items: &[T], value: F) -> f64
where
    F: Fn(&T) -> f64,
{
    if items.is_empty() {
        return 0.0;
    }
    sum(items, value) / items.len() as f64
}

/// Item with the smallest projected value; first one wins on ties.
pub fn min_by_key<T, F>(items: &[T], value: F) -> Option<&T>
where
    F: Fn(&T) -> f64,
{
    items.iter().fold(None, |best: Option<(&T, f64)>, item| {
        let v = value(item);
        match best {
            Some((_, current)) if current <= v => best,
            _ => Some((item, v)),
        }
    })
    .map(|(item, _)| item)
}

/// Item with the largest projected value; first one wins on ties.
pub fn max_by_key<T, F>(items: &[T], value: F) -> Option<&T>
where
    F: Fn(&T) -> f64,
{
    items.iter().fold(None, |best: Option<(&T, f64)>, item| {
        let v = value(item);
        match best {
            Some((_, current)) if current >= v => best,
            _ => Some((item, v)),
        }
    })
    .map(|(item, _)| item)
}

pub fn count_by<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn users() -> Vec<JsonValue> {
        vec![
            json!({"name": "ana", "role": "admin", "age": 31}),
            json!({"name": "ben", "role": "user", "age": 25}),
            json!({"name": "cleo", "role": "admin", "age": 42}),
        ]
    }

    #[test]
    fn test_group_by_role() {
        let groups = group_by(&users(), |u| record_field(u, "role"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["admin"].len(), 2);
        assert_eq!(groups["user"].len(), 1);
        assert_eq!(groups["admin"][1]["name"], "cleo");
    }

    #[test]
    fn test_sort_by_multi_key_is_stable() {
        let mut data = users();
        data.push(json!({"name": "bob", "role": "admin", "age": 50}));
        let sorted = sort_by(
            &data,
            &[
                SortKey::field("role", SortOrder::Asc),
                SortKey::field("name", SortOrder::Desc),
            ],
        );
        let names: Vec<String> = sorted.iter().map(|u| record_field(u, "name")).collect();
        assert_eq!(names, vec!["cleo", "bob", "ana", "ben"]);

        let tied = vec![(1, "first"), (0, "x"), (1, "second")];
        let sorted = sort_by(&tied, &[SortKey::asc(|t: &(i32, &str)| t.0)]);
        assert_eq!(sorted, vec![(0, "x"), (1, "first"), (1, "second")]);
    }

    #[test]
    fn test_unique_and_set_algebra() {
        assert_eq!(unique(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(union(&[1, 2], &[2, 3]), vec![1, 2, 3]);
        assert_eq!(intersection(&[1, 2, 3, 2], &[2, 3, 4]), vec![2, 3]);
        assert_eq!(difference(&[1, 2, 3], &[2]), vec![1, 3]);
        let by_role = unique_by(&users(), |u| record_field(u, "role"));
        assert_eq!(by_role.len(), 2);
    }

    #[test]
    fn test_chunk_move_partition() {
        assert_eq!(chunk(&[1, 2, 3, 4, 5], 2), vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert!(chunk(&[1, 2], 0).is_empty());
        assert_eq!(move_item(&['a', 'b', 'c'], 0, 2), vec!['b', 'c', 'a']);
        assert_eq!(move_item(&['a', 'b'], 5, 0), vec!['a', 'b']);
        let (even, odd) = partition(&[1, 2, 3, 4], |n| n % 2 == 0);
        assert_eq!(even, vec![2, 4]);
        assert_eq!(odd, vec![1, 3]);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<i32> = (0..20).collect();
        let mut shuffled = shuffle_with(&items, &mut rng);
        assert_eq!(shuffled.len(), items.len());
        shuffled.sort();
        assert_eq!(shuffled, items);
        assert!(shuffle::<i32>(&[]).is_empty());
    }

    #[test]
    fn test_statistics() {
        let data = users();
        let age = |u: &JsonValue| u["age"].as_f64().unwrap_or(0.0);
        assert_eq!(sum(&data, age), 98.0);
        assert!((average(&data, age) - 32.666).abs() < 0.01);
        assert_eq!(average::<JsonValue, _>(&[], age), 0.0);
        assert_eq!(min_by_key(&data, age).unwrap()["name"], "ben");
        assert_eq!(max_by_key(&data, age).unwrap()["name"], "cleo");
        let counts = count_by(&data, |u| record_field(u, "role"));
        assert_eq!(counts["admin"], 2);
        assert_eq!(counts["user"], 1);
    }
}
