//! Order-independent collection comparison used when diffing configurations.

use std::collections::HashMap;
use std::hash::Hash;

/// Multiset equality of two optional collections.
///
/// Two absent collections are equal. An absent collection never equals a
/// present one, even an empty one.
pub fn collection_equals<A, B, T>(left: Option<A>, right: Option<B>) -> bool
where
    A: IntoIterator<Item = T>,
    B: IntoIterator<Item = T>,
    T: Eq + Hash,
{
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => counts(l) == counts(r),
        _ => false,
    }
}

/// True when every element of `subset` appears in `superset`.
pub fn collection_subset<A, B, T>(subset: A, superset: B) -> bool
where
    A: IntoIterator<Item = T>,
    B: IntoIterator<Item = T>,
    T: Eq + Hash,
{
    let available = counts(superset);
    subset.into_iter().all(|item| available.contains_key(&item))
}

fn counts<I, T>(items: I) -> HashMap<T, usize>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash,
{
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_order_independent() {
        assert!(collection_equals(Some(vec!["a", "b", "c"]), Some(vec!["c", "a", "b"])));
    }

    #[test]
    fn test_size_mismatch() {
        assert!(!collection_equals(Some(vec!["a", "b"]), Some(vec!["a", "b", "c"])));
        assert!(!collection_equals(Some(vec!["a", "a"]), Some(vec!["a"])));
    }

    #[test]
    fn test_duplicates_count() {
        assert!(!collection_equals(Some(vec!["a", "a", "b"]), Some(vec!["a", "b", "b"])));
    }

    #[test]
    fn test_empty_and_absent() {
        let none: Option<Vec<&str>> = None;
        assert!(collection_equals(none.clone(), none.clone()));
        assert!(collection_equals(Some(Vec::<&str>::new()), Some(Vec::<&str>::new())));
        assert!(!collection_equals(none, Some(vec!["a"])));
    }

    #[test]
    fn test_mixed_collection_types() {
        let set: std::collections::BTreeSet<&str> = ["x", "y"].into_iter().collect();
        assert!(collection_equals(Some(set), Some(vec!["y", "x"])));
    }

    #[test]
    fn test_subset() {
        assert!(collection_subset(vec!["a"], vec!["a", "b"]));
        assert!(!collection_subset(vec!["c"], vec!["a", "b"]));
        assert!(collection_subset(Vec::<&str>::new(), vec!["a"]));
    }

    proptest! {
        #[test]
        fn prop_permutation_is_equal(mut items in proptest::collection::vec(0u8..8, 0..16)) {
            let original = items.clone();
            items.reverse();
            prop_assert!(collection_equals(Some(original), Some(items)));
        }

        #[test]
        fn prop_extra_element_differs(items in proptest::collection::vec(0u8..8, 0..16), extra in 0u8..8) {
            let mut longer = items.clone();
            longer.push(extra);
            prop_assert!(!collection_equals(Some(items), Some(longer)));
        }
    }
}
