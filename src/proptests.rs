use super::*;

use crate::trie::{Bucket, Slot, TABLE_SIZE};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashMap};

fn validate_trie<V>(t: &TrieHashTable<V>) {
    fn walk<V>(bucket: &Bucket<V>, level: usize, is_root: bool, leaves: &mut usize) {
        let live = bucket.slots.iter().filter(|s| !s.is_empty()).count();
        assert_eq!(live, bucket.live, "live count out of sync at level {level}");
        if !is_root {
            let lone_leaf =
                live == 1 && bucket.slots.iter().any(|s| matches!(s, Slot::Leaf { .. }));
            assert!(live > 0, "empty bucket left at level {level}");
            assert!(!lone_leaf, "uncollapsed single-key bucket at level {level}");
        }
        for (idx, slot) in bucket.slots.iter().enumerate() {
            match slot {
                Slot::Empty => {}
                Slot::Leaf { key, .. } => {
                    assert_eq!(trie::hash(key, level), idx, "{key:?} stored off its path");
                    *leaves += 1;
                }
                Slot::Child(child) => {
                    assert_ne!(idx, TABLE_SIZE - 1, "child bucket under the terminal slot");
                    walk(child, level + 1, false, leaves);
                }
            }
        }
    }

    let mut leaves = 0;
    walk(&t.root, 0, true, &mut leaves);
    assert_eq!(leaves, t.len(), "reachable leaf count must match len");
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Insert(#[proptest(strategy = "key_strategy()")] String, u64),
    Remove(#[proptest(strategy = "key_strategy()")] String),
    Get(#[proptest(strategy = "key_strategy()")] String),
}

fn key_strategy() -> impl Strategy<Value = String> {
    // Lowercase letters never share a slot, so every pair of keys is separable.
    "[a-f]{0,6}"
}

#[derive(Clone, Debug, Arbitrary)]
enum PairOp {
    Insert(
        #[proptest(strategy = "key_strategy()")] String,
        #[proptest(strategy = "key_strategy()")] String,
        u64,
    ),
    Remove(
        #[proptest(strategy = "key_strategy()")] String,
        #[proptest(strategy = "key_strategy()")] String,
    ),
    Get(
        #[proptest(strategy = "key_strategy()")] String,
        #[proptest(strategy = "key_strategy()")] String,
    ),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_trie_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut t: TrieHashTable<u64> = TrieHashTable::new();
        let mut m: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.set(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, Ok(old_m));
                }
                Op::Remove(key) => {
                    let old_t = t.delete(&key).ok();
                    let old_m = m.remove(&key);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).ok(), m.get(&key));
                    prop_assert_eq!(t.contains(&key), m.contains_key(&key));
                }
            }
        }

        prop_assert_eq!(t.len(), m.len());
        validate_trie(&t);
        let mut got: Vec<(String, u64)> = t.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        got.sort();
        let expected: Vec<(String, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_trie_shared_prefix_paths(
        prefix in "[a-z]{0,8}",
        a in "[a-m][a-z]{0,4}",
        b in "[n-z][a-z]{0,4}",
    ) {
        let ka = format!("{prefix}{a}");
        let kb = format!("{prefix}{b}");
        let mut t: TrieHashTable<u8> = TrieHashTable::new();
        t.set(&ka, 1).unwrap();
        t.set(&kb, 2).unwrap();

        let pa = t.get_location(&ka).unwrap();
        let pb = t.get_location(&kb).unwrap();
        let p = prefix.chars().count();
        prop_assert_eq!(&pa[..p], &pb[..p]);
        prop_assert_ne!(pa[p], pb[p]);
    }

    #[test]
    fn prop_trie_delete_all_restores_root(
        keys in prop::collection::btree_set(key_strategy(), 0..200),
    ) {
        let mut t: TrieHashTable<usize> = TrieHashTable::new();
        for (i, k) in keys.iter().enumerate() {
            t.set(k, i).unwrap();
        }
        validate_trie(&t);
        for k in &keys {
            t.delete(k).unwrap();
            validate_trie(&t);
        }
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.bucket_count(), 1);
    }

    #[test]
    fn prop_double_key_equivalence(ops in prop::collection::vec(any::<PairOp>(), 0..=1000)) {
        let mut t: DoubleKeyTable<String, String, u64> = DoubleKeyTable::with_sizes(
            Some(vec![3, 5, 13, 29, 53, 97, 193, 389, 769, 1543]),
            Some(vec![2, 5, 13, 29, 53, 97]),
        )
        .unwrap();
        let mut m: HashMap<(String, String), u64> = HashMap::new();

        for op in ops {
            match op {
                PairOp::Insert(k1, k2, value) => {
                    let old_t = t.set(k1.clone(), k2.clone(), value);
                    let old_m = m.insert((k1, k2), value);
                    prop_assert_eq!(old_t, Ok(old_m));
                }
                PairOp::Remove(k1, k2) => {
                    let old_t = t.delete(&k1, &k2).ok();
                    let old_m = m.remove(&(k1, k2));
                    prop_assert_eq!(old_t, old_m);
                }
                PairOp::Get(k1, k2) => {
                    let pair = (k1.clone(), k2.clone());
                    prop_assert_eq!(t.contains(&k1, &k2), m.contains_key(&pair));
                    prop_assert_eq!(t.get(&k1, &k2).ok(), m.get(&(k1, k2)));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        let mut got: Vec<(String, String, u64)> =
            t.iter().map(|(a, b, v)| (a.clone(), b.clone(), *v)).collect();
        got.sort();
        let mut expected: Vec<(String, String, u64)> =
            m.into_iter().map(|((a, b), v)| (a, b, v)).collect();
        expected.sort();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(
        items: &[T],
        used: &mut [bool],
        out: &mut Vec<T>,
        f: &mut impl FnMut(Vec<T>),
    ) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [&str; 6] = ["a", "b", "ab", "ac", "abc", ""];

#[test]
fn exhaustive_trie_insert_order_small_set() {
    for_each_permutation(&SMALL_SET, |perm| {
        let mut t: TrieHashTable<usize> = TrieHashTable::new();
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.set(k, i), Ok(None));
        }
        validate_trie(&t);
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.get(k), Ok(&i));
        }
        // Layout depends only on the key set, not on insertion order.
        assert_eq!(t.get_location("abc"), Ok(vec![19, 20, 21]));
        assert_eq!(t.get_location("a"), Ok(vec![19, TABLE_SIZE - 1]));
    });
}

#[test]
fn exhaustive_trie_remove_order_small_set() {
    let mut base: TrieHashTable<usize> = TrieHashTable::new();
    for (i, k) in SMALL_SET.iter().enumerate() {
        base.set(k, i).unwrap();
    }

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        let mut remaining = SMALL_SET.len();
        for k in perm {
            assert!(t.delete(k).is_ok());
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_trie(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.bucket_count(), 1);
    });
}

#[test]
fn exhaustive_double_key_remove_order() {
    let pairs: Vec<(&str, &str)> = vec![
        ("cat", "a"),
        ("cat", "b"),
        ("dog", "a"),
        ("eel", "x"),
        ("eel", "y"),
        ("fox", "a"),
    ];
    let mut base: DoubleKeyTable<&str, &str, usize> =
        DoubleKeyTable::with_sizes(Some(vec![3, 7, 13]), Some(vec![2, 3])).unwrap();
    for (i, (k1, k2)) in pairs.iter().enumerate() {
        base.set(*k1, *k2, i).unwrap();
    }

    for_each_permutation(&pairs, |perm| {
        let mut t = base.clone();
        for (n, (k1, k2)) in perm.iter().enumerate() {
            assert!(t.delete(k1, k2).is_ok());
            assert_eq!(t.len(), pairs.len() - n - 1);
            for (j, (a, b)) in perm.iter().enumerate().skip(n + 1) {
                let original = pairs.iter().position(|p| p == &(*a, *b)).unwrap();
                assert_eq!(t.get(a, b), Ok(&original), "lost {a}/{b} after {j} deletes");
            }
        }
        assert!(t.is_empty());
        assert_eq!(t.keys().count(), 0);
    });
}
