/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Concrete end-to-end scenarios, one `#[test]` per example in the design.

use hamt::HamtMap;

#[test]
fn scenario_insert_a_handful_of_keys() {
    let mut m = HamtMap::new();
    for (k, v) in [("0", 0), ("2", 2), ("4", 4), ("7", 7), ("8", 8)] {
        m.insert_mut(k, v);
    }
    assert_eq!(m.size(), 5);
    assert_eq!(m.get("0"), Some(&0));
    assert_eq!(m.get("c"), None);

    let mut keys: Vec<_> = m.iter().map(|(k, _)| *k).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["0", "2", "4", "7", "8"]);
}

#[test]
fn scenario_build_then_remove_every_key_in_insertion_order() {
    let entries = [("humpty", 1), ("dumpty", 2), ("sat", 3), ("on", 4), ("the", 5), ("wall", 6)];
    let mut m = HamtMap::new();
    for (k, v) in entries {
        m.insert_mut(k, v);
    }
    assert_eq!(m.size(), entries.len());

    let mut expected_size = entries.len();
    for (k, _) in entries {
        let removed = m.remove_mut(k);
        assert!(removed.is_some());
        expected_size -= 1;
        assert_eq!(m.size(), expected_size);
        assert_eq!(m.get(k), None);
    }
    assert!(m.is_empty());
}

#[test]
fn scenario_insert_then_remove_a_single_key() {
    let mut m = HamtMap::new();
    m.insert_mut("the_key", "the_value");
    assert_eq!(m.size(), 1);

    let removed = m.remove_mut("the_key");
    assert_eq!(removed, Some("the_value"));
    assert_eq!(m.size(), 0);
    assert_eq!(m.get("the_key"), None);
}

#[test]
fn scenario_persistent_insert_then_remove_round_trip() {
    let m0 = HamtMap::new();
    let m1 = m0.insert("k1", "v1");
    assert_eq!(m0.size(), 0);
    assert_eq!(m1.size(), 1);
    assert_eq!(m0.get("k1"), None);
    assert_eq!(m1.get("k1"), Some(&"v1"));

    let m2 = m1.remove("k1");
    assert_eq!(m1.get("k1"), Some(&"v1"), "the source of a persistent remove is untouched");
    assert_eq!(m2.get("k1"), None);
    assert_eq!(m2.size(), 0);
}

#[test]
fn scenario_many_distinct_string_keys_all_survive() {
    let mut m = HamtMap::new();
    let count = 200_000;
    for i in 0..count {
        m.insert_mut(format!("key-{i}"), i);
    }
    assert_eq!(m.size(), count as usize);
    for i in 0..count {
        assert_eq!(m.get(format!("key-{i}").as_str()), Some(&i));
    }
    assert_eq!(m.iter().count(), count as usize);
}

#[test]
fn round_trip_insert_then_remove_preserves_size_and_others() {
    let mut m = HamtMap::new();
    m.insert_mut("a", 1);
    m.insert_mut("b", 2);
    let size_before = m.size();

    m.insert_mut("c", 3);
    assert_eq!(m.get("c"), Some(&3));
    m.remove_mut("c");
    assert_eq!(m.size(), size_before);
    assert_eq!(m.get("a"), Some(&1));
    assert_eq!(m.get("b"), Some(&2));
}
