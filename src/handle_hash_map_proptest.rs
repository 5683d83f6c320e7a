#![cfg(test)]

// HandleHashMap against std's HashMap as a reference model.

use crate::handle_hash_map::{Handle, HandleHashMap};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hasher};

// Keys are drawn from a small per-case vocabulary by index, so shrinking
// moves toward fewer and earlier words.
#[derive(Clone, Debug)]
enum Step {
    Insert(usize, i64),
    RemoveKey(usize),
    RemoveByHandle(usize),
    Lookup(usize),
    LookupStr(String),
    Bump(usize, i64),
    Walk,
    Wipe,
}

fn scenario() -> impl Strategy<Value = (Vec<String>, Vec<Step>)> {
    proptest::collection::vec("[a-d]{0,3}", 1..=6).prop_flat_map(|words| {
        let at = 0..words.len();
        let step = prop_oneof![
            5 => (at.clone(), any::<i64>()).prop_map(|(i, v)| Step::Insert(i, v)),
            2 => at.clone().prop_map(Step::RemoveKey),
            2 => at.clone().prop_map(Step::RemoveByHandle),
            2 => at.clone().prop_map(Step::Lookup),
            1 => "[a-d]{0,3}".prop_map(Step::LookupStr),
            2 => (at, -8i64..8).prop_map(|(i, d)| Step::Bump(i, d)),
            1 => Just(Step::Walk),
            1 => Just(Step::Wipe),
        ];
        (Just(words), proptest::collection::vec(step, 1..80))
    })
}

// After every step:
// - len and the set of (key, value) pairs equal the model's;
// - each live key's handle is the one recorded when it was first inserted;
// - every handle whose mapping was removed resolves to nothing.
fn check_against_model<S>(
    mut map: HandleHashMap<String, i64, S>,
    words: Vec<String>,
    steps: Vec<Step>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone + Default,
{
    let mut model: HashMap<String, i64> = HashMap::new();
    let mut handles: HashMap<String, Handle> = HashMap::new();
    let mut dead: Vec<Handle> = Vec::new();

    for step in steps {
        match step {
            Step::Insert(i, v) => {
                let w = &words[i];
                prop_assert_eq!(map.insert(w.clone(), v), model.insert(w.clone(), v));
                let Some(h) = map.find(w.as_str()) else {
                    return Err(TestCaseError::fail("inserted key not found"));
                };
                let recorded = *handles.entry(w.clone()).or_insert(h);
                prop_assert_eq!(recorded, h, "overwrite must keep the handle");
            }
            Step::RemoveKey(i) => {
                let w = &words[i];
                let expected = model.remove(w).map(|v| (w.clone(), v));
                prop_assert_eq!(map.remove(w.as_str()), expected);
                dead.extend(handles.remove(w));
            }
            Step::RemoveByHandle(i) => {
                let w = &words[i];
                match handles.remove(w) {
                    Some(h) => {
                        let expected = model.remove(w).map(|v| (w.clone(), v));
                        prop_assert_eq!(map.remove_handle(h), expected);
                        dead.push(h);
                    }
                    None => {
                        prop_assert!(!map.contains_key(w.as_str()));
                    }
                }
            }
            Step::Lookup(i) => {
                let w = &words[i];
                let h = map.find(w.as_str());
                prop_assert_eq!(h, handles.get(w).copied());
                prop_assert_eq!(map.get(w.as_str()), model.get(w));
                if let Some(h) = h {
                    prop_assert_eq!(map.key_of(h), Some(w));
                }
            }
            Step::LookupStr(s) => {
                prop_assert_eq!(map.contains_key(s.as_str()), model.contains_key(&s));
            }
            Step::Bump(i, d) => {
                if let Some(&h) = handles.get(&words[i]) {
                    let slot = map.value_of_mut(h);
                    prop_assert!(slot.is_some(), "live handle must resolve");
                    if let Some(v) = slot {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&words[i]) {
                        *v = v.wrapping_add(d);
                    }
                }
            }
            Step::Walk => {
                let walked: BTreeMap<&String, &i64> = map.iter().map(|(_, k, v)| (k, v)).collect();
                prop_assert_eq!(walked.len(), map.len());
                prop_assert_eq!(map.handles().count(), map.len());
            }
            Step::Wipe => {
                map.clear();
                model.clear();
                dead.extend(handles.drain().map(|(_, h)| h));
            }
        }

        prop_assert_eq!(map.len(), model.len());
        let seen: BTreeMap<String, i64> = map.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
        let want: BTreeMap<String, i64> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(seen, want);
        for h in &dead {
            prop_assert!(map.entry_of(*h).is_none());
        }
    }
    Ok(())
}

#[derive(Clone, Default)]
struct OneBucket;
struct OneBucketHasher;
impl BuildHasher for OneBucket {
    type Hasher = OneBucketHasher;
    fn build_hasher(&self) -> OneBucketHasher {
        OneBucketHasher
    }
}
impl Hasher for OneBucketHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        7
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_matches_std_hash_map((words, steps) in scenario()) {
        check_against_model(HandleHashMap::new(), words, steps)?;
    }

    #[test]
    fn prop_matches_std_hash_map_when_all_keys_collide((words, steps) in scenario()) {
        check_against_model(HandleHashMap::with_hasher(OneBucket), words, steps)?;
    }
}
