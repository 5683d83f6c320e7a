use live_map::{HandleHashMap, LinearMap, LiveMap, Map, OptionAbsence, RawMap};
use proptest::prelude::*;
use std::collections::BTreeMap;

// Each derived operation is checked against its definition over a plain
// model map, for every storage strategy.
#[derive(Clone, Debug)]
enum Op {
    Put(u8, i32),
    Remove(u8),
    PutIfAbsent(u8, i32),
    ComputeIfAbsent(u8, Option<i32>),
    ComputeIfPresent(u8, Option<i32>),
    Compute(u8, Option<i32>),
    Merge(u8, i32, bool),
    RemoveIfEq(u8, i32),
    ReplaceIfEq(u8, i32, i32),
    Replace(u8, i32),
    ReplaceAll(i32),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let k = 0u8..8;
    let v = -4i32..4;
    prop_oneof![
        4 => (k.clone(), v.clone()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => k.clone().prop_map(Op::Remove),
        2 => (k.clone(), v.clone()).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
        2 => (k.clone(), proptest::option::of(v.clone())).prop_map(|(k, v)| Op::ComputeIfAbsent(k, v)),
        2 => (k.clone(), proptest::option::of(v.clone())).prop_map(|(k, d)| Op::ComputeIfPresent(k, d)),
        2 => (k.clone(), proptest::option::of(v.clone())).prop_map(|(k, d)| Op::Compute(k, d)),
        2 => (k.clone(), v.clone(), any::<bool>()).prop_map(|(k, v, discard)| Op::Merge(k, v, discard)),
        2 => (k.clone(), v.clone()).prop_map(|(k, v)| Op::RemoveIfEq(k, v)),
        2 => (k.clone(), v.clone(), v.clone()).prop_map(|(k, o, n)| Op::ReplaceIfEq(k, o, n)),
        1 => (k.clone(), v.clone()).prop_map(|(k, v)| Op::Replace(k, v)),
        1 => v.prop_map(Op::ReplaceAll),
        1 => Just(Op::Clear),
    ]
}

fn snapshot<M>(m: &LiveMap<M>) -> BTreeMap<u8, i32>
where
    M: RawMap<Key = u8, Value = i32>,
{
    let mut out = BTreeMap::new();
    m.for_each(|k, v| {
        out.insert(*k, *v);
    })
    .unwrap();
    out
}

fn run_laws<M>(ops: Vec<Op>) -> Result<(), TestCaseError>
where
    M: RawMap<Key = u8, Value = i32> + Default,
{
    let sut: LiveMap<M> = LiveMap::new();
    let mut model: BTreeMap<u8, i32> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Put(k, v) => {
                prop_assert_eq!(sut.put(k, v).unwrap(), model.insert(k, v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k).unwrap(), model.remove(&k));
            }
            Op::PutIfAbsent(k, v) => {
                let expected = match model.get(&k) {
                    Some(&cur) => Some(cur),
                    None => model.insert(k, v),
                };
                prop_assert_eq!(sut.put_if_absent(k, v).unwrap(), expected);
                prop_assert!(sut.contains_key(&k));
            }
            Op::ComputeIfAbsent(k, out) => {
                let expected = match model.get(&k) {
                    Some(&cur) => Some(cur),
                    None => {
                        if let Some(v) = out {
                            model.insert(k, v);
                        }
                        out
                    }
                };
                prop_assert_eq!(sut.compute_if_absent(k, |_| out).unwrap(), expected);
            }
            Op::ComputeIfPresent(k, d) => {
                let f = |v: i32| d.map(|d| v.wrapping_add(d));
                let expected = match model.get(&k).copied() {
                    None => None,
                    Some(cur) => match f(cur) {
                        Some(nv) => {
                            model.insert(k, nv);
                            Some(nv)
                        }
                        None => {
                            model.remove(&k);
                            None
                        }
                    },
                };
                prop_assert_eq!(sut.compute_if_present(k, |_, v| f(v)).unwrap(), expected);
            }
            Op::Compute(k, d) => {
                let f = |v: Option<i32>| d.map(|d| v.unwrap_or(0).wrapping_add(d));
                let expected = match f(model.get(&k).copied()) {
                    Some(nv) => {
                        model.insert(k, nv);
                        Some(nv)
                    }
                    None => {
                        model.remove(&k);
                        None
                    }
                };
                prop_assert_eq!(sut.compute(k, |_, v| f(v)).unwrap(), expected);
            }
            Op::Merge(k, v, discard) => {
                let f = |a: i32, b: i32| (!discard).then(|| a.wrapping_add(b));
                let merged = match model.get(&k).copied() {
                    None => Some(v),
                    Some(cur) => f(cur, v),
                };
                match merged {
                    Some(nv) => {
                        model.insert(k, nv);
                    }
                    None => {
                        model.remove(&k);
                    }
                }
                prop_assert_eq!(sut.merge(k, v, f).unwrap(), merged);
            }
            Op::RemoveIfEq(k, v) => {
                let hit = model.get(&k) == Some(&v);
                if hit {
                    model.remove(&k);
                }
                prop_assert_eq!(sut.remove_if_eq(&k, &v).unwrap(), hit);
            }
            Op::ReplaceIfEq(k, old, new) => {
                let hit = model.get(&k) == Some(&old);
                if hit {
                    model.insert(k, new);
                }
                prop_assert_eq!(sut.replace_if_eq(k, &old, new).unwrap(), hit);
            }
            Op::Replace(k, v) => {
                let expected = match model.get_mut(&k) {
                    Some(cur) => Some(std::mem::replace(cur, v)),
                    None => None,
                };
                prop_assert_eq!(sut.replace(k, v).unwrap(), expected);
            }
            Op::ReplaceAll(d) => {
                for v in model.values_mut() {
                    *v = v.wrapping_add(d);
                }
                sut.replace_all(|_, v| v.wrapping_add(d)).unwrap();
            }
            Op::Clear => {
                model.clear();
                sut.clear().unwrap();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(snapshot(&sut), model.clone());
        for (k, v) in &model {
            prop_assert!(sut.contains_value(v));
            prop_assert_eq!(sut.get(k), Some(*v));
        }
    }
    Ok(())
}

// Storage where a stored `None` is the absence marker. The model keeps the
// marker as a stored `None`; presence checks in the derived operations look
// only at `Some` values.
type Nullable = LiveMap<LinearMap<u8, Option<i32>, OptionAbsence>>;

#[derive(Clone, Debug)]
enum NullOp {
    Put(u8, Option<i32>),
    Remove(u8),
    GetOrDefault(u8, Option<i32>),
    PutIfAbsent(u8, Option<i32>),
    ComputeIfAbsent(u8, Option<Option<i32>>),
    ComputeIfPresent(u8, Option<Option<i32>>),
    Compute(u8, Option<Option<i32>>),
    Merge(u8, i32, bool),
    MergeMarker(u8),
    RemoveIfEq(u8, Option<i32>),
    ReplaceIfEq(u8, Option<i32>, Option<i32>),
    Replace(u8, Option<i32>),
    Clear,
}

fn arb_null_op() -> impl Strategy<Value = NullOp> {
    let k = 0u8..6;
    let v = proptest::option::of(-4i32..4);
    let d = proptest::option::of(proptest::option::of(-4i32..4));
    prop_oneof![
        4 => (k.clone(), v.clone()).prop_map(|(k, v)| NullOp::Put(k, v)),
        1 => k.clone().prop_map(NullOp::Remove),
        1 => (k.clone(), v.clone()).prop_map(|(k, v)| NullOp::GetOrDefault(k, v)),
        2 => (k.clone(), v.clone()).prop_map(|(k, v)| NullOp::PutIfAbsent(k, v)),
        2 => (k.clone(), d.clone()).prop_map(|(k, d)| NullOp::ComputeIfAbsent(k, d)),
        2 => (k.clone(), d.clone()).prop_map(|(k, d)| NullOp::ComputeIfPresent(k, d)),
        2 => (k.clone(), d).prop_map(|(k, d)| NullOp::Compute(k, d)),
        2 => (k.clone(), -4i32..4, any::<bool>()).prop_map(|(k, v, discard)| NullOp::Merge(k, v, discard)),
        1 => k.clone().prop_map(NullOp::MergeMarker),
        1 => (k.clone(), v.clone()).prop_map(|(k, v)| NullOp::RemoveIfEq(k, v)),
        1 => (k.clone(), v.clone(), v.clone()).prop_map(|(k, o, n)| NullOp::ReplaceIfEq(k, o, n)),
        1 => (k, v).prop_map(|(k, v)| NullOp::Replace(k, v)),
        1 => Just(NullOp::Clear),
    ]
}

// `None` asks for no value, `Some(None)` returns the marker itself, and
// `Some(Some(d))` offsets the current value by `d`.
fn offset(current: Option<i32>, d: Option<Option<i32>>) -> Option<Option<i32>> {
    d.map(|d| d.map(|d| current.unwrap_or(0).wrapping_add(d)))
}

fn write_result(model: &mut BTreeMap<u8, Option<i32>>, k: u8, result: Option<i32>) -> Option<Option<i32>> {
    match result {
        Some(n) => {
            model.insert(k, Some(n));
            Some(Some(n))
        }
        None => {
            model.remove(&k);
            None
        }
    }
}

fn run_nullable_laws(ops: Vec<NullOp>) -> Result<(), TestCaseError> {
    let sut: Nullable = LiveMap::new();
    let mut model: BTreeMap<u8, Option<i32>> = BTreeMap::new();
    let live = |model: &BTreeMap<u8, Option<i32>>, k: u8| model.get(&k).copied().flatten();

    for op in ops {
        match op {
            NullOp::Put(k, v) => {
                prop_assert_eq!(sut.put(k, v).unwrap(), model.insert(k, v));
            }
            NullOp::Remove(k) => {
                prop_assert_eq!(sut.remove(&k).unwrap(), model.remove(&k));
            }
            NullOp::GetOrDefault(k, fallback) => {
                let expected = model.get(&k).copied().unwrap_or(fallback);
                prop_assert_eq!(sut.get_or_default(&k, fallback), expected);
            }
            NullOp::PutIfAbsent(k, v) => {
                let expected = match live(&model, k) {
                    Some(cur) => Some(Some(cur)),
                    None => model.insert(k, v),
                };
                prop_assert_eq!(sut.put_if_absent(k, v).unwrap(), expected);
            }
            NullOp::ComputeIfAbsent(k, out) => {
                let expected = match live(&model, k) {
                    Some(cur) => Some(Some(cur)),
                    None => match out.flatten() {
                        Some(n) => write_result(&mut model, k, Some(n)),
                        None => None,
                    },
                };
                prop_assert_eq!(sut.compute_if_absent(k, |_| out).unwrap(), expected);
            }
            NullOp::ComputeIfPresent(k, d) => {
                let expected = match live(&model, k) {
                    None => None,
                    Some(cur) => write_result(&mut model, k, offset(Some(cur), d).flatten()),
                };
                prop_assert_eq!(sut.compute_if_present(k, |_, v| offset(v, d)).unwrap(), expected);
            }
            NullOp::Compute(k, d) => {
                let existed = model.contains_key(&k);
                let expected = match offset(live(&model, k), d).flatten() {
                    Some(n) => write_result(&mut model, k, Some(n)),
                    None => {
                        if existed {
                            model.remove(&k);
                        }
                        None
                    }
                };
                prop_assert_eq!(sut.compute(k, |_, v| offset(v.flatten(), d)).unwrap(), expected);
            }
            NullOp::Merge(k, v, discard) => {
                let f = |a: Option<i32>, b: Option<i32>| {
                    (!discard).then(|| Some(a.unwrap_or(0).wrapping_add(b.unwrap_or(0))))
                };
                let merged = match live(&model, k) {
                    None => Some(v),
                    Some(cur) => f(Some(cur), Some(v)).flatten(),
                };
                let expected = write_result(&mut model, k, merged);
                prop_assert_eq!(sut.merge(k, Some(v), f).unwrap(), expected);
            }
            NullOp::MergeMarker(k) => {
                let err = sut.merge(k, None, |a, _| Some(a)).unwrap_err();
                prop_assert!(err.is_invalid_argument());
            }
            NullOp::RemoveIfEq(k, v) => {
                let hit = model.get(&k) == Some(&v);
                if hit {
                    model.remove(&k);
                }
                prop_assert_eq!(sut.remove_if_eq(&k, &v).unwrap(), hit);
            }
            NullOp::ReplaceIfEq(k, old, new) => {
                let hit = model.get(&k) == Some(&old);
                if hit {
                    model.insert(k, new);
                }
                prop_assert_eq!(sut.replace_if_eq(k, &old, new).unwrap(), hit);
            }
            NullOp::Replace(k, v) => {
                let expected = match model.get_mut(&k) {
                    Some(cur) => Some(std::mem::replace(cur, v)),
                    None => None,
                };
                prop_assert_eq!(sut.replace(k, v).unwrap(), expected);
            }
            NullOp::Clear => {
                model.clear();
                sut.clear().unwrap();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        let mut seen = BTreeMap::new();
        sut.for_each(|k, v| {
            seen.insert(*k, *v);
        })
        .unwrap();
        prop_assert_eq!(&seen, &model);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

    #[test]
    fn prop_derived_ops_match_model_with_absence_marker(
        ops in proptest::collection::vec(arb_null_op(), 1..64),
    ) {
        run_nullable_laws(ops)?;
    }

    #[test]
    fn prop_derived_ops_match_model_hash(ops in proptest::collection::vec(arb_op(), 1..64)) {
        run_laws::<HandleHashMap<u8, i32>>(ops)?;
    }

    #[test]
    fn prop_derived_ops_match_model_linear(ops in proptest::collection::vec(arb_op(), 1..64)) {
        run_laws::<LinearMap<u8, i32>>(ops)?;
    }

    // Equality and hash depend only on the set of mappings, not on the
    // strategy or the order of insertion.
    #[test]
    fn prop_equality_and_hash_ignore_order(
        pairs in proptest::collection::btree_map(0u8..32, any::<i32>(), 0..16),
        seed in any::<u64>(),
    ) {
        let mut forward: Vec<(u8, i32)> = pairs.into_iter().collect();
        let h: LiveMap<HandleHashMap<u8, i32>> = forward.iter().copied().collect();
        let n = forward.len().max(1);
        forward.rotate_left((seed as usize) % n);
        forward.reverse();
        let l: LiveMap<LinearMap<u8, i32>> = forward.iter().copied().collect();

        prop_assert!(h == l);
        prop_assert!(l == h);
        prop_assert_eq!(h.hash_code(), l.hash_code());

        if let Some(&(k, v)) = forward.first() {
            l.put(k, v.wrapping_add(1)).unwrap();
            prop_assert!(h != l);
            l.put(k, v).unwrap();
            prop_assert!(h == l);
            prop_assert_eq!(h.hash_code(), l.hash_code());
        }
    }

    // put_if_absent is idempotent: a second call never changes the map.
    #[test]
    fn prop_put_if_absent_idempotent(
        pairs in proptest::collection::vec((0u8..8, any::<i32>()), 0..12),
        k in 0u8..8,
        v in any::<i32>(),
    ) {
        let m: LiveMap<HandleHashMap<u8, i32>> = pairs.into_iter().collect();
        m.put_if_absent(k, v).unwrap();
        let once = snapshot(&m);
        m.put_if_absent(k, v.wrapping_add(1)).unwrap();
        prop_assert_eq!(snapshot(&m), once);
    }
}
