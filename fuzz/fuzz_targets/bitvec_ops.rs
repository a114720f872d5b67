#![no_main]
use std::collections::BTreeSet;

use infbits::BitVector;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<(u16, bool)>, Vec<u16>, bool, u8)| {
    let (writes, other_ones, other_inverted, op) = data;

    let mut bv = BitVector::<64>::new();
    let mut model = BTreeSet::new();
    for &(i, v) in &writes {
        bv.set(i as usize, v);
        if v {
            model.insert(i as usize);
        } else {
            model.remove(&(i as usize));
        }
    }
    for i in 0..=u16::MAX as usize {
        assert_eq!(bv.get(i), model.contains(&i));
    }
    assert_eq!(bv.count(), model.len());

    let mut other = BitVector::<64>::new();
    if other_inverted {
        other.invert();
    }
    for &i in &other_ones {
        other.set(i as usize, !other_inverted);
    }
    let other_get = |i: usize| other_ones.contains(&(i as u16)) != other_inverted;

    let mut r = bv.clone();
    let expect: fn(bool, bool) -> bool = match op % 3 {
        0 => {
            r.bit_and(&other);
            |p, q| p && q
        }
        1 => {
            r.bit_or(&other);
            |p, q| p || q
        }
        _ => {
            r.bit_xor(&other);
            |p, q| p != q
        }
    };
    for i in 0..=u16::MAX as usize {
        assert_eq!(r.get(i), expect(model.contains(&i), other_get(i)));
    }
    for i in 0..=u16::MAX as usize {
        assert_eq!(bv.get(i), model.contains(&i));
    }
});
