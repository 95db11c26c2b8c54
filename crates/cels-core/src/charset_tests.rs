use crate::charset::{CharRange, Charset};

#[test]
fn construction_normalizes_overlaps_and_adjacency() {
    let cs = Charset::from_ranges(vec![
        CharRange::new('f' as u32, 'k' as u32),
        CharRange::new('a' as u32, 'c' as u32),
        CharRange::new('d' as u32, 'e' as u32), // adjacent to a-c and f-k
        CharRange::new(10, 5),                  // empty, dropped
    ]);
    assert_eq!(cs.ranges().len(), 1);
    assert_eq!(cs.ranges()[0], CharRange::new('a' as u32, 'k' as u32));
}

#[test]
fn repeated_construction_is_idempotent() {
    let first = Charset::from_ranges(vec![
        CharRange::new(0, 9),
        CharRange::new(5, 20),
        CharRange::new(30, 40),
    ]);
    let second = Charset::from_ranges(first.ranges().to_vec());
    assert_eq!(first, second);
}

#[test]
fn union_is_commutative() {
    let a = Charset::range('a', 'm');
    let b = Charset::range('h', 'z').union(&Charset::range('0', '9'));
    assert_eq!(a.union(&b), b.union(&a));
}

#[test]
fn difference_with_self_is_empty() {
    let a = Charset::chars("abcxyz").union(&Charset::range('0', '4'));
    assert!(a.difference(&a).is_empty());
}

#[test]
fn complement_laws() {
    let a = Charset::range('a', 'z');
    assert_eq!(a.union(&a.complement()), Charset::all());
    assert!(a.intersect(&a.complement()).is_empty());
}

#[test]
fn contains_respects_range_boundaries() {
    let digits = Charset::range('0', '9');
    assert!(digits.contains('0'));
    assert!(digits.contains('9'));
    assert!(!digits.contains('a'));
    assert!(!digits.contains('/')); // one below '0'
    assert!(!digits.contains(':')); // one above '9'
}

#[test]
fn intersect_splits_into_pieces() {
    let a = Charset::range('a', 'e').union(&Charset::range('m', 'q'));
    let b = Charset::range('c', 'o');
    let i = a.intersect(&b);
    assert!(i.contains('c') && i.contains('e') && i.contains('m') && i.contains('o'));
    assert!(!i.contains('a') && !i.contains('g') && !i.contains('q'));
    assert_eq!(i.ranges().len(), 2);
}

#[test]
fn difference_carves_holes() {
    let all_lower = Charset::range('a', 'z');
    let vowels = Charset::chars("aeiou");
    let consonants = all_lower.difference(&vowels);
    assert!(consonants.contains('b'));
    assert!(!consonants.contains('e'));
    assert_eq!(consonants.len(), 21);
}

#[test]
fn unicode_ranges_work() {
    let greek = Charset::range('α', 'ω');
    assert!(greek.contains('λ'));
    assert!(!greek.contains('a'));
}
