//! Code-point sets represented as sorted disjoint ranges.
//!
//! A `Charset` is the label of an automaton edge. Keeping the ranges
//! normalized (sorted by start, pairwise disjoint, never adjacent) makes
//! set algebra linear in the number of ranges and makes equality and
//! hashing structural.

/// An inclusive code-point range `[lo, hi]`. Empty when `lo > hi`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CharRange {
    pub lo: u32,
    pub hi: u32,
}

impl CharRange {
    pub fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    #[inline]
    pub fn contains(&self, cp: u32) -> bool {
        self.lo <= cp && cp <= self.hi
    }

    fn intersect(&self, other: &CharRange) -> Option<CharRange> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo <= hi).then_some(CharRange { lo, hi })
    }
}

/// The highest scalar value a `char` can hold.
pub const MAX_CODE_POINT: u32 = char::MAX as u32;

/// A normalized set of code points: sorted, disjoint, non-adjacent ranges.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Charset {
    ranges: Vec<CharRange>,
}

impl Charset {
    /// Build from arbitrary ranges; overlapping or adjacent ranges are
    /// merged, empty ranges dropped.
    pub fn from_ranges(mut ranges: Vec<CharRange>) -> Self {
        ranges.retain(|r| !r.is_empty());
        ranges.sort_by_key(|r| r.lo);

        let mut result: Vec<CharRange> = Vec::with_capacity(ranges.len());
        for r in ranges {
            match result.last_mut() {
                // `hi + 1 >= lo` means overlapping or adjacent
                Some(last) if last.hi.saturating_add(1) >= r.lo => {
                    last.hi = last.hi.max(r.hi);
                }
                _ => result.push(r),
            }
        }
        Self { ranges: result }
    }

    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn all() -> Self {
        Self::of_range(0, MAX_CODE_POINT)
    }

    pub fn of_range(lo: u32, hi: u32) -> Self {
        Self::from_ranges(vec![CharRange::new(lo, hi)])
    }

    pub fn range(lo: char, hi: char) -> Self {
        Self::of_range(lo as u32, hi as u32)
    }

    pub fn single(c: char) -> Self {
        Self::of_range(c as u32, c as u32)
    }

    /// Set of exactly the characters in `chars`.
    pub fn chars(chars: &str) -> Self {
        Self::from_ranges(
            chars
                .chars()
                .map(|c| CharRange::new(c as u32, c as u32))
                .collect(),
        )
    }

    #[inline]
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of code points in the set.
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|r| (r.hi - r.lo + 1) as u64)
            .sum()
    }

    pub fn contains(&self, c: char) -> bool {
        self.contains_cp(c as u32)
    }

    pub fn contains_cp(&self, cp: u32) -> bool {
        // ranges are sorted by lo, binary search on the start
        match self.ranges.binary_search_by(|r| {
            if cp < r.lo {
                std::cmp::Ordering::Greater
            } else if cp > r.hi {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        }) {
            Ok(_) => true,
            Err(_) => false,
        }
    }

    pub fn union(&self, other: &Charset) -> Charset {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        Charset::from_ranges(ranges)
    }

    pub fn intersect(&self, other: &Charset) -> Charset {
        let mut out = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                if b.lo > a.hi {
                    break;
                }
                if let Some(r) = a.intersect(b) {
                    out.push(r);
                }
            }
        }
        Charset::from_ranges(out)
    }

    /// Code points in `self` but not in `other`.
    pub fn difference(&self, other: &Charset) -> Charset {
        let mut out = Vec::new();
        for a in &self.ranges {
            let mut lo = a.lo;
            for b in &other.ranges {
                if b.hi < lo {
                    continue;
                }
                if b.lo > a.hi {
                    break;
                }
                if b.lo > lo {
                    out.push(CharRange::new(lo, b.lo - 1));
                }
                lo = b.hi.saturating_add(1);
                if lo > a.hi {
                    break;
                }
            }
            if lo <= a.hi {
                out.push(CharRange::new(lo, a.hi));
            }
        }
        Charset::from_ranges(out)
    }

    pub fn complement(&self) -> Charset {
        Charset::all().difference(self)
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if r.lo == r.hi {
                write!(f, "{:?}", char_repr(r.lo))?;
            } else {
                write!(f, "{:?}-{:?}", char_repr(r.lo), char_repr(r.hi))?;
            }
        }
        write!(f, "}}")
    }
}

fn char_repr(cp: u32) -> char {
    char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER)
}
