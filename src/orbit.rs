//! Partitioning candidates into orbits under an equivalence relation.
//!
//! Candidates are visited in generation order. Each one is compared against the representatives
//! found so far; it joins the first orbit whose representative it is equivalent to, or starts a
//! new orbit and becomes its representative. The representative of an orbit is therefore always
//! its first candidate in generation order.

/// An equivalence relation on `T`, injected into [`OrbitPartition`].
pub trait Equivalence<T> {
    fn equivalent(&self, a: &T, b: &T) -> bool;
}

impl<T, F: Fn(&T, &T) -> bool> Equivalence<T> for F {
    fn equivalent(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// How a newly inserted candidate was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The candidate starts orbit `n`.
    Representative(usize),
    /// The candidate joins existing orbit `n`.
    Member(usize),
}

impl Membership {
    pub fn orbit(&self) -> usize {
        match *self {
            Membership::Representative(n) | Membership::Member(n) => n,
        }
    }
}

/// Representatives of each orbit, with the candidate indices belonging to it.
#[derive(Debug, Clone)]
pub struct OrbitPartition<T> {
    representatives: Vec<T>,
    members: Vec<Vec<usize>>,
    candidate_count: usize,
}

impl<T> Default for OrbitPartition<T> {
    fn default() -> Self {
        Self {
            representatives: vec![],
            members: vec![],
            candidate_count: 0,
        }
    }
}

impl<T> OrbitPartition<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partitions every candidate, in order.
    pub fn from_candidates<E: Equivalence<T> + ?Sized>(
        candidates: impl IntoIterator<Item = T>,
        equivalence: &E,
    ) -> Self {
        let mut partition = Self::new();
        for c in candidates {
            partition.insert(c, equivalence);
        }
        partition
    }

    /// Classifies one candidate. O(number of orbits so far).
    pub fn insert<E: Equivalence<T> + ?Sized>(&mut self, candidate: T, equivalence: &E) -> Membership {
        let index = self.candidate_count;
        self.candidate_count += 1;
        match self
            .representatives
            .iter()
            .position(|rep| equivalence.equivalent(rep, &candidate))
        {
            Some(orbit) => {
                self.members[orbit].push(index);
                Membership::Member(orbit)
            }
            None => {
                self.representatives.push(candidate);
                self.members.push(vec![index]);
                Membership::Representative(self.representatives.len() - 1)
            }
        }
    }

    pub fn representatives(&self) -> &[T] {
        &self.representatives
    }

    pub fn into_representatives(self) -> Vec<T> {
        self.representatives
    }

    /// Candidate indices in each orbit, in insertion order. The first is the representative.
    pub fn members(&self, orbit: usize) -> Option<&[usize]> {
        self.members.get(orbit).map(Vec::as_slice)
    }

    pub fn orbit_sizes(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }

    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Number of candidates seen, including those absorbed into existing orbits.
    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_is_representative() {
        let same_parity = |a: &i32, b: &i32| (a - b) % 2 == 0;
        let mut p = OrbitPartition::new();
        assert_eq!(p.insert(3, &same_parity), Membership::Representative(0));
        assert_eq!(p.insert(5, &same_parity), Membership::Member(0));
        assert_eq!(p.insert(4, &same_parity), Membership::Representative(1));
        assert_eq!(p.insert(1, &same_parity), Membership::Member(0));
        assert_eq!(p.representatives(), &[3, 4]);
        assert_eq!(p.members(0), Some(&[0, 1, 3][..]));
        assert_eq!(p.members(2), None);
        assert_eq!(p.candidate_count(), 4);
        assert_eq!(p.orbit_sizes(), vec![3, 1]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]
        #[test]
        fn test_partition_modulo(xs in prop::collection::vec(0u32..100, 0..60), m in 1u32..8) {
            let eq = |a: &u32, b: &u32| a % m == b % m;
            let p = OrbitPartition::from_candidates(xs.clone(), &eq);
            // representatives are pairwise inequivalent, every candidate has one
            for (i, a) in p.representatives().iter().enumerate() {
                for b in &p.representatives()[i + 1..] {
                    prop_assert!(!eq(a, b));
                }
            }
            prop_assert_eq!(p.orbit_sizes().iter().sum::<usize>(), xs.len());
            for orbit in 0..p.len() {
                for &c in p.members(orbit).unwrap() {
                    prop_assert!(eq(&p.representatives()[orbit], &xs[c]));
                }
            }
        }
    }
}
