//! Base traits for the group structure of symmetry operations. Both symmetry backends need to
//! know whether a set of operations is closed, and the table-driven one needs to complete a set
//! of generators into the full group, so that logic lives here once.

use std::fmt::Debug;

/// Group element requirements.
pub trait GroupElement: Debug + Clone {}

impl<T: Debug + Clone> GroupElement for T {}

/// A mathematical group: a set and operation that satisfies closure, the existence of an identity,
/// the existence of an inverse, and associativity. The group can operate under a different
/// equivalence relation than the default for the element type: space group operations are only
/// defined modulo lattice translations, and operations found numerically are only equal up to a
/// tolerance.
pub trait Group<E: GroupElement> {
    /// The identity. Must be an e such that ae = ea = a for all a in the group.
    fn identity(&self) -> E;

    /// Computing the inverse: must have ab = ba = e for a to be b's inverse.
    fn inv(&self, element: &E) -> E;

    /// The group operation. Must be associative. `g.compose(a, b)` returns `ab`, which is the
    /// operation "do b, then do a".
    fn compose(&self, a: &E, b: &E) -> E;

    /// Equivalence relation on group elements.
    fn equiv(&self, a: &E, b: &E) -> bool;

    /// "Canonical" or "reduced" representation of an element: if `g.residue(a) == g.residue(b)`,
    /// then `g.equiv(a, b)`. The default implementation (just a clone) is never wrong.
    fn residue(&self, el: &E) -> E {
        el.clone()
    }

    /// Containment using the group's notion of equality.
    fn contains_equiv<'a, T: IntoIterator<Item = &'a E>>(
        &self,
        elements: T,
        test_element: &E,
    ) -> bool
    where
        E: 'a,
    {
        elements.into_iter().any(|el| self.equiv(el, test_element))
    }

    /// Whether an element is the identity.
    fn is_identity(&self, a: &E) -> bool {
        self.equiv(a, &self.identity())
    }

    /// Whether the given elements are closed under composition and inversion. A finite set with
    /// both properties that contains anything at all contains the identity, so it is a group.
    fn is_closed(&self, elements: &[E]) -> bool {
        elements.iter().all(|a| {
            self.contains_equiv(elements, &self.inv(a))
                && elements
                    .iter()
                    .all(|b| self.contains_equiv(elements, &self.compose(a, b)))
        })
    }
}

/// A group that is finitely generated.
pub trait FinitelyGeneratedGroup<E: GroupElement>: Group<E> {
    type Generators: IntoIterator<Item = E>;
    /// Gets the generators of the group. These elements should be able to produce every element in
    /// the group through composition and inversion.
    fn generators(&self) -> Self::Generators;
}

/// Generates every element of a finite group from its generators using Dimino's algorithm. The
/// identity comes first; the rest follow in the order they are discovered, which only depends on
/// the order of the generators.
pub fn generate_elements<E: GroupElement, G: FinitelyGeneratedGroup<E>>(group: &G) -> Vec<E> {
    let gens: Vec<E> = group
        .generators()
        .into_iter()
        .map(|e| group.residue(&e))
        .collect();
    let mut elements = vec![group.identity()];

    for i in 0..gens.len() {
        // subgroup of G, G_i, given by gens[0..i]
        let d = elements.clone();
        let mut n = vec![group.identity()];

        while !n.is_empty() {
            let mut new_n = vec![];
            for a in n {
                for g in gens.iter().skip(i) {
                    let ag = group.residue(&group.compose(&a, g));
                    if !group.contains_equiv(&elements, &ag) {
                        // G_i * g
                        for el in &d {
                            let ap = group.residue(&group.compose(el, &ag));
                            elements.push(ap.clone());
                            new_n.push(ap);
                        }
                    }
                }
            }
            n = new_n;
        }
    }

    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ops::Range;

    /// The integers mod n over addition, represented using the integers 0-(n-1).
    #[derive(Debug, Clone, Copy)]
    struct ZAddMod(usize);

    impl Group<usize> for ZAddMod {
        fn identity(&self) -> usize {
            0
        }

        fn inv(&self, element: &usize) -> usize {
            (self.0 - element % self.0) % self.0
        }

        fn compose(&self, a: &usize, b: &usize) -> usize {
            (a + b) % self.0
        }

        fn equiv(&self, a: &usize, b: &usize) -> bool {
            a % self.0 == b % self.0
        }

        fn residue(&self, el: &usize) -> usize {
            el % self.0
        }
    }

    impl FinitelyGeneratedGroup<usize> for ZAddMod {
        type Generators = Range<usize>;

        fn generators(&self) -> Self::Generators {
            1..2
        }
    }

    #[test]
    fn test_zadd_n() {
        for n in [7, 10, 256] {
            let grp = ZAddMod(n);
            let mut els = generate_elements(&grp);
            els.sort();
            assert_eq!(els, (0..n).collect::<Vec<usize>>());
            assert!(grp.is_closed(&els));
        }
    }

    #[test]
    fn test_not_closed() {
        let grp = ZAddMod(6);
        assert!(grp.is_closed(&[0, 2, 4]));
        assert!(!grp.is_closed(&[0, 2]));
        assert!(!grp.is_closed(&[0, 1, 2, 3]));
    }
}
