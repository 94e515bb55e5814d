//! Vectors and matrices of polynomials.
//!
//! Lengths are runtime values (k or l depending on the parameter set), so
//! vectors are heap-allocated rather than const-sized.

use crate::params::N;
use crate::poly::Poly;
use core::ops::{Add, AddAssign, Sub, SubAssign};
use zeroize::Zeroize;

/// A vector of polynomials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyVec {
    /// The component polynomials.
    pub polys: Vec<Poly>,
}

impl Zeroize for PolyVec {
    fn zeroize(&mut self) {
        for p in self.polys.iter_mut() {
            p.zeroize();
        }
    }
}

impl PolyVec {
    /// A zero vector of the given length.
    pub fn zero(len: usize) -> Self {
        PolyVec { polys: vec![Poly::zero(); len] }
    }

    /// Number of component polynomials.
    pub fn len(&self) -> usize {
        self.polys.len()
    }

    /// True iff the vector has no components.
    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Forward NTT on every component.
    pub fn ntt(&mut self) {
        for p in self.polys.iter_mut() {
            p.ntt();
        }
    }

    /// Inverse NTT on every component.
    pub fn inv_ntt(&mut self) {
        for p in self.polys.iter_mut() {
            p.inv_ntt();
        }
    }

    /// Reduce every coefficient to [0, Q).
    pub fn reduce(&mut self) {
        for p in self.polys.iter_mut() {
            p.reduce();
        }
    }

    /// Multiply every coefficient by 2^d.
    pub fn shift_left(&mut self, d: usize) {
        for p in self.polys.iter_mut() {
            p.shift_left(d);
        }
    }

    /// Largest component infinity norm.
    pub fn norm_inf(&self) -> i32 {
        self.polys.iter().map(Poly::norm_inf).max().unwrap_or(0)
    }

    /// True iff every component satisfies the strict norm bound.
    pub fn check_norm(&self, bound: i32) -> bool {
        self.polys.iter().all(|p| p.check_norm(bound))
    }
}

impl Add for &PolyVec {
    type Output = PolyVec;

    fn add(self, rhs: &PolyVec) -> PolyVec {
        debug_assert_eq!(self.len(), rhs.len());
        let mut result = PolyVec::zero(self.len());
        for i in 0..self.len() {
            result.polys[i] = &self.polys[i] + &rhs.polys[i];
        }
        result
    }
}

impl AddAssign<&PolyVec> for PolyVec {
    fn add_assign(&mut self, rhs: &PolyVec) {
        debug_assert_eq!(self.len(), rhs.len());
        for i in 0..rhs.len() {
            self.polys[i] += &rhs.polys[i];
        }
    }
}

impl Sub for &PolyVec {
    type Output = PolyVec;

    fn sub(self, rhs: &PolyVec) -> PolyVec {
        debug_assert_eq!(self.len(), rhs.len());
        let mut result = PolyVec::zero(self.len());
        for i in 0..self.len() {
            result.polys[i] = &self.polys[i] - &rhs.polys[i];
        }
        result
    }
}

impl SubAssign<&PolyVec> for PolyVec {
    fn sub_assign(&mut self, rhs: &PolyVec) {
        debug_assert_eq!(self.len(), rhs.len());
        for i in 0..rhs.len() {
            self.polys[i] -= &rhs.polys[i];
        }
    }
}

/// The public matrix A, k rows of l polynomials, kept in NTT domain.
#[derive(Clone, Debug)]
pub struct PolyMatrix {
    /// Rows of the matrix.
    pub rows: Vec<PolyVec>,
}

impl PolyMatrix {
    /// A zero matrix with `k` rows of `l` polynomials.
    pub fn zero(k: usize, l: usize) -> Self {
        PolyMatrix { rows: vec![PolyVec::zero(l); k] }
    }

    /// Matrix-vector product A·v̂; `v` must already be in NTT domain.
    /// The result is in NTT domain.
    pub fn mul_vec(&self, v: &PolyVec) -> PolyVec {
        let mut result = PolyVec::zero(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            debug_assert_eq!(row.len(), v.len());
            let mut acc = Poly::zero();
            for j in 0..row.len() {
                let prod = row.polys[j].pointwise_mul(&v.polys[j]);
                for n in 0..N {
                    acc.coeffs[n] += prod.coeffs[n];
                }
            }
            acc.reduce();
            result.polys[i] = acc;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Q;

    #[test]
    fn identity_matrix_times_vector() {
        // A 2x2 "identity" in NTT domain: NTT(1) has all coefficients 1
        let mut one = Poly::zero();
        one.coeffs[0] = 1;
        one.ntt();

        let mut a = PolyMatrix::zero(2, 2);
        a.rows[0].polys[0] = one.clone();
        a.rows[1].polys[1] = one;

        let mut v = PolyVec::zero(2);
        v.polys[0].coeffs[0] = 7;
        v.polys[1].coeffs[1] = 11;
        let expected = v.clone();

        v.ntt();
        let mut out = a.mul_vec(&v);
        out.inv_ntt();

        assert_eq!(out, expected);
    }

    #[test]
    fn vector_norm() {
        let mut v = PolyVec::zero(3);
        v.polys[2].coeffs[17] = Q - 5;
        assert_eq!(v.norm_inf(), 5);
        assert!(v.check_norm(6));
        assert!(!v.check_norm(5));
    }
}
