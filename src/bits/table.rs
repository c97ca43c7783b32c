//! A 2D bit matrix: `rows_padded` rows of `cols_padded` bits each, stored as
//! one contiguous `BitVec` so each row is addressable as a word-aligned
//! `BitVecRef`.

use rand::RngCore;

use super::vec::{ceil_to_word, BitVec, BitVecRef, BitVecRefMut, WORD_BITS};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitTable {
    rows_padded: usize,
    cols_padded: usize,
    bits: BitVec,
}

impl BitTable {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows_padded = ceil_to_word(rows);
        let cols_padded = ceil_to_word(cols);
        BitTable {
            rows_padded,
            cols_padded,
            bits: BitVec::new(rows_padded * cols_padded),
        }
    }

    pub fn rows_padded(&self) -> usize {
        self.rows_padded
    }

    pub fn cols_padded(&self) -> usize {
        self.cols_padded
    }

    fn row_bounds(&self, row: usize) -> (usize, usize) {
        let lo = row * self.cols_padded;
        (lo, lo + self.cols_padded)
    }

    pub fn row(&self, row: usize) -> BitVecRef<'_> {
        let (lo, hi) = self.row_bounds(row);
        self.bits.word_range(lo, hi)
    }

    pub fn row_mut(&mut self, row: usize) -> BitVecRefMut<'_> {
        let (lo, hi) = self.row_bounds(row);
        self.bits.word_range_mut(lo, hi)
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.bits.get(row * self.cols_padded + col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.bits.set(row * self.cols_padded + col, value);
    }

    pub fn identity(n: usize) -> Self {
        let mut t = Self::new(n, n);
        for i in 0..n {
            t.set(i, i, true);
        }
        t
    }

    pub fn random<R: RngCore>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut t = Self::new(rows, cols);
        for r in 0..rows {
            let mut view = t.row_mut(r);
            for c in 0..cols {
                view.set(c, rng.next_u32() & 1 == 1);
            }
        }
        t
    }

    /// `(this * rhs)` over GF(2), limited to the top-left `n x n` block.
    pub fn square_mat_mul(&self, rhs: &BitTable, n: usize) -> BitTable {
        assert!(n <= self.rows_padded && n <= rhs.rows_padded);
        let mut out = BitTable::new(n, n);
        for i in 0..n {
            let mut acc = BitVec::new(n);
            for k in 0..n {
                if self.get(i, k) {
                    let mut row_k = BitVec::new(n);
                    for c in 0..n {
                        row_k.set(c, rhs.get(k, c));
                    }
                    acc.xor_assign(&row_k);
                }
            }
            for c in 0..n {
                out.set(i, c, acc.get(c));
            }
        }
        out
    }

    /// Full-pivoting Gauss-Jordan inverse of the top-left `n x n` block over
    /// GF(2). `None` if the block is singular.
    pub fn gaussian_inverse(&self, n: usize) -> Option<BitTable> {
        let mut work = BitTable::new(n, n);
        for r in 0..n {
            for c in 0..n {
                work.set(r, c, self.get(r, c));
            }
        }
        let mut inv = BitTable::identity(n);
        for col in 0..n {
            if !work.get(col, col) {
                let pivot = (col + 1..n).find(|&r| work.get(r, col))?;
                for c in 0..n {
                    let a = work.get(col, c);
                    let b = work.get(pivot, c);
                    work.set(col, c, b);
                    work.set(pivot, c, a);
                    let ia = inv.get(col, c);
                    let ib = inv.get(pivot, c);
                    inv.set(col, c, ib);
                    inv.set(pivot, c, ia);
                }
            }
            for row in 0..n {
                if row != col && work.get(row, col) {
                    for c in 0..n {
                        let v = work.get(row, c) ^ work.get(col, c);
                        work.set(row, c, v);
                        let iv = inv.get(row, c) ^ inv.get(col, c);
                        inv.set(row, c, iv);
                    }
                }
            }
        }
        Some(inv)
    }

    /// Gauss-Jordan elimination assuming `self`'s top-left `n x n` block is
    /// lower-triangular with a full diagonal.
    pub fn inverse_assuming_lower_triangular(&self, n: usize) -> BitTable {
        let mut work = BitTable::new(n, n);
        for r in 0..n {
            for c in 0..n {
                work.set(r, c, self.get(r, c));
            }
        }
        let mut inv = BitTable::identity(n);
        for col in 0..n {
            debug_assert!(work.get(col, col), "expected a full diagonal");
            for row in (col + 1)..n {
                if work.get(row, col) {
                    for c in 0..n {
                        let v = work.get(row, c) ^ work.get(col, c);
                        work.set(row, c, v);
                        let iv = inv.get(row, c) ^ inv.get(col, c);
                        inv.set(row, c, iv);
                    }
                }
            }
        }
        inv
    }

    /// Transposes the top-left `rows_padded x rows_padded` block in place.
    /// Requires `rows_padded == cols_padded`.
    ///
    /// Implemented as a direct bit-by-bit swap rather than a SIMD
    /// byte-interleave kernel; see DESIGN.md for the tradeoff.
    pub fn do_square_transpose(&mut self) {
        assert_eq!(self.rows_padded, self.cols_padded, "square transpose requires a square table");
        let n = self.rows_padded;
        for r in 0..n {
            for c in (r + 1)..n {
                let a = self.get(r, c);
                let b = self.get(c, r);
                self.set(r, c, b);
                self.set(c, r, a);
            }
        }
    }

    pub fn transposed(&self) -> BitTable {
        let mut out = BitTable::new(self.cols_padded, self.rows_padded);
        for r in 0..self.rows_padded {
            for c in 0..self.cols_padded {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }

    pub fn transpose_into(&self, out: &mut BitTable) {
        assert_eq!(out.rows_padded, self.cols_padded);
        assert_eq!(out.cols_padded, self.rows_padded);
        for r in 0..self.rows_padded {
            for c in 0..self.cols_padded {
                out.set(c, r, self.get(r, c));
            }
        }
    }

    pub fn slice_major(&self, lo: usize, hi: usize) -> BitTable {
        assert!(hi <= self.rows_padded);
        let mut out = BitTable::new(hi - lo, self.cols_padded);
        for (out_r, r) in (lo..hi).enumerate() {
            for c in 0..self.cols_padded {
                out.set(out_r, c, self.get(r, c));
            }
        }
        out
    }

    /// Builds a `2n x 2n` table from four `n x n` quadrants.
    pub fn from_quadrants(n: usize, ul: &BitTable, ur: &BitTable, ll: &BitTable, lr: &BitTable) -> BitTable {
        let mut out = BitTable::new(2 * n, 2 * n);
        for r in 0..n {
            for c in 0..n {
                out.set(r, c, ul.get(r, c));
                out.set(r, c + n, ur.get(r, c));
                out.set(r + n, c, ll.get(r, c));
                out.set(r + n, c + n, lr.get(r, c));
            }
        }
        out
    }

    pub const WORD_BITS: usize = WORD_BITS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn square_transpose_is_an_involution() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let original = BitTable::random(64, 64, &mut rng);
        let mut twice = original.clone();
        twice.do_square_transpose();
        twice.do_square_transpose();
        assert_eq!(twice, original);
    }

    #[test]
    fn transposed_matches_manual_reference() {
        let mut t = BitTable::new(3, 5);
        t.set(0, 4, true);
        t.set(2, 1, true);
        let tt = t.transposed();
        assert!(tt.get(4, 0));
        assert!(tt.get(1, 2));
        assert!(!tt.get(0, 0));
    }

    #[test]
    fn identity_mat_mul_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let a = BitTable::random(64, 64, &mut rng);
        let id = BitTable::identity(64);
        let prod = a.square_mat_mul(&id, 64);
        assert_eq!(prod, a);
    }

    #[test]
    fn lower_triangular_inverse_composes_to_identity() {
        let mut lower = BitTable::identity(8);
        lower.set(2, 0, true);
        lower.set(3, 1, true);
        lower.set(5, 0, true);
        let inv = lower.inverse_assuming_lower_triangular(8);
        let prod = lower.square_mat_mul(&inv, 8);
        assert_eq!(prod, BitTable::identity(8));
    }

    #[test]
    fn gaussian_inverse_composes_to_identity_for_a_random_invertible_matrix() {
        // An upper-triangular matrix with a full diagonal is always invertible.
        let mut m = BitTable::identity(6);
        m.set(0, 3, true);
        m.set(1, 2, true);
        m.set(2, 5, true);
        let inv = m.gaussian_inverse(6).expect("triangular matrices with full diagonal are invertible");
        assert_eq!(m.square_mat_mul(&inv, 6), BitTable::identity(6));
    }

    #[test]
    fn from_quadrants_places_blocks_correctly() {
        let n = 4;
        let ul = BitTable::identity(n);
        let ur = BitTable::new(n, n);
        let ll = BitTable::new(n, n);
        let mut lr = BitTable::new(n, n);
        lr.set(0, 0, true);
        let fused = BitTable::from_quadrants(n, &ul, &ur, &ll, &lr);
        assert!(fused.get(0, 0));
        assert!(fused.get(n, n));
        assert!(!fused.get(0, n));
    }
}
