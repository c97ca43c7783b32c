//! Pauli strings: length-N tensor products of single-qubit Paulis with a
//! sign, in the symplectic (x-bits, z-bits, sign) encoding.
//!
//! `PauliStringOwned` owns its three bit buffers (plus an explicit length
//! field, rather than inferring it from buffer size); `PauliStringMut`
//! borrows word-aligned views — either out of an owned string, or out of a
//! row of a `Tableau`'s `BitTable` plus a bit of its shared sign vector.

use std::fmt;

use crate::bits::{BitRef, BitVec, BitVecRefMut};
use crate::error::{CoreError, CoreResult};

/// Decodes the symplectic `(x, z)` bit pair into the `0..3` Pauli code:
/// `I=0, X=1, Z=2, Y=3`.
pub fn pauli_code(x: bool, z: bool) -> u8 {
    (x as u8) | ((z as u8) << 1)
}

pub fn code_to_char(code: u8) -> char {
    match code {
        0 => 'I',
        1 => 'X',
        2 => 'Z',
        3 => 'Y',
        _ => unreachable!("pauli code is always in 0..=3"),
    }
}

fn char_to_xz(c: char) -> Option<(bool, bool)> {
    match c.to_ascii_uppercase() {
        'I' | '_' => Some((false, false)),
        'X' => Some((true, false)),
        'Y' => Some((true, true)),
        'Z' => Some((false, true)),
        _ => None,
    }
}

/// An owned Pauli string: `(sign, xs, zs)` of explicit length `num_qubits`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauliStringOwned {
    num_qubits: usize,
    sign_bit: BitVec,
    xs: BitVec,
    zs: BitVec,
}

impl PauliStringOwned {
    pub fn identity(num_qubits: usize) -> Self {
        PauliStringOwned {
            num_qubits,
            sign_bit: BitVec::new(1),
            xs: BitVec::new(num_qubits),
            zs: BitVec::new(num_qubits),
        }
    }

    pub fn from_pattern(sign: bool, num_qubits: usize, mut letter_at: impl FnMut(usize) -> char) -> CoreResult<Self> {
        let mut out = Self::identity(num_qubits);
        out.sign_bit.set(0, sign);
        for k in 0..num_qubits {
            let c = letter_at(k);
            let (x, z) = char_to_xz(c).ok_or_else(|| CoreError::Parse {
                op_index: 0,
                message: format!("unrecognized Pauli letter '{c}'"),
            })?;
            out.xs.set(k, x);
            out.zs.set(k, z);
        }
        Ok(out)
    }

    /// Parses `"±[IXYZ_]+"`. An empty body after the sign is the zero-qubit
    /// identity.
    pub fn from_text(text: &str) -> CoreResult<Self> {
        let (sign, body) = match text.as_bytes().first() {
            Some(b'+') => (false, &text[1..]),
            Some(b'-') => (true, &text[1..]),
            _ => (false, text),
        };
        let chars: Vec<char> = body.chars().collect();
        Self::from_pattern(sign, chars.len(), |k| chars[k])
    }

    pub fn random<R: rand::RngCore>(num_qubits: usize, rng: &mut R) -> Self {
        let mut out = Self::identity(num_qubits);
        out.xs.randomize(num_qubits, rng);
        out.zs.randomize(num_qubits, rng);
        out.sign_bit.randomize(1, rng);
        out
    }

    pub fn len(&self) -> usize {
        self.num_qubits
    }

    pub fn is_empty(&self) -> bool {
        self.num_qubits == 0
    }

    pub fn sign(&self) -> bool {
        self.sign_bit.get(0)
    }

    pub fn set_sign(&mut self, value: bool) {
        self.sign_bit.set(0, value);
    }

    pub fn sign_flip(&mut self) {
        let cur = self.sign();
        self.set_sign(!cur);
    }

    pub fn set(&mut self, k: usize, code: u8) {
        self.xs.set(k, code & 1 != 0);
        self.zs.set(k, code & 2 != 0);
    }

    pub fn get(&self, k: usize) -> u8 {
        pauli_code(self.xs.get(k), self.zs.get(k))
    }

    /// Returns a copy of `self` widened to `new_len` qubits, with the new
    /// positions left as identity.
    pub fn extended_to(&self, new_len: usize) -> PauliStringOwned {
        assert!(new_len >= self.num_qubits);
        let mut out = PauliStringOwned::identity(new_len);
        out.set_sign(self.sign());
        for k in 0..self.num_qubits {
            out.set(k, self.get(k));
        }
        out
    }

    /// `popcount(xs1 & zs2 XOR xs2 & zs1)` is even.
    pub fn commutes(&self, other: &PauliStringOwned) -> bool {
        assert_eq!(self.num_qubits, other.num_qubits);
        let mut a = self.xs.clone();
        a.and_assign(&other.zs);
        let mut b = other.xs.clone();
        b.and_assign(&self.zs);
        a.xor_assign(&b);
        a.popcount() % 2 == 0
    }

    pub fn as_mut(&mut self) -> PauliStringMut<'_> {
        let n = self.num_qubits;
        PauliStringMut {
            num_qubits: n,
            sign: self.sign_bit.bit_mut(0),
            xs: self.xs.word_range_mut(0, self.xs.padded_len()),
            zs: self.zs.word_range_mut(0, self.zs.padded_len()),
        }
    }
}

impl fmt::Display for PauliStringOwned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.sign() { '-' } else { '+' })?;
        for k in 0..self.num_qubits {
            write!(f, "{}", code_to_char(self.get(k)))?;
        }
        Ok(())
    }
}

/// A borrowed, mutable, word-aligned view of a Pauli string: a sign bit
/// living inside some signs vector, plus x/z bit ranges living inside some
/// (possibly shared) storage — e.g. one column of a `Tableau`.
pub struct PauliStringMut<'a> {
    pub(crate) num_qubits: usize,
    pub(crate) sign: BitRef<'a>,
    pub(crate) xs: BitVecRefMut<'a>,
    pub(crate) zs: BitVecRefMut<'a>,
}

impl<'a> PauliStringMut<'a> {
    pub fn new(num_qubits: usize, sign: BitRef<'a>, xs: BitVecRefMut<'a>, zs: BitVecRefMut<'a>) -> Self {
        PauliStringMut { num_qubits, sign, xs, zs }
    }

    pub fn len(&self) -> usize {
        self.num_qubits
    }

    pub fn is_empty(&self) -> bool {
        self.num_qubits == 0
    }

    pub fn sign(&self) -> bool {
        self.sign.get()
    }

    pub fn sign_flip(&mut self) {
        self.sign.xor_assign(true);
    }

    pub fn get(&self, k: usize) -> u8 {
        pauli_code(self.xs.get(k), self.zs.get(k))
    }

    pub fn set(&mut self, k: usize, code: u8) {
        self.xs.set(k, code & 1 != 0);
        self.zs.set(k, code & 2 != 0);
    }

    pub fn assign_from(&mut self, other: &PauliStringMut<'_>) {
        assert_eq!(self.num_qubits, other.num_qubits);
        self.xs.assign(other.xs.as_shared());
        self.zs.assign(other.zs.as_shared());
        self.sign.set(other.sign());
    }

    pub fn swap_with(&mut self, other: &mut PauliStringMut<'_>) {
        assert_eq!(self.num_qubits, other.num_qubits);
        let a_sign = self.sign();
        let b_sign = other.sign();
        self.sign.set(b_sign);
        other.sign.set(a_sign);
        self.xs.swap_with(&mut other.xs);
        self.zs.swap_with(&mut other.zs);
    }

    pub fn gather_into(&self, out: &mut PauliStringMut<'_>, indices: &[usize]) {
        assert_eq!(out.num_qubits, indices.len());
        for (k_out, &k_in) in indices.iter().enumerate() {
            out.set(k_out, self.get(k_in));
        }
    }

    pub fn scatter_into(&self, out: &mut PauliStringMut<'_>, indices: &[usize]) {
        assert_eq!(self.num_qubits, indices.len());
        for k_in in 0..self.num_qubits {
            let k_out = indices[k_in];
            let merged = out.get(k_out) ^ self.get(k_in);
            out.set(k_out, merged);
        }
        let merged_sign = self.sign();
        out.sign.xor_assign(merged_sign);
    }

    /// `popcount(xs1 & zs2 XOR xs2 & zs1)` is even.
    pub fn commutes(&self, other: &PauliStringMut<'_>) -> bool {
        assert_eq!(self.num_qubits, other.num_qubits);
        let n = self.num_qubits.max(1);
        let mut a = self.xs.as_shared().to_owned_bitvec();
        let mut tmp_n = BitVec::new(n);
        for k in 0..self.num_qubits {
            tmp_n.set(k, other.zs.get(k));
        }
        a.and_assign(&tmp_n);

        let mut b = BitVec::new(n);
        for k in 0..self.num_qubits {
            b.set(k, other.xs.get(k));
        }
        let mut z1 = BitVec::new(n);
        for k in 0..self.num_qubits {
            z1.set(k, self.zs.get(k));
        }
        b.and_assign(&z1);

        a.xor_assign(&b);
        a.popcount() % 2 == 0
    }

    /// `self *= rhs`, assuming `self` commutes with `rhs`: sign updated for
    /// ±1 only.
    pub fn mul_commuting_assign(&mut self, rhs: &PauliStringMut<'_>) {
        debug_assert!(self.commutes(rhs), "mul_commuting_assign requires commuting operands");
        let log_i = self.right_mul_returning_log_i(rhs);
        debug_assert_eq!(log_i & 1, 0, "commuting multiplication must yield an even power of i");
        if log_i & 2 != 0 {
            self.sign_flip();
        }
    }

    /// `self <- self * rhs * i^{-k}`, returns `k in 0..=3`: the base-i
    /// logarithm of the scalar phase absorbed. A word-parallel accumulator
    /// trick (vector-at-a-time rather than true SIMD words, since storage
    /// rides on `bitvec`).
    pub fn right_mul_returning_log_i(&mut self, rhs: &PauliStringMut<'_>) -> u8 {
        assert_eq!(self.num_qubits, rhs.num_qubits);
        let n = self.num_qubits.max(1);

        let old_x1 = self.xs.as_shared().to_owned_bitvec();
        let old_z1 = self.zs.as_shared().to_owned_bitvec();
        let mut x2 = BitVec::new(n);
        let mut z2 = BitVec::new(n);
        for k in 0..self.num_qubits {
            x2.set(k, rhs.xs.get(k));
            z2.set(k, rhs.zs.get(k));
        }

        self.xs.xor_assign(
            rhs.xs.as_shared(),
        );
        self.zs.xor_assign(rhs.zs.as_shared());

        let mut x1z2 = old_x1.clone();
        x1z2.and_assign(&z2);

        let mut anti = x2;
        anti.and_assign(&old_z1);
        anti.xor_assign(&x1z2);

        let new_x1 = self.xs.as_shared().to_owned_bitvec();
        let new_z1 = self.zs.as_shared().to_owned_bitvec();

        let mut tmp = new_x1;
        tmp.xor_assign(&new_z1);
        tmp.xor_assign(&x1z2);
        tmp.and_assign(&anti);

        let c1 = anti;
        let c2 = tmp;

        let mut k = (c1.popcount() as u8) & 1;
        k ^= ((c2.popcount() as u8) & 1) << 1;
        k ^= (rhs.sign() as u8) << 1;
        k & 3
    }

    pub fn sparse_string(&self) -> String {
        let mut out = String::new();
        out.push(if self.sign() { '-' } else { '+' });
        let mut first = true;
        for k in 0..self.num_qubits {
            let code = self.get(k);
            if code != 0 {
                if !first {
                    out.push('*');
                }
                first = false;
                out.push(code_to_char(code));
                out.push_str(&k.to_string());
            }
        }
        if first {
            out.push('I');
        }
        out
    }
}

impl<'a> fmt::Display for PauliStringMut<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.sign() { '-' } else { '+' })?;
        for k in 0..self.num_qubits {
            write!(f, "{}", code_to_char(self.get(k)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_round_trips_through_display() {
        let p = PauliStringOwned::from_text("+IXYZ").unwrap();
        assert_eq!(p.to_string(), "+IXYZ");
        let neg = PauliStringOwned::from_text("-_X").unwrap();
        assert_eq!(neg.to_string(), "-IX");
    }

    #[test]
    fn rejects_unknown_letters() {
        assert!(PauliStringOwned::from_text("+IW").is_err());
    }

    #[test]
    fn commutation_spot_checks() {
        // X0 X1 commutes with Z0 Z1.
        let mut xx = PauliStringOwned::from_text("+XX").unwrap();
        let mut zz = PauliStringOwned::from_text("+ZZ").unwrap();
        assert!(xx.as_mut().commutes(&zz.as_mut()));

        // X0 Z1 anticommutes with Z0 X1.
        let mut xz = PauliStringOwned::from_text("+XZ").unwrap();
        let mut zx = PauliStringOwned::from_text("+ZX").unwrap();
        assert!(!xz.as_mut().commutes(&zx.as_mut()));

        // Y anticommutes with X and Z, commutes with Y.
        let mut y = PauliStringOwned::from_text("+Y").unwrap();
        let mut x = PauliStringOwned::from_text("+X").unwrap();
        let mut z = PauliStringOwned::from_text("+Z").unwrap();
        let mut y2 = PauliStringOwned::from_text("+Y").unwrap();
        assert!(!y.as_mut().commutes(&x.as_mut()));
        assert!(!y.as_mut().commutes(&z.as_mut()));
        assert!(y.as_mut().commutes(&y2.as_mut()));
        let _ = &mut xx;
        let _ = &mut zz;
    }

    #[test]
    fn right_mul_x_times_z_is_minus_i_y() {
        // X * Z = -iY  =>  inplace_right_mul_returning_log_i(X, Z) leaves X*Z/i^k = Y with k=3.
        let mut x = PauliStringOwned::from_text("+X").unwrap();
        let z = PauliStringOwned::from_text("+Z").unwrap();
        let mut z_owned = z;
        let k = x.as_mut().right_mul_returning_log_i(&z_owned.as_mut());
        assert_eq!(x.to_string(), "+Y");
        assert_eq!(k, 3);
    }

    #[test]
    fn mul_commuting_assign_tracks_sign() {
        let mut a = PauliStringOwned::from_text("+XX").unwrap();
        let b = PauliStringOwned::from_text("+ZZ").unwrap();
        let mut b_owned = b;
        a.as_mut().mul_commuting_assign(&b_owned.as_mut());
        // XX * ZZ = (XZ)(XZ) = (-iY)(-iY) = -YY
        assert_eq!(a.to_string(), "-YY");
    }

    #[test]
    fn gather_and_scatter_round_trip() {
        let p = PauliStringOwned::from_text("+IXYZ").unwrap();
        let mut p = p;
        let mut gathered = PauliStringOwned::identity(2);
        p.as_mut().gather_into(&mut gathered.as_mut(), &[1, 3]);
        assert_eq!(gathered.to_string(), "+XZ");

        let mut scattered = PauliStringOwned::identity(4);
        gathered.as_mut().scatter_into(&mut scattered.as_mut(), &[1, 3]);
        assert_eq!(scattered.to_string(), "+IXIZ");
    }

    #[test]
    fn sparse_string_matches_spec_format() {
        let identity = PauliStringOwned::identity(3);
        assert_eq!(identity.as_mut().sparse_string(), "+I");
        let p = PauliStringOwned::from_text("-IXY").unwrap();
        assert_eq!(p.as_mut().sparse_string(), "-X1*Y2");
    }
}
