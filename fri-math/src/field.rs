use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::MathError;
use crate::error::MathResult;

/// The prime 2^64 - 2^32 + 1, also known as the “Goldilocks” prime.
pub const GOLDILOCKS_MODULUS: u64 = 0xffff_ffff_0000_0001;

/// How many candidates to try when looking for a quadratic non-residue. For a
/// prime modulus, the smallest non-residue is tiny, so hitting this bound
/// means the modulus is not prime.
const NON_RESIDUE_SEARCH_BOUND: u64 = 1 << 16;

/// A prime field, identified by its modulus.
///
/// Primality of the modulus is not checked; it is the caller's responsibility.
/// Many operations, like [inversion](FieldElement::inverse), silently produce
/// nonsense for composite moduli.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    modulus: u64,
}

/// An element of some [`Field`].
///
/// Arithmetic between elements of different fields is rejected with
/// [`MathError::FieldMismatch`]. Equality takes both the value and the field
/// into account.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "FieldElementRepr", try_from = "FieldElementRepr")]
pub struct FieldElement {
    value: u64,
    field: Field,
}

#[derive(Serialize, Deserialize)]
struct FieldElementRepr {
    value: u64,
    modulus: u64,
}

impl Field {
    pub fn new(modulus: u64) -> MathResult<Self> {
        if modulus < 2 {
            return Err(MathError::InvalidModulus(modulus));
        }
        Ok(Self { modulus })
    }

    pub const fn goldilocks() -> Self {
        Self {
            modulus: GOLDILOCKS_MODULUS,
        }
    }

    pub const fn modulus(self) -> u64 {
        self.modulus
    }

    /// Construct the element congruent to `value`.
    pub const fn element(self, value: u64) -> FieldElement {
        FieldElement {
            value: value % self.modulus,
            field: self,
        }
    }

    pub fn element_from_i64(self, value: i64) -> FieldElement {
        let magnitude = self.element(value.unsigned_abs());
        if value < 0 {
            magnitude.neg()
        } else {
            magnitude
        }
    }

    pub fn elements(self, values: impl IntoIterator<Item = u64>) -> Vec<FieldElement> {
        values.into_iter().map(|v| self.element(v)).collect()
    }

    /// Interpret (at most) the first 16 bytes as a little-endian integer and
    /// reduce it modulo the field's modulus.
    ///
    /// This is how challenges sampled from a transcript become field elements.
    pub fn element_from_bytes(self, bytes: &[u8]) -> FieldElement {
        let mut buffer = [0; 16];
        let num_bytes = bytes.len().min(buffer.len());
        buffer[..num_bytes].copy_from_slice(&bytes[..num_bytes]);
        let value = u128::from_le_bytes(buffer) % u128::from(self.modulus);

        // the remainder is smaller than the modulus, which fits into a u64
        FieldElement {
            value: value as u64,
            field: self,
        }
    }

    pub const fn zero(self) -> FieldElement {
        FieldElement {
            value: 0,
            field: self,
        }
    }

    pub const fn one(self) -> FieldElement {
        FieldElement {
            value: 1,
            field: self,
        }
    }

    /// The largest `k` such that `2^k` divides `p - 1`. Multiplicative
    /// subgroups of order `2^k` exist for exactly these `k`.
    pub const fn two_adicity(self) -> u32 {
        (self.modulus - 1).trailing_zeros()
    }

    /// The smallest quadratic non-residue, found through Euler's criterion.
    ///
    /// Its `(p-1)/n`-th power has multiplicative order exactly `n` for any
    /// power of two `n` dividing `p - 1`. Returns `None` for the field with two
    /// elements, in which every element is a square.
    pub fn multiplicative_generator_candidate(self) -> Option<FieldElement> {
        let minus_one = self.one().neg();
        let exponent = (self.modulus - 1) / 2;
        (2..self.modulus.min(NON_RESIDUE_SEARCH_BOUND))
            .map(|candidate| self.element(candidate))
            .find(|candidate| candidate.pow(exponent) == minus_one)
    }

    /// An element of multiplicative order exactly `order`.
    ///
    /// The `order` must be a power of two that divides `p - 1`.
    pub fn primitive_nth_root(self, order: u64) -> MathResult<FieldElement> {
        let no_root = MathError::NoPrimitiveRoot { order };
        if !order.is_power_of_two() || order.trailing_zeros() > self.two_adicity() {
            return Err(no_root);
        }
        if order == 1 {
            return Ok(self.one());
        }

        let non_residue = self.multiplicative_generator_candidate().ok_or(no_root)?;
        Ok(non_residue.pow((self.modulus - 1) / order))
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "F_{}", self.modulus)
    }
}

// Arithmetic is fallible because operands might come from different fields,
// which rules out the operator traits.
#[allow(clippy::should_implement_trait)]
impl FieldElement {
    pub const fn value(self) -> u64 {
        self.value
    }

    pub const fn field(self) -> Field {
        self.field
    }

    pub const fn is_zero(self) -> bool {
        self.value == 0
    }

    pub const fn is_one(self) -> bool {
        self.value == 1
    }

    pub fn ensure_same_field(self, other: Self) -> MathResult<()> {
        if self.field != other.field {
            return Err(MathError::FieldMismatch {
                left: self.field.modulus,
                right: other.field.modulus,
            });
        }
        Ok(())
    }

    pub fn add(self, rhs: Self) -> MathResult<Self> {
        self.ensure_same_field(rhs)?;
        Ok(self.add_unchecked(rhs))
    }

    pub fn sub(self, rhs: Self) -> MathResult<Self> {
        self.ensure_same_field(rhs)?;
        Ok(self.sub_unchecked(rhs))
    }

    pub fn mul(self, rhs: Self) -> MathResult<Self> {
        self.ensure_same_field(rhs)?;
        Ok(self.mul_unchecked(rhs))
    }

    pub fn div(self, rhs: Self) -> MathResult<Self> {
        self.ensure_same_field(rhs)?;
        Ok(self.mul_unchecked(rhs.inverse()?))
    }

    pub const fn neg(self) -> Self {
        let value = match self.value {
            0 => 0,
            v => self.field.modulus - v,
        };
        Self { value, ..self }
    }

    /// The multiplicative inverse, computed as `a^(p-2)`.
    pub fn inverse(self) -> MathResult<Self> {
        if self.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        Ok(self.pow(self.field.modulus - 2))
    }

    /// Exponentiation by repeated squaring.
    pub fn pow(self, exponent: u64) -> Self {
        let mut accumulator = self.field.one();
        let mut base = self;
        let mut exponent = exponent;
        while exponent > 0 {
            if exponent & 1 == 1 {
                accumulator = accumulator.mul_unchecked(base);
            }
            base = base.mul_unchecked(base);
            exponent >>= 1;
        }
        accumulator
    }

    /// Like [`pow`](Self::pow), but negative exponents raise the inverse.
    /// Fails for zero if the exponent is negative.
    pub fn pow_signed(self, exponent: i64) -> MathResult<Self> {
        let base = if exponent < 0 { self.inverse()? } else { self };
        Ok(base.pow(exponent.unsigned_abs()))
    }

    /// Invert all elements using Montgomery's trick: one inversion plus three
    /// multiplications per element.
    pub fn batch_inversion(elements: &[Self]) -> MathResult<Vec<Self>> {
        let Some(&first) = elements.first() else {
            return Ok(vec![]);
        };

        let mut partial_products = Vec::with_capacity(elements.len());
        let mut accumulator = first.field.one();
        for &element in elements {
            accumulator.ensure_same_field(element)?;
            if element.is_zero() {
                return Err(MathError::DivisionByZero);
            }
            partial_products.push(accumulator);
            accumulator = accumulator.mul_unchecked(element);
        }

        let mut accumulator_inverse = accumulator.inverse()?;
        let mut inverses = vec![first.field.zero(); elements.len()];
        for (i, &element) in elements.iter().enumerate().rev() {
            inverses[i] = accumulator_inverse.mul_unchecked(partial_products[i]);
            accumulator_inverse = accumulator_inverse.mul_unchecked(element);
        }
        Ok(inverses)
    }

    pub(crate) const fn add_unchecked(self, rhs: Self) -> Self {
        let modulus = self.field.modulus as u128;
        let sum = (self.value as u128 + rhs.value as u128) % modulus;
        Self {
            value: sum as u64,
            ..self
        }
    }

    pub(crate) const fn sub_unchecked(self, rhs: Self) -> Self {
        let value = if self.value >= rhs.value {
            self.value - rhs.value
        } else {
            self.field.modulus - (rhs.value - self.value)
        };
        Self { value, ..self }
    }

    pub(crate) const fn mul_unchecked(self, rhs: Self) -> Self {
        let modulus = self.field.modulus as u128;
        let product = (self.value as u128 * rhs.value as u128) % modulus;
        Self {
            value: product as u64,
            ..self
        }
    }
}

impl Display for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Debug for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({} mod {})", self.value, self.field.modulus)
    }
}

impl From<FieldElement> for FieldElementRepr {
    fn from(element: FieldElement) -> Self {
        Self {
            value: element.value,
            modulus: element.field.modulus,
        }
    }
}

impl TryFrom<FieldElementRepr> for FieldElement {
    type Error = MathError;

    fn try_from(repr: FieldElementRepr) -> MathResult<Self> {
        Ok(Field::new(repr.modulus)?.element(repr.value))
    }
}
