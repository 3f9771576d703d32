use crate::error::MathError;
use crate::error::MathResult;
use crate::field::Field;
use crate::field::FieldElement;
use crate::ntt::intt;
use crate::ntt::validate_root;
use crate::polynomial::Polynomial;

/// The ordered points `offset · generator^i` for `i` in `0..length`.
///
/// Points are computed on demand. If the `generator` is a primitive root of
/// unity of order `length`, evaluation and interpolation use the NTT; otherwise
/// they fall back to point-wise evaluation and Lagrange interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    offset: FieldElement,
    generator: FieldElement,
    length: usize,
}

impl Domain {
    /// The powers `generator^0, …, generator^(length-1)`.
    pub fn generate_domain(generator: FieldElement, length: usize) -> Self {
        Self {
            offset: generator.field().one(),
            generator,
            length,
        }
    }

    pub fn new(offset: FieldElement, generator: FieldElement, length: usize) -> MathResult<Self> {
        offset.ensure_same_field(generator)?;
        Ok(Self {
            offset,
            generator,
            length,
        })
    }

    /// The subgroup of the given power-of-two length.
    pub fn of_length(field: Field, length: usize) -> MathResult<Self> {
        if !length.is_power_of_two() {
            return Err(MathError::DomainLengthNotPowerOfTwo(length));
        }
        let generator = field.primitive_nth_root(length as u64)?;
        Ok(Self::generate_domain(generator, length))
    }

    /// Scale every point by `offset`.
    pub fn offset_domain(self, offset: FieldElement) -> MathResult<Self> {
        let offset = self.offset.mul(offset)?;
        Ok(Self { offset, ..self })
    }

    /// The squares of the first half of the points.
    ///
    /// If `self` [pairs points antipodally](Self::has_antipodal_pairing), these
    /// are also the squares of the second half.
    pub fn sq_domain(self) -> Self {
        Self {
            offset: self.offset.pow(2),
            generator: self.generator.pow(2),
            length: self.length / 2,
        }
    }

    pub fn offset(self) -> FieldElement {
        self.offset
    }

    pub fn generator(self) -> FieldElement {
        self.generator
    }

    pub fn field(self) -> Field {
        self.offset.field()
    }

    pub fn len(self) -> usize {
        self.length
    }

    pub fn is_empty(self) -> bool {
        self.length == 0
    }

    pub fn value(self, index: usize) -> FieldElement {
        self.offset.mul_unchecked(self.generator.pow(index as u64))
    }

    pub fn values(self) -> Vec<FieldElement> {
        let mut values = Vec::with_capacity(self.length);
        let mut accumulator = self.offset;
        for _ in 0..self.length {
            values.push(accumulator);
            accumulator = accumulator.mul_unchecked(self.generator);
        }
        values
    }

    /// Whether point `i` and point `length/2 + i` are additive inverses for
    /// every `i`, which is what folding needs.
    pub fn has_antipodal_pairing(self) -> bool {
        if self.length < 2 || self.length % 2 != 0 || self.offset.is_zero() {
            return false;
        }
        self.generator.pow((self.length / 2) as u64) == self.field().one().neg()
    }

    fn supports_ntt(self) -> bool {
        !self.offset.is_zero() && validate_root(self.generator, self.length).is_ok()
    }

    pub fn evaluate(self, polynomial: &Polynomial) -> MathResult<Vec<FieldElement>> {
        if self.supports_ntt() {
            return polynomial.fast_coset_evaluate(self.offset, self.generator, self.length);
        }
        polynomial.evaluate_all(&self.values())
    }

    /// The polynomial of degree less than the domain's length that takes the
    /// given values on the domain's points.
    pub fn interpolate(self, values: &[FieldElement]) -> MathResult<Polynomial> {
        if values.len() != self.length {
            return Err(MathError::LengthMismatch {
                expected: self.length,
                actual: values.len(),
            });
        }
        if !self.supports_ntt() {
            return Polynomial::interpolate(&self.values(), values);
        }

        let mut coefficients = values.to_vec();
        intt(&mut coefficients, self.generator)?;

        let offset_inverse = self.offset.inverse()?;
        let mut scale = self.field().one();
        for coefficient in &mut coefficients {
            *coefficient = coefficient.mul_unchecked(scale);
            scale = scale.mul_unchecked(offset_inverse);
        }
        Polynomial::new(coefficients)
    }
}
