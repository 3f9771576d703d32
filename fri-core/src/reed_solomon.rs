use std::sync::OnceLock;

use math::prelude::*;
use rand::Rng;
use rand::seq::index::sample;

/// A purported Reed-Solomon codeword: the values of some polynomial of degree
/// at most `max_degree` on the points of a [`Domain`].
///
/// Whether the values actually stem from such a polynomial is what the degree
/// checks and, more efficiently, [FRI](crate::fri::Fri) find out.
#[derive(Debug, Clone)]
pub struct ReedSolomonCode {
    values: Vec<FieldElement>,
    domain: Domain,
    max_degree: usize,

    /// Interpolant of all values; computed on first use.
    polynomial: OnceLock<Polynomial>,
}

impl ReedSolomonCode {
    pub fn new(values: Vec<FieldElement>, domain: Domain, max_degree: usize) -> MathResult<Self> {
        if values.len() != domain.len() {
            return Err(MathError::LengthMismatch {
                expected: domain.len(),
                actual: values.len(),
            });
        }
        for &value in &values {
            domain.offset().ensure_same_field(value)?;
        }

        Ok(Self {
            values,
            domain,
            max_degree,
            polynomial: OnceLock::new(),
        })
    }

    /// Evaluate the `polynomial` on the `domain`. The claimed `max_degree` is
    /// taken as given, even if the polynomial's degree exceeds it.
    pub fn from_polynomial(
        polynomial: &Polynomial,
        domain: Domain,
        max_degree: usize,
    ) -> MathResult<Self> {
        let values = domain.evaluate(polynomial)?;
        Self::new(values, domain, max_degree)
    }

    pub fn values(&self) -> &[FieldElement] {
        &self.values
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FieldElement> {
        self.values.get(index).copied()
    }

    /// The interpolant of all values.
    pub fn polynomial(&self) -> MathResult<&Polynomial> {
        if let Some(polynomial) = self.polynomial.get() {
            return Ok(polynomial);
        }
        let polynomial = self.domain.interpolate(&self.values)?;
        Ok(self.polynomial.get_or_init(|| polynomial))
    }

    /// Evaluate the interpolant of the codeword, which might lie outside the
    /// domain.
    pub fn evaluate(&self, point: FieldElement) -> MathResult<FieldElement> {
        self.polynomial()?.evaluate(point)
    }

    /// Interpolate all values and compare the degree to the claimed bound.
    pub fn check_degree_exactly(&self) -> MathResult<bool> {
        Ok(self.polynomial()?.degree() <= self.max_degree as isize)
    }

    /// Interpolate `max_degree + 1` randomly chosen values, then test whether
    /// the interpolant agrees with `num_spot_checks` further random values.
    ///
    /// If fewer values remain, all of them are checked, in which case the
    /// answer is exact. Otherwise, a codeword that disagrees with every
    /// low-degree polynomial on a fraction `δ` of the domain is accepted with
    /// probability at most roughly [`false_acceptance_bound`].
    ///
    /// [`false_acceptance_bound`]: Self::false_acceptance_bound
    pub fn check_degree<R: Rng + ?Sized>(
        &self,
        num_spot_checks: usize,
        rng: &mut R,
    ) -> MathResult<bool> {
        let num_basis_points = self.max_degree.saturating_add(1);
        if self.len() <= num_basis_points {
            return Ok(true);
        }

        let num_spot_checks = num_spot_checks.min(self.len() - num_basis_points);
        let indices = sample(rng, self.len(), num_basis_points + num_spot_checks).into_vec();
        let (basis_indices, spot_check_indices) = indices.split_at(num_basis_points);

        let xs = basis_indices
            .iter()
            .map(|&i| self.domain.value(i))
            .collect::<Vec<_>>();
        let ys = basis_indices
            .iter()
            .map(|&i| self.values[i])
            .collect::<Vec<_>>();
        let interpolant = Polynomial::interpolate(&xs, &ys)?;

        for &i in spot_check_indices {
            if interpolant.evaluate(self.domain.value(i))? != self.values[i] {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `(1 - δ)^s`: the probability that `s` independent spot checks all miss
    /// a fraction `δ` of corrupted values.
    pub fn false_acceptance_bound(relative_distance: f64, num_spot_checks: usize) -> f64 {
        let relative_distance = relative_distance.clamp(0.0, 1.0);
        (1.0 - relative_distance).powf(num_spot_checks as f64)
    }
}
