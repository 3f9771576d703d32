use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Rem;

use itertools::EitherOrBoth;
use itertools::Itertools;
use tracing::debug;

use crate::error::MathError;
use crate::error::MathResult;
use crate::field::Field;
use crate::field::FieldElement;
use crate::ntt::intt;
use crate::ntt::ntt;
use crate::ntt::validate_root;

/// Products whose degree is below this threshold are computed by direct
/// convolution, which is faster than the NTT for small inputs.
const FAST_MULTIPLICATION_CUTOFF_DEGREE: isize = 8;

/// A univariate polynomial over some [`Field`] in monomial basis.
///
/// The coefficient at index `i` belongs to `X^i`. Trailing zero coefficients
/// carry no meaning and are dropped on construction, so the zero polynomial is
/// the only polynomial whose coefficients end in 0. Equality is equality of the
/// resulting coefficient lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Polynomial {
    coefficients: Vec<FieldElement>,
}

impl Polynomial {
    /// Fails if there are no coefficients or if they stem from different
    /// fields.
    pub fn new(coefficients: Vec<FieldElement>) -> MathResult<Self> {
        let Some(&first) = coefficients.first() else {
            return Err(MathError::EmptyCoefficients);
        };
        for &coefficient in &coefficients {
            first.ensure_same_field(coefficient)?;
        }
        Ok(Self::from_trusted(coefficients))
    }

    /// Callers guarantee at least one coefficient, all from the same field.
    fn from_trusted(mut coefficients: Vec<FieldElement>) -> Self {
        while coefficients.len() > 1 && coefficients.last().is_some_and(|c| c.is_zero()) {
            coefficients.pop();
        }
        Self { coefficients }
    }

    pub fn zero(field: Field) -> Self {
        Self::constant(field.zero())
    }

    pub fn one(field: Field) -> Self {
        Self::constant(field.one())
    }

    /// The indeterminate `X`.
    pub fn x(field: Field) -> Self {
        Self::from_trusted(vec![field.zero(), field.one()])
    }

    pub fn constant(value: FieldElement) -> Self {
        Self {
            coefficients: vec![value],
        }
    }

    pub fn field(&self) -> Field {
        self.coefficients[0].field()
    }

    pub fn coefficients(&self) -> &[FieldElement] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<FieldElement> {
        self.coefficients
    }

    /// The index of the highest non-zero coefficient, or -1 for the zero
    /// polynomial.
    pub fn degree(&self) -> isize {
        if self.is_zero() {
            return -1;
        }
        (self.coefficients.len() - 1) as isize
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.len() == 1 && self.coefficients[0].is_zero()
    }

    pub fn leading_coefficient(&self) -> FieldElement {
        self.coefficients[self.coefficients.len() - 1]
    }

    fn ensure_same_field(&self, other: &Self) -> MathResult<()> {
        self.coefficients[0].ensure_same_field(other.coefficients[0])
    }

    fn ensure_in_field(&self, element: FieldElement) -> MathResult<()> {
        self.coefficients[0].ensure_same_field(element)
    }

    /// Horner's method.
    pub fn evaluate(&self, point: FieldElement) -> MathResult<FieldElement> {
        self.ensure_in_field(point)?;
        let value = self
            .coefficients
            .iter()
            .rev()
            .fold(self.field().zero(), |acc, &c| {
                acc.mul_unchecked(point).add_unchecked(c)
            });
        Ok(value)
    }

    pub fn evaluate_all(&self, points: &[FieldElement]) -> MathResult<Vec<FieldElement>> {
        points.iter().map(|&point| self.evaluate(point)).collect()
    }

    pub fn add(&self, other: &Self) -> MathResult<Self> {
        self.ensure_same_field(other)?;
        let sum = self
            .coefficients
            .iter()
            .zip_longest(&other.coefficients)
            .map(|pair| match pair {
                EitherOrBoth::Both(&a, &b) => a.add_unchecked(b),
                EitherOrBoth::Left(&c) | EitherOrBoth::Right(&c) => c,
            })
            .collect();
        Ok(Self::from_trusted(sum))
    }

    pub fn sub(&self, other: &Self) -> MathResult<Self> {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Self {
        let coefficients = self.coefficients.iter().map(|c| c.neg()).collect();
        Self { coefficients }
    }

    /// Multiply every coefficient by `factor`.
    pub fn scale(&self, factor: FieldElement) -> MathResult<Self> {
        self.ensure_in_field(factor)?;
        let coefficients = self
            .coefficients
            .iter()
            .map(|c| c.mul_unchecked(factor))
            .collect();
        Ok(Self::from_trusted(coefficients))
    }

    /// Uses the NTT for large products if the field has a suitable root of
    /// unity, and direct convolution otherwise.
    pub fn multiply(&self, other: &Self) -> MathResult<Self> {
        self.ensure_same_field(other)?;
        if self.is_zero() || other.is_zero() {
            return Ok(Self::zero(self.field()));
        }

        let product_degree = self.degree() + other.degree();
        if product_degree < FAST_MULTIPLICATION_CUTOFF_DEGREE {
            return Ok(self.naive_multiply(other));
        }

        let order = (product_degree as usize + 1).next_power_of_two();
        match self.field().primitive_nth_root(order as u64) {
            Ok(root) => self.fast_multiply(other, root, order),
            Err(_) => {
                debug!(order, field = %self.field(), "no root of unity, multiplying directly");
                Ok(self.naive_multiply(other))
            }
        }
    }

    pub(crate) fn naive_multiply(&self, other: &Self) -> Self {
        let zero = self.field().zero();
        let mut product = vec![zero; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, &a) in self.coefficients.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, &b) in other.coefficients.iter().enumerate() {
                product[i + j] = product[i + j].add_unchecked(a.mul_unchecked(b));
            }
        }
        Self::from_trusted(product)
    }

    /// Multiply using the NTT over the powers of `primitive_root`, which must
    /// have order `root_order`.
    ///
    /// If the product's degree is too large for the given root, the product is
    /// computed by direct convolution instead.
    pub fn fast_multiply(
        &self,
        other: &Self,
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        validate_root(primitive_root, root_order)?;
        self.ensure_same_field(other)?;
        self.ensure_in_field(primitive_root)?;
        if self.is_zero() || other.is_zero() {
            return Ok(Self::zero(self.field()));
        }

        let degree = (self.degree() + other.degree()) as usize;
        if degree >= root_order {
            return Ok(self.naive_multiply(other));
        }

        let mut root = primitive_root;
        let mut order = root_order;
        while degree < order / 2 {
            root = root.mul_unchecked(root);
            order /= 2;
        }

        let zero = self.field().zero();
        let mut lhs = self.coefficients.clone();
        lhs.resize(order, zero);
        let mut rhs = other.coefficients.clone();
        rhs.resize(order, zero);
        ntt(&mut lhs, root)?;
        ntt(&mut rhs, root)?;

        let mut product = lhs
            .into_iter()
            .zip(rhs)
            .map(|(l, r)| l.mul_unchecked(r))
            .collect_vec();
        intt(&mut product, root)?;
        Ok(Self::from_trusted(product))
    }

    /// `self^exponent` by repeated squaring.
    pub fn pow(&self, exponent: u32) -> MathResult<Self> {
        let mut accumulator = Self::one(self.field());
        for i in (0..u32::BITS - exponent.leading_zeros()).rev() {
            accumulator = accumulator.multiply(&accumulator)?;
            if exponent & (1 << i) != 0 {
                accumulator = accumulator.multiply(self)?;
            }
        }
        Ok(accumulator)
    }

    /// The composition `self(other(X))`.
    pub fn compose(&self, other: &Self) -> MathResult<Self> {
        self.ensure_same_field(other)?;
        let mut composition = Self::constant(self.leading_coefficient());
        for &coefficient in self.coefficients.iter().rev().skip(1) {
            composition = composition
                .multiply(other)?
                .add(&Self::constant(coefficient))?;
        }
        Ok(composition)
    }

    /// Schoolbook long division, returning `(quotient, remainder)`.
    pub fn divide(&self, divisor: &Self) -> MathResult<(Self, Self)> {
        self.ensure_same_field(divisor)?;
        if divisor.is_zero() {
            return Err(MathError::DivisionByZeroPolynomial);
        }
        if self.degree() < divisor.degree() {
            return Ok((Self::zero(self.field()), self.clone()));
        }

        let divisor_degree = divisor.degree() as usize;
        let leading_inverse = divisor.leading_coefficient().inverse()?;
        let quotient_len = self.coefficients.len() - divisor_degree;
        let mut quotient = vec![self.field().zero(); quotient_len];
        let mut remainder = self.coefficients.clone();
        for i in (0..quotient_len).rev() {
            let coefficient = remainder[i + divisor_degree].mul_unchecked(leading_inverse);
            quotient[i] = coefficient;
            for (j, &d) in divisor.coefficients.iter().enumerate() {
                remainder[i + j] = remainder[i + j].sub_unchecked(coefficient.mul_unchecked(d));
            }
        }
        remainder.truncate(divisor_degree.max(1));

        Ok((Self::from_trusted(quotient), Self::from_trusted(remainder)))
    }

    pub fn remainder(&self, divisor: &Self) -> MathResult<Self> {
        let (_, remainder) = self.divide(divisor)?;
        Ok(remainder)
    }

    /// The monic polynomial vanishing exactly on the given points.
    pub fn zerofier(points: &[FieldElement]) -> MathResult<Self> {
        let Some(&first) = points.first() else {
            return Err(MathError::EmptyInterpolation);
        };

        let field = first.field();
        let mut coefficients = vec![field.one()];
        for &point in points {
            first.ensure_same_field(point)?;
            let mut next = vec![field.zero(); coefficients.len() + 1];
            for (i, &c) in coefficients.iter().enumerate() {
                next[i + 1] = next[i + 1].add_unchecked(c);
                next[i] = next[i].sub_unchecked(c.mul_unchecked(point));
            }
            coefficients = next;
        }
        Ok(Self::from_trusted(coefficients))
    }

    /// Lagrange interpolation: the unique polynomial of degree less than the
    /// number of points that passes through all `(xs[i], ys[i])`.
    pub fn interpolate(xs: &[FieldElement], ys: &[FieldElement]) -> MathResult<Self> {
        if xs.len() != ys.len() {
            return Err(MathError::LengthMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        let Some(&first) = xs.first() else {
            return Err(MathError::EmptyInterpolation);
        };
        for &y in ys {
            first.ensure_same_field(y)?;
        }

        let field = first.field();
        let zerofier = Self::zerofier(xs)?;
        let mut interpolant = vec![field.zero(); xs.len()];
        for (i, (&x_i, &y_i)) in xs.iter().zip(ys).enumerate() {
            let weight = xs
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(field.one(), |acc, (_, &x_j)| {
                    acc.mul_unchecked(x_i.sub_unchecked(x_j))
                });
            if weight.is_zero() {
                return Err(MathError::DuplicateAbscissa(x_i.value()));
            }

            let scale = y_i.mul_unchecked(weight.inverse()?);
            let basis_numerator = Self::divide_by_linear_factor(&zerofier.coefficients, x_i);
            for (acc, c) in interpolant.iter_mut().zip(basis_numerator) {
                *acc = acc.add_unchecked(scale.mul_unchecked(c));
            }
        }
        Ok(Self::from_trusted(interpolant))
    }

    /// Synthetic division of a polynomial that is divisible by `X - root`.
    fn divide_by_linear_factor(coefficients: &[FieldElement], root: FieldElement) -> Vec<FieldElement> {
        let quotient_len = coefficients.len() - 1;
        let mut quotient = vec![root.field().zero(); quotient_len];
        let mut carry = root.field().zero();
        for k in (1..=quotient_len).rev() {
            carry = coefficients[k].add_unchecked(root.mul_unchecked(carry));
            quotient[k - 1] = carry;
        }
        quotient
    }

    /// Divide-and-conquer computation of the [zerofier](Self::zerofier),
    /// multiplying via the NTT over the powers of `primitive_root`.
    pub fn fast_zerofier(
        points: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        validate_root(primitive_root, root_order)?;
        let tree = SubproductTree::new(points, primitive_root, root_order)?;
        Ok(tree.into_zerofier())
    }

    /// Multi-point evaluation through a subproduct tree of zerofiers. The
    /// order of the `primitive_root` must be at least the number of points,
    /// rounded up to the next power of two.
    ///
    /// The tree is built once. Each of its nodes costs one remainder
    /// computation through a power series inverse, so the total is
    /// O(n log² n) field operations for n points and a polynomial of degree
    /// O(n).
    pub fn fast_evaluate(
        &self,
        points: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Vec<FieldElement>> {
        validate_root(primitive_root, root_order)?;
        ensure_root_order_covers(points.len(), root_order)?;
        if points.is_empty() {
            return Ok(vec![]);
        }
        let tree = SubproductTree::new(points, primitive_root, root_order)?;
        self.evaluate_on_tree(&tree, points, primitive_root, root_order)
    }

    fn evaluate_on_tree(
        &self,
        tree: &SubproductTree,
        points: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Vec<FieldElement>> {
        let SubproductTree::Branch { left, right, .. } = tree else {
            return self.evaluate_all(points);
        };

        let (left_points, right_points) = points.split_at(points.len() / 2);
        let mut values = self
            .fast_remainder(left.zerofier(), primitive_root, root_order)?
            .evaluate_on_tree(left, left_points, primitive_root, root_order)?;
        let right_values = self
            .fast_remainder(right.zerofier(), primitive_root, root_order)?
            .evaluate_on_tree(right, right_points, primitive_root, root_order)?;
        values.extend(right_values);
        Ok(values)
    }

    /// Divide-and-conquer interpolation through a subproduct tree of
    /// zerofiers. Has the same requirements on the `primitive_root` as
    /// [`fast_evaluate`](Self::fast_evaluate), and the same cost.
    pub fn fast_interpolate(
        xs: &[FieldElement],
        ys: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        if xs.len() != ys.len() {
            return Err(MathError::LengthMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(MathError::EmptyInterpolation);
        }
        validate_root(primitive_root, root_order)?;
        ensure_root_order_covers(xs.len(), root_order)?;

        // the i-th Lagrange basis polynomial is Z(X) / ((X - x_i)·Z'(x_i))
        let tree = SubproductTree::new(xs, primitive_root, root_order)?;
        let denominators = tree.zerofier().formal_derivative().evaluate_on_tree(
            &tree,
            xs,
            primitive_root,
            root_order,
        )?;
        let weights = Self::divide_targets(xs, ys, &denominators)?;
        Self::combine_on_tree(&tree, &weights, primitive_root, root_order)
    }

    /// `Σ weights[i] · Z(X) / (X - x_i)` where `Z` is the tree's zerofier.
    fn combine_on_tree(
        tree: &SubproductTree,
        weights: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        let SubproductTree::Branch { left, right, .. } = tree else {
            let &[weight] = weights else {
                return Err(MathError::LengthMismatch {
                    expected: 1,
                    actual: weights.len(),
                });
            };
            return Ok(Self::constant(weight));
        };

        let (left_weights, right_weights) = weights.split_at(weights.len() / 2);
        let left_sum = Self::combine_on_tree(left, left_weights, primitive_root, root_order)?;
        let right_sum = Self::combine_on_tree(right, right_weights, primitive_root, root_order)?;
        let left_term = left_sum.fast_multiply(right.zerofier(), primitive_root, root_order)?;
        let right_term = right_sum.fast_multiply(left.zerofier(), primitive_root, root_order)?;
        left_term.add(&right_term)
    }

    /// A vanishing denominator means the point occurs more than once.
    fn divide_targets(
        xs: &[FieldElement],
        ys: &[FieldElement],
        denominators: &[FieldElement],
    ) -> MathResult<Vec<FieldElement>> {
        xs.iter()
            .zip_eq(ys)
            .zip_eq(denominators)
            .map(|((&x, &y), &denominator)| match y.div(denominator) {
                Err(MathError::DivisionByZero) => Err(MathError::DuplicateAbscissa(x.value())),
                quotient => quotient,
            })
            .collect()
    }

    /// The formal derivative `Σ i·c_i·X^(i-1)`.
    pub fn formal_derivative(&self) -> Self {
        let field = self.field();
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| field.element(i as u64).mul_unchecked(c))
            .collect_vec();
        if coefficients.is_empty() {
            return Self::zero(field);
        }
        Self::from_trusted(coefficients)
    }

    /// The remainder of division by `divisor`, computed from a power series
    /// inverse of the reversed divisor. Small divisors use
    /// [long division](Self::divide).
    pub fn fast_remainder(
        &self,
        divisor: &Self,
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        self.ensure_same_field(divisor)?;
        let divisor_is_small = divisor.degree() < FAST_MULTIPLICATION_CUTOFF_DEGREE;
        if divisor_is_small || self.degree() < divisor.degree() {
            return self.remainder(divisor);
        }

        // with rev(p) = X^deg(p)·p(1/X), the quotient q satisfies
        // rev(q) = rev(self) · rev(divisor)⁻¹ mod X^(deg(q) + 1)
        let quotient_len = (self.degree() - divisor.degree()) as usize + 1;
        let divisor_inverse = divisor
            .reversed()
            .power_series_inverse(quotient_len, primitive_root, root_order)?;
        let mut quotient = self
            .reversed()
            .fast_multiply(&divisor_inverse, primitive_root, root_order)?
            .into_coefficients();
        quotient.resize(quotient_len, self.field().zero());
        quotient.reverse();

        let quotient = Self::from_trusted(quotient);
        self.sub(&quotient.fast_multiply(divisor, primitive_root, root_order)?)
    }

    fn reversed(&self) -> Self {
        Self::from_trusted(self.coefficients.iter().rev().copied().collect())
    }

    /// The first `len` coefficients.
    fn truncated(&self, len: usize) -> Self {
        Self::from_trusted(self.coefficients.iter().take(len.max(1)).copied().collect())
    }

    /// The power series `g` with `self · g ≡ 1 mod X^precision`, by Newton
    /// iteration `g ← g·(2 - self·g)`, which doubles the precision each step.
    fn power_series_inverse(
        &self,
        precision: usize,
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        let field = self.field();
        let two = Self::constant(field.one().add_unchecked(field.one()));
        let mut inverse = Self::constant(self.coefficients[0].inverse()?);
        let mut current_precision = 1;
        while current_precision < precision {
            current_precision = (2 * current_precision).min(precision);
            let error = self
                .truncated(current_precision)
                .fast_multiply(&inverse, primitive_root, root_order)?
                .truncated(current_precision);
            inverse = inverse
                .fast_multiply(&two.sub(&error)?, primitive_root, root_order)?
                .truncated(current_precision);
        }
        Ok(inverse)
    }

    /// Evaluate on the coset `{offset · generator^i}` of size `order` using
    /// the NTT. The `generator` must have order exactly `order`; the degree of
    /// the polynomial is not restricted.
    pub fn fast_coset_evaluate(
        &self,
        offset: FieldElement,
        generator: FieldElement,
        order: usize,
    ) -> MathResult<Vec<FieldElement>> {
        validate_root(generator, order)?;
        self.ensure_in_field(offset)?;
        self.ensure_in_field(generator)?;

        let mut values = vec![self.field().zero(); order];
        let mut offset_power = self.field().one();
        for (i, &coefficient) in self.coefficients.iter().enumerate() {
            let slot = &mut values[i % order];
            *slot = slot.add_unchecked(coefficient.mul_unchecked(offset_power));
            offset_power = offset_power.mul_unchecked(offset);
        }
        ntt(&mut values, generator)?;
        Ok(values)
    }
}

fn ensure_root_order_covers(num_points: usize, root_order: usize) -> MathResult<()> {
    let required_order = num_points.next_power_of_two();
    if root_order < required_order {
        return Err(MathError::NoPrimitiveRoot {
            order: required_order as u64,
        });
    }
    Ok(())
}

/// Zerofiers of ever smaller halves of a point set. The root vanishes on all
/// points, every leaf on a single one. Halves are split off at `len / 2`, like
/// the point slices walked alongside the tree.
#[derive(Debug, Clone)]
enum SubproductTree {
    Leaf(Polynomial),
    Branch {
        zerofier: Polynomial,
        left: Box<SubproductTree>,
        right: Box<SubproductTree>,
    },
}

impl SubproductTree {
    fn new(
        points: &[FieldElement],
        primitive_root: FieldElement,
        root_order: usize,
    ) -> MathResult<Self> {
        match points {
            [] => Err(MathError::EmptyInterpolation),
            &[point] => {
                primitive_root.ensure_same_field(point)?;
                let field = point.field();
                let linear_factor = Polynomial::from_trusted(vec![point.neg(), field.one()]);
                Ok(Self::Leaf(linear_factor))
            }
            _ => {
                let (left, right) = points.split_at(points.len() / 2);
                let left = Self::new(left, primitive_root, root_order)?;
                let right = Self::new(right, primitive_root, root_order)?;
                let zerofier = left
                    .zerofier()
                    .fast_multiply(right.zerofier(), primitive_root, root_order)?;
                Ok(Self::Branch {
                    zerofier,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        }
    }

    fn zerofier(&self) -> &Polynomial {
        match self {
            Self::Leaf(zerofier) | Self::Branch { zerofier, .. } => zerofier,
        }
    }

    fn into_zerofier(self) -> Polynomial {
        match self {
            Self::Leaf(zerofier) | Self::Branch { zerofier, .. } => zerofier,
        }
    }
}

impl Rem<&Polynomial> for &Polynomial {
    type Output = MathResult<Polynomial>;

    fn rem(self, divisor: &Polynomial) -> Self::Output {
        self.remainder(divisor)
    }
}

impl Display for Polynomial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }

        let terms = self
            .coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(i, c)| match i {
                0 => format!("{c}"),
                _ if c.is_one() => format!("X^{i}"),
                _ => format!("{c}*X^{i}"),
            });
        write!(f, "{}", terms.format(" + "))
    }
}
