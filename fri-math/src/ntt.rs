//! The iterative radix-2 number-theoretic transform.
//!
//! Both transforms work in place and require a primitive root of unity whose
//! order equals the length of the input.

use crate::error::MathError;
use crate::error::MathResult;
use crate::field::FieldElement;

/// Check that `root` has multiplicative order exactly `order`, _i.e._, that
/// `root^order == 1` and `root^(order/2) != 1`.
pub fn validate_root(root: FieldElement, order: usize) -> MathResult<()> {
    if !order.is_power_of_two() {
        return Err(MathError::DomainLengthNotPowerOfTwo(order));
    }

    let order = order as u64;
    let invalid_root = MathError::InvalidPrimitiveRoot {
        root: root.value(),
        order,
    };
    if !root.pow(order).is_one() {
        return Err(invalid_root);
    }
    if order > 1 && root.pow(order / 2).is_one() {
        return Err(invalid_root);
    }
    Ok(())
}

/// Replace `values` by the evaluations of the polynomial with coefficients
/// `values` on the powers `root^0, root^1, …`.
pub fn ntt(values: &mut [FieldElement], root: FieldElement) -> MathResult<()> {
    validate_root(root, values.len())?;
    for &value in values.iter() {
        root.ensure_same_field(value)?;
    }
    transform(values, root);
    Ok(())
}

/// The inverse of [`ntt`]: turns evaluations on the powers of `root` back into
/// coefficients.
pub fn intt(values: &mut [FieldElement], root: FieldElement) -> MathResult<()> {
    ntt(values, root.inverse()?)?;
    let length_inverse = root.field().element(values.len() as u64).inverse()?;
    for value in values.iter_mut() {
        *value = value.mul_unchecked(length_inverse);
    }
    Ok(())
}

fn transform(values: &mut [FieldElement], root: FieldElement) {
    let n = values.len();
    if n <= 1 {
        return;
    }

    bit_reverse_permute(values);
    let one = root.field().one();
    let mut chunk_len = 2;
    while chunk_len <= n {
        let half = chunk_len / 2;
        let chunk_root = root.pow((n / chunk_len) as u64);
        for chunk in values.chunks_exact_mut(chunk_len) {
            let mut twiddle = one;
            for j in 0..half {
                let even = chunk[j];
                let odd = chunk[j + half].mul_unchecked(twiddle);
                chunk[j] = even.add_unchecked(odd);
                chunk[j + half] = even.sub_unchecked(odd);
                twiddle = twiddle.mul_unchecked(chunk_root);
            }
        }
        chunk_len *= 2;
    }
}

fn bit_reverse_permute(values: &mut [FieldElement]) {
    let log2_n = values.len().ilog2();
    for i in 0..values.len() {
        let j = i.reverse_bits() >> (usize::BITS - log2_n);
        if i < j {
            values.swap(i, j);
        }
    }
}
