use thiserror::Error;

pub type MathResult<T> = Result<T, MathError>;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("operands live in different fields: modulus {left} vs. modulus {right}")]
    FieldMismatch { left: u64, right: u64 },

    #[error("0 does not have a multiplicative inverse")]
    DivisionByZero,

    #[error("modulus {0} does not define a field")]
    InvalidModulus(u64),

    #[error("a polynomial needs at least one coefficient")]
    EmptyCoefficients,

    #[error("cannot interpolate through zero points")]
    EmptyInterpolation,

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("interpolation points must be distinct, but {0} appears more than once")]
    DuplicateAbscissa(u64),

    #[error("division by the zero polynomial is undefined")]
    DivisionByZeroPolynomial,

    #[error("the field has no primitive root of unity of order {order}")]
    NoPrimitiveRoot { order: u64 },

    #[error("{root} is not a primitive root of unity of order {order}")]
    InvalidPrimitiveRoot { root: u64, order: u64 },

    #[error("domain length {0} is not a power of two")]
    DomainLengthNotPowerOfTwo(usize),
}
