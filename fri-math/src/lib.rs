//! The arithmetic underneath the FRI low-degree test: prime fields with a
//! runtime modulus, dense univariate polynomials, the number-theoretic
//! transform, and evaluation domains.
//!
//! All arithmetic is checked: combining values from different fields fails
//! with [`MathError::FieldMismatch`](error::MathError::FieldMismatch) instead of
//! producing garbage. The default field is the one with
//! 2^64 - 2^32 + 1 elements, whose multiplicative group has subgroups of every
//! power-of-two order up to 2^32.
//!
//! # Example
//!
//! ```
//! # use fri_math::prelude::*;
//! let field = Field::goldilocks();
//! let polynomial = Polynomial::new(field.elements([1, 0, 2])).unwrap();
//! let domain = Domain::of_length(field, 8).unwrap();
//!
//! let codeword = domain.evaluate(&polynomial).unwrap();
//! assert_eq!(polynomial, domain.interpolate(&codeword).unwrap());
//! ```

pub mod domain;
pub mod error;
pub mod field;
pub mod ntt;
pub mod polynomial;
pub mod prelude;
