//! Re-exports the most commonly-needed APIs.
//!
//! This module is intended to be wildcard-imported, _i.e._,
//! `use fri_math::prelude::*;`.

pub use crate::domain::Domain;
pub use crate::error::MathError;
pub use crate::error::MathResult;
pub use crate::field::Field;
pub use crate::field::FieldElement;
pub use crate::field::GOLDILOCKS_MODULUS;
pub use crate::polynomial::Polynomial;
