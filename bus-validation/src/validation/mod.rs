//! The validator contract consumed by the validation steps.
//!
//! Rule evaluation is a black box: a [`Validator`] receives a type-erased
//! body and returns a [`ValidationOutcome`]. Validators are resolved per
//! message type through a [`ValidatorFactory`].

mod outcome;
mod registry;
mod validator;

pub use outcome::{FieldError, ValidationOutcome};
pub use registry::{ValidatorFactory, ValidatorRegistry};
pub use validator::{Typed, TypedValidator, Validator, ValidatorType};

#[cfg(test)]
pub use registry::MockValidatorFactory;
