//! Numerical verification of back-propagated gradients.

pub mod grad_check;

pub use grad_check::{
    CheckMode, CheckTarget, GradCheckEntry, GradCheckError, GradCheckReport, GradientChecker,
};
