//! Declared argument counts.

use crate::abi::emacs_variadic_function;
use crate::core::{Error, Result};

/// `max` value accepted by [`Arity::new`] for "any number of arguments".
pub const VARIADIC: isize = emacs_variadic_function;

/// Minimum and optional maximum argument count of a bound callable.
///
/// Both bounds are at most `isize::MAX`, so they always fit the host ABI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    /// Validate raw bounds as the host ABI expresses them.
    pub fn new(min: isize, max: isize) -> Result<Self> {
        let invalid = || Error::InvalidArity { min, max };
        let min_u = usize::try_from(min).map_err(|_| invalid())?;
        if max == VARIADIC {
            return Ok(Self {
                min: min_u,
                max: None,
            });
        }
        let max_u = usize::try_from(max).map_err(|_| invalid())?;
        if min_u > max_u {
            return Err(invalid());
        }
        Ok(Self {
            min: min_u,
            max: Some(max_u),
        })
    }

    pub const fn exact(n: u16) -> Self {
        Self {
            min: n as usize,
            max: Some(n as usize),
        }
    }

    pub const fn variadic(min: u16) -> Self {
        Self {
            min: min as usize,
            max: None,
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn accepts(&self, nargs: usize) -> bool {
        nargs >= self.min && self.max.map_or(true, |max| nargs <= max)
    }

    pub fn check(&self, nargs: usize) -> Result<()> {
        if self.accepts(nargs) {
            Ok(())
        } else {
            Err(Error::WrongArgCount {
                expected: self.to_string(),
                got: nargs,
            })
        }
    }

    /// Bounds in the form `make_function` takes.
    pub fn to_raw(&self) -> (isize, isize) {
        let bound = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
        let max = match self.max {
            Some(max) => bound(max),
            None => VARIADIC,
        };
        (bound(self.min), max)
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..", self.min),
        }
    }
}
