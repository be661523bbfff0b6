//! Plain native functions exposed by the sample module.

use crate::core::{Error, Result};

/// Line printed by [`nullary_void_fn`].
pub const GREETING: &str = "Hello Elisp";

/// Print the greeting to the host's console.
pub fn nullary_void_fn() {
    println!("{}", GREETING);
}

/// Twice `i`, or `IntegerOverflow` when that does not fit an `i64`.
pub fn double_int(i: i64) -> Result<i64> {
    i.checked_mul(2)
        .ok_or_else(|| Error::IntegerOverflow(format!("2 * {}", i)))
}
