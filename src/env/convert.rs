//! Marshaling between native values and host values.
//!
//! Arguments are positional. Extracting the wrong kind lets the host raise
//! `wrong-type-argument`, which comes back here as `Error::NonLocalExit`.

use crate::core::{Error, Result};
use crate::env::{Env, Value};

/// Native → host.
pub trait IntoLisp<'e> {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>>;
}

/// Host → native.
pub trait FromLisp<'e>: Sized {
    fn from_lisp(value: Value<'e>) -> Result<Self>;
}

impl<'e> IntoLisp<'e> for Value<'e> {
    fn into_lisp(self, _env: &'e Env) -> Result<Value<'e>> {
        Ok(self)
    }
}

impl<'e> FromLisp<'e> for Value<'e> {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        Ok(value)
    }
}

impl<'e> IntoLisp<'e> for () {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        env.nil()
    }
}

impl<'e> IntoLisp<'e> for bool {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        if self {
            env.t()
        } else {
            env.nil()
        }
    }
}

impl<'e> FromLisp<'e> for bool {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        value.is_not_nil()
    }
}

impl<'e> IntoLisp<'e> for i64 {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        env.make_integer(self)
    }
}

impl<'e> FromLisp<'e> for i64 {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        value.env().extract_integer(value)
    }
}

macro_rules! int_via_i64 {
    ($($t:ty),*) => {$(
        impl<'e> IntoLisp<'e> for $t {
            fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
                let n = i64::try_from(self)
                    .map_err(|_| Error::IntegerOverflow(format!("{} does not fit a host integer", self)))?;
                env.make_integer(n)
            }
        }

        impl<'e> FromLisp<'e> for $t {
            fn from_lisp(value: Value<'e>) -> Result<Self> {
                let n = i64::from_lisp(value)?;
                <$t>::try_from(n).map_err(|_| {
                    Error::IntegerOverflow(format!("{} out of range for {}", n, stringify!($t)))
                })
            }
        }
    )*};
}

int_via_i64!(i8, i16, i32, isize, u8, u16, u32, u64, usize);

impl<'e> IntoLisp<'e> for f64 {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        env.make_float(self)
    }
}

impl<'e> FromLisp<'e> for f64 {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        value.env().extract_float(value)
    }
}

impl<'e> IntoLisp<'e> for &str {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        env.make_string(self)
    }
}

impl<'e> IntoLisp<'e> for String {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        env.make_string(&self)
    }
}

impl<'e> FromLisp<'e> for String {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        value.env().copy_string(value)
    }
}

impl<'e, T: IntoLisp<'e>> IntoLisp<'e> for Option<T> {
    fn into_lisp(self, env: &'e Env) -> Result<Value<'e>> {
        match self {
            Some(v) => v.into_lisp(env),
            None => env.nil(),
        }
    }
}

impl<'e, T: FromLisp<'e>> FromLisp<'e> for Option<T> {
    fn from_lisp(value: Value<'e>) -> Result<Self> {
        if value.is_nil()? {
            Ok(None)
        } else {
            T::from_lisp(value).map(Some)
        }
    }
}
