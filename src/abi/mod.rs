//! Host plugin ABI.
//!
//! Raw layouts from `emacs-module.h` plus the size thresholds that tell one
//! environment generation from the next.

pub mod raw;

pub use raw::*;

use std::mem::{offset_of, size_of};

/// Smallest runtime struct we can use.
pub const RUNTIME_SIZE: usize = size_of::<emacs_runtime>();

/// Environment generations, ordered by the functions they provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AbiVersion {
    Emacs25,
    Emacs26,
    Emacs27,
    Emacs28,
}

impl AbiVersion {
    /// Bytes of the env table this version guarantees.
    pub const fn env_size(self) -> usize {
        match self {
            AbiVersion::Emacs25 => offset_of!(emacs_env_28, should_quit),
            AbiVersion::Emacs26 => offset_of!(emacs_env_28, process_input),
            AbiVersion::Emacs27 => offset_of!(emacs_env_28, get_function_finalizer),
            AbiVersion::Emacs28 => size_of::<emacs_env_28>(),
        }
    }

    /// Newest version whose table fits in `size` bytes.
    pub fn from_env_size(size: isize) -> Option<Self> {
        let size = usize::try_from(size).ok()?;
        [
            AbiVersion::Emacs28,
            AbiVersion::Emacs27,
            AbiVersion::Emacs26,
            AbiVersion::Emacs25,
        ]
        .into_iter()
        .find(|v| size >= v.env_size())
    }
}

impl std::fmt::Display for AbiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let major = match self {
            AbiVersion::Emacs25 => 25,
            AbiVersion::Emacs26 => 26,
            AbiVersion::Emacs27 => 27,
            AbiVersion::Emacs28 => 28,
        };
        write!(f, "emacs-{}", major)
    }
}
