//! `#[repr(C)]` mirror of `emacs-module.h`.
//!
//! Field order matches the header exactly. Every entry is an `Option` so a
//! host (or a test double) may leave entries it does not provide null; the
//! `size` field tells which generation of the table is actually present.

#![allow(non_camel_case_types, non_upper_case_globals)]

use std::os::raw::{c_char, c_int, c_long, c_void};

/// Opaque host object.
#[repr(C)]
pub struct emacs_value_tag {
    _private: [u8; 0],
}

/// Handle to a host object, valid for the duration of the current call.
pub type emacs_value = *mut emacs_value_tag;

#[repr(C)]
pub struct emacs_runtime_private {
    _private: [u8; 0],
}

#[repr(C)]
pub struct emacs_env_private {
    _private: [u8; 0],
}

/// `max_arity` value for functions taking any number of arguments.
pub const emacs_variadic_function: isize = -2;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum emacs_funcall_exit {
    emacs_funcall_exit_return = 0,
    emacs_funcall_exit_signal = 1,
    emacs_funcall_exit_throw = 2,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum emacs_process_input_result {
    emacs_process_input_continue = 0,
    emacs_process_input_quit = 1,
}

pub type emacs_limb_t = usize;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct timespec {
    pub tv_sec: i64,
    pub tv_nsec: c_long,
}

/// Native function body as the host calls it.
pub type emacs_function = unsafe extern "C" fn(
    env: *mut emacs_env,
    nargs: isize,
    args: *mut emacs_value,
    data: *mut c_void,
) -> emacs_value;

/// Destructor for user pointers and function data.
pub type emacs_finalizer = unsafe extern "C" fn(data: *mut c_void);

#[repr(C)]
pub struct emacs_runtime {
    pub size: isize,
    pub private_members: *mut emacs_runtime_private,
    pub get_environment: Option<unsafe extern "C" fn(ert: *mut emacs_runtime) -> *mut emacs_env>,
}

/// The newest environment layout we know; older hosts report a smaller `size`.
pub type emacs_env = emacs_env_28;

#[repr(C)]
pub struct emacs_env_28 {
    pub size: isize,
    pub private_members: *mut emacs_env_private,

    // Emacs 25
    pub make_global_ref:
        Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> emacs_value>,
    pub free_global_ref: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value)>,
    pub non_local_exit_check: Option<unsafe extern "C" fn(env: *mut emacs_env) -> emacs_funcall_exit>,
    pub non_local_exit_clear: Option<unsafe extern "C" fn(env: *mut emacs_env)>,
    pub non_local_exit_get: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            symbol_out: *mut emacs_value,
            data_out: *mut emacs_value,
        ) -> emacs_funcall_exit,
    >,
    pub non_local_exit_signal:
        Option<unsafe extern "C" fn(env: *mut emacs_env, symbol: emacs_value, data: emacs_value)>,
    pub non_local_exit_throw:
        Option<unsafe extern "C" fn(env: *mut emacs_env, tag: emacs_value, value: emacs_value)>,
    pub make_function: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            min_arity: isize,
            max_arity: isize,
            function: Option<emacs_function>,
            documentation: *const c_char,
            data: *mut c_void,
        ) -> emacs_value,
    >,
    pub funcall: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            function: emacs_value,
            nargs: isize,
            args: *mut emacs_value,
        ) -> emacs_value,
    >,
    pub intern: Option<unsafe extern "C" fn(env: *mut emacs_env, name: *const c_char) -> emacs_value>,
    pub type_of: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> emacs_value>,
    pub is_not_nil: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> bool>,
    pub eq: Option<unsafe extern "C" fn(env: *mut emacs_env, a: emacs_value, b: emacs_value) -> bool>,
    pub extract_integer: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> i64>,
    pub make_integer: Option<unsafe extern "C" fn(env: *mut emacs_env, value: i64) -> emacs_value>,
    pub extract_float: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> f64>,
    pub make_float: Option<unsafe extern "C" fn(env: *mut emacs_env, value: f64) -> emacs_value>,
    pub copy_string_contents: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            value: emacs_value,
            buffer: *mut c_char,
            size_inout: *mut isize,
        ) -> bool,
    >,
    pub make_string: Option<
        unsafe extern "C" fn(env: *mut emacs_env, contents: *const c_char, length: isize) -> emacs_value,
    >,
    pub make_user_ptr: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            fin: Option<emacs_finalizer>,
            ptr: *mut c_void,
        ) -> emacs_value,
    >,
    pub get_user_ptr: Option<unsafe extern "C" fn(env: *mut emacs_env, uptr: emacs_value) -> *mut c_void>,
    pub set_user_ptr:
        Option<unsafe extern "C" fn(env: *mut emacs_env, uptr: emacs_value, ptr: *mut c_void)>,
    pub get_user_finalizer:
        Option<unsafe extern "C" fn(env: *mut emacs_env, uptr: emacs_value) -> Option<emacs_finalizer>>,
    pub set_user_finalizer: Option<
        unsafe extern "C" fn(env: *mut emacs_env, uptr: emacs_value, fin: Option<emacs_finalizer>),
    >,
    pub vec_get:
        Option<unsafe extern "C" fn(env: *mut emacs_env, vec: emacs_value, i: isize) -> emacs_value>,
    pub vec_set: Option<
        unsafe extern "C" fn(env: *mut emacs_env, vec: emacs_value, i: isize, value: emacs_value),
    >,
    pub vec_size: Option<unsafe extern "C" fn(env: *mut emacs_env, vec: emacs_value) -> isize>,

    // Emacs 26
    pub should_quit: Option<unsafe extern "C" fn(env: *mut emacs_env) -> bool>,

    // Emacs 27
    pub process_input: Option<unsafe extern "C" fn(env: *mut emacs_env) -> emacs_process_input_result>,
    pub extract_time: Option<unsafe extern "C" fn(env: *mut emacs_env, value: emacs_value) -> timespec>,
    pub make_time: Option<unsafe extern "C" fn(env: *mut emacs_env, time: timespec) -> emacs_value>,
    pub extract_big_integer: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            arg: emacs_value,
            sign: *mut c_int,
            count: *mut isize,
            magnitude: *mut emacs_limb_t,
        ) -> bool,
    >,
    pub make_big_integer: Option<
        unsafe extern "C" fn(
            env: *mut emacs_env,
            sign: c_int,
            count: isize,
            magnitude: *const emacs_limb_t,
        ) -> emacs_value,
    >,

    // Emacs 28
    pub get_function_finalizer:
        Option<unsafe extern "C" fn(env: *mut emacs_env, arg: emacs_value) -> Option<emacs_finalizer>>,
    pub set_function_finalizer: Option<
        unsafe extern "C" fn(env: *mut emacs_env, arg: emacs_value, fin: Option<emacs_finalizer>),
    >,
    pub open_channel: Option<unsafe extern "C" fn(env: *mut emacs_env, pipe_process: emacs_value) -> c_int>,
    pub make_interactive:
        Option<unsafe extern "C" fn(env: *mut emacs_env, function: emacs_value, spec: emacs_value)>,
    pub make_unibyte_string: Option<
        unsafe extern "C" fn(env: *mut emacs_env, contents: *const c_char, length: isize) -> emacs_value,
    >,
}
