//! Safe wrapper over the host execution context.
//!
//! An `Env` is built fresh on the stack of every entry from the host (module
//! load, each native call) and handed down by reference. It is neither `Send`
//! nor `Sync`, and nothing stores it beyond the call that produced it.

use crate::abi::{
    emacs_env, emacs_finalizer, emacs_function, emacs_funcall_exit, emacs_runtime, emacs_value,
    AbiVersion, RUNTIME_SIZE,
};
use crate::core::{Error, Result};
use crate::env::Value;
use std::any::Any;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr::{self, NonNull};
use tracing::warn;

/// Fetch an entry of the env table.
macro_rules! raw_fn {
    ($env:expr, $name:ident) => {
        // SAFETY: the table is live for the current call and every entry read
        // this way lies inside the Emacs 25 prefix or was version-checked.
        unsafe { (*$env.raw()).$name }.ok_or(Error::MissingEntry(stringify!($name)))
    };
}

/// Call an entry of the env table, then surface any pending non-local exit.
macro_rules! raw_call {
    ($env:expr, $name:ident $(, $arg:expr)* $(,)?) => {{
        let f = raw_fn!($env, $name)?;
        // SAFETY: arguments are host values from this env or plain data.
        let out = unsafe { f($env.raw() $(, $arg)*) };
        $env.check_exit().map(|()| out)
    }};
}

/// Kind of non-local exit left pending by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitKind {
    /// `signal` (an error condition)
    Signal,
    /// `throw` to a catch tag
    Throw,
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Signal => write!(f, "signal"),
            ExitKind::Throw => write!(f, "throw"),
        }
    }
}

/// Marks a `UserBox` as ours; read before the value is downcast.
const USER_BOX_TAG: u64 = 0x6479_6d6f_645f_7570;

/// Heap cell behind every user pointer we create.
#[repr(C)]
struct UserBox {
    tag: u64,
    value: Box<dyn Any>,
}

unsafe extern "C" fn finalize_user_box(ptr: *mut c_void) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr as *mut UserBox));
    }
}

/// Execution context for one entry from the host.
pub struct Env {
    raw: NonNull<emacs_env>,
    version: AbiVersion,
}

impl Env {
    /// Wrap a raw env pointer.
    ///
    /// # Safety
    /// `raw` must be null or an env the host handed us for the call in
    /// progress, and the returned `Env` must not outlive that call.
    pub unsafe fn from_raw(raw: *mut emacs_env) -> Result<Self> {
        let raw = NonNull::new(raw).ok_or(Error::MissingEntry("environment"))?;
        let size = raw.as_ref().size;
        let version = AbiVersion::from_env_size(size).ok_or(Error::IncompatibleEnv {
            size,
            required: AbiVersion::Emacs25.env_size(),
        })?;
        Ok(Self { raw, version })
    }

    /// Obtain the env from the runtime passed to the load entry point.
    ///
    /// # Safety
    /// `runtime` must be null or the live runtime given to module init.
    pub unsafe fn from_runtime(runtime: *mut emacs_runtime) -> Result<Self> {
        if runtime.is_null() {
            return Err(Error::IncompatibleRuntime {
                size: 0,
                required: RUNTIME_SIZE,
            });
        }
        let size = (*runtime).size;
        if size < RUNTIME_SIZE as isize {
            return Err(Error::IncompatibleRuntime {
                size,
                required: RUNTIME_SIZE,
            });
        }
        let get_environment = (*runtime)
            .get_environment
            .ok_or(Error::MissingEntry("get_environment"))?;
        Self::from_raw(get_environment(runtime))
    }

    pub fn raw(&self) -> *mut emacs_env {
        self.raw.as_ptr()
    }

    pub fn version(&self) -> AbiVersion {
        self.version
    }

    fn require(&self, version: AbiVersion, entry: &'static str) -> Result<()> {
        if self.version >= version {
            Ok(())
        } else {
            Err(Error::MissingEntry(entry))
        }
    }

    /// `Err(NonLocalExit)` when the host has a signal or throw pending.
    ///
    /// The exit is left in place so it propagates once we return to the host.
    pub fn check_exit(&self) -> Result<()> {
        let check = raw_fn!(self, non_local_exit_check)?;
        // SAFETY: live env for this call.
        match unsafe { check(self.raw()) } {
            emacs_funcall_exit::emacs_funcall_exit_return => Ok(()),
            emacs_funcall_exit::emacs_funcall_exit_signal => {
                Err(Error::NonLocalExit(ExitKind::Signal))
            }
            emacs_funcall_exit::emacs_funcall_exit_throw => {
                Err(Error::NonLocalExit(ExitKind::Throw))
            }
        }
    }

    /// Wrap a raw value produced by this env.
    ///
    /// # Safety
    /// `raw` must be a value handed out by this env during the current call.
    pub unsafe fn value(&self, raw: emacs_value) -> Value<'_> {
        Value::new(raw, self)
    }

    // Symbols and calls

    pub fn intern(&self, name: &str) -> Result<Value<'_>> {
        let name = CString::new(name)?;
        let raw = raw_call!(self, intern, name.as_ptr())?;
        Ok(unsafe { self.value(raw) })
    }

    pub fn nil(&self) -> Result<Value<'_>> {
        self.intern("nil")
    }

    pub fn t(&self) -> Result<Value<'_>> {
        self.intern("t")
    }

    /// Call `function` (a function value or a symbol) with positional args.
    pub fn funcall<'e>(&'e self, function: Value<'e>, args: &[Value<'e>]) -> Result<Value<'e>> {
        let mut raw_args: Vec<emacs_value> = args.iter().map(|v| v.raw()).collect();
        let raw = raw_call!(
            self,
            funcall,
            function.raw(),
            raw_args.len() as isize,
            raw_args.as_mut_ptr()
        )?;
        Ok(unsafe { self.value(raw) })
    }

    /// Call the function bound to `name`.
    pub fn call<'e>(&'e self, name: &str, args: &[Value<'e>]) -> Result<Value<'e>> {
        let symbol = self.intern(name)?;
        self.funcall(symbol, args)
    }

    // Predicates

    pub fn is_not_nil(&self, value: Value<'_>) -> Result<bool> {
        raw_call!(self, is_not_nil, value.raw())
    }

    pub fn eq(&self, a: Value<'_>, b: Value<'_>) -> Result<bool> {
        raw_call!(self, eq, a.raw(), b.raw())
    }

    /// Type symbol of a value, e.g. `integer` or `user-ptr`.
    pub fn type_of<'e>(&'e self, value: Value<'e>) -> Result<Value<'e>> {
        let raw = raw_call!(self, type_of, value.raw())?;
        Ok(unsafe { self.value(raw) })
    }

    // Numbers

    pub fn make_integer(&self, value: i64) -> Result<Value<'_>> {
        let raw = raw_call!(self, make_integer, value)?;
        Ok(unsafe { self.value(raw) })
    }

    pub fn extract_integer(&self, value: Value<'_>) -> Result<i64> {
        raw_call!(self, extract_integer, value.raw())
    }

    pub fn make_float(&self, value: f64) -> Result<Value<'_>> {
        let raw = raw_call!(self, make_float, value)?;
        Ok(unsafe { self.value(raw) })
    }

    pub fn extract_float(&self, value: Value<'_>) -> Result<f64> {
        raw_call!(self, extract_float, value.raw())
    }

    // Strings

    pub fn make_string(&self, contents: &str) -> Result<Value<'_>> {
        let raw = raw_call!(
            self,
            make_string,
            contents.as_ptr() as *const c_char,
            contents.len() as isize
        )?;
        Ok(unsafe { self.value(raw) })
    }

    /// Copy a host string out as UTF-8.
    pub fn copy_string(&self, value: Value<'_>) -> Result<String> {
        let mut len: isize = 0;
        let sized = raw_call!(
            self,
            copy_string_contents,
            value.raw(),
            ptr::null_mut(),
            &mut len
        )?;
        if !sized || len <= 0 {
            return Err(Error::WrongType("string"));
        }

        let mut buffer = vec![0u8; len as usize];
        let copied = raw_call!(
            self,
            copy_string_contents,
            value.raw(),
            buffer.as_mut_ptr() as *mut c_char,
            &mut len
        )?;
        if !copied {
            return Err(Error::WrongType("string"));
        }
        // drop the trailing NUL
        buffer.truncate((len as usize).saturating_sub(1));
        Ok(String::from_utf8(buffer)?)
    }

    // User pointers

    /// Hand `value` to the host as a `user-ptr` it finalizes.
    pub fn make_user_ptr<T: 'static>(&self, value: T) -> Result<Value<'_>> {
        let cell = Box::into_raw(Box::new(UserBox {
            tag: USER_BOX_TAG,
            value: Box::new(RefCell::new(value)),
        }));
        match raw_call!(
            self,
            make_user_ptr,
            Some(finalize_user_box as emacs_finalizer),
            cell as *mut c_void
        ) {
            Ok(raw) => Ok(unsafe { self.value(raw) }),
            Err(err) => {
                // the host never took ownership
                drop(unsafe { Box::from_raw(cell) });
                Err(err)
            }
        }
    }

    /// Borrow the native value behind a `user-ptr` made by `make_user_ptr`.
    pub fn user_ref<'e, T: 'static>(&'e self, value: Value<'e>) -> Result<&'e RefCell<T>> {
        let finalizer = raw_call!(self, get_user_finalizer, value.raw())?;
        if finalizer.map(|f| f as usize) != Some(finalize_user_box as emacs_finalizer as usize) {
            return Err(Error::WrongType("dymod user-ptr"));
        }
        let ptr = raw_call!(self, get_user_ptr, value.raw())?;
        if ptr.is_null() {
            return Err(Error::WrongType("dymod user-ptr"));
        }
        // SAFETY: our finalizer on it means the pointer is a live UserBox
        // owned by the host object, which outlives this call.
        let cell = unsafe { &*(ptr as *const UserBox) };
        if cell.tag != USER_BOX_TAG {
            return Err(Error::WrongType("dymod user-ptr"));
        }
        cell.value
            .downcast_ref::<RefCell<T>>()
            .ok_or(Error::WrongType(std::any::type_name::<T>()))
    }

    // Functions

    /// Create a host function value.
    ///
    /// # Safety
    /// `data` must stay valid for as long as the host may call `function`.
    pub unsafe fn make_function(
        &self,
        function: emacs_function,
        min_arity: isize,
        max_arity: isize,
        doc: &CStr,
        data: *mut c_void,
    ) -> Result<Value<'_>> {
        let raw = raw_call!(
            self,
            make_function,
            min_arity,
            max_arity,
            Some(function),
            doc.as_ptr(),
            data
        )?;
        Ok(self.value(raw))
    }

    /// Attach a finalizer run when the host frees `function`.
    ///
    /// Returns `false` on hosts older than Emacs 28, which cannot do this.
    pub fn set_function_finalizer(
        &self,
        function: Value<'_>,
        finalizer: emacs_finalizer,
    ) -> Result<bool> {
        if self
            .require(AbiVersion::Emacs28, "set_function_finalizer")
            .is_err()
        {
            return Ok(false);
        }
        raw_call!(self, set_function_finalizer, function.raw(), Some(finalizer))?;
        Ok(true)
    }

    // Signals

    /// Leave a signal pending in the host: `(signal SYMBOL DATA)`.
    pub fn signal(&self, symbol: &str, data: &[Value<'_>]) -> Result<()> {
        let symbol = self.intern(symbol)?;
        let list = self.intern("list")?;
        let data = self.funcall(list, data)?;
        let signal = raw_fn!(self, non_local_exit_signal)?;
        // SAFETY: both values belong to this env.
        unsafe { signal(self.raw(), symbol.raw(), data.raw()) };
        Ok(())
    }

    /// Report a native error to the host as a signal.
    ///
    /// A host exit already pending is left as is. A `NonLocalExit` with
    /// nothing pending is reported as a plain `error`.
    pub fn signal_error(&self, err: &Error) {
        if let Err(Error::NonLocalExit(_)) = self.check_exit() {
            return;
        }
        let reported = self
            .make_string(&err.to_string())
            .and_then(|message| self.signal(err.signal_symbol(), &[message]));
        if let Err(e) = reported {
            warn!(error = %e, original = %err, "could not signal native error to host");
        }
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("raw", &self.raw)
            .field("version", &self.version)
            .finish()
    }
}
