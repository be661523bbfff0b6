//! In-process host double.
//!
//! Implements the env function table over a small object arena so the
//! binding layer can be exercised without a running editor. Objects live
//! until the host is dropped, at which point user-pointer and function
//! finalizers run, the way a garbage collector would run them.

use crate::abi::*;
use crate::env::Env;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::rc::Rc;
use std::{ptr, slice};

pub enum Obj {
    Symbol(String),
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    List(Vec<emacs_value>),
    Function {
        min: isize,
        max: isize,
        func: emacs_function,
        data: *mut c_void,
        finalizer: Option<emacs_finalizer>,
    },
    UserPtr {
        ptr: *mut c_void,
        finalizer: Option<emacs_finalizer>,
    },
}

struct Pending {
    kind: emacs_funcall_exit,
    symbol: emacs_value,
    data: emacs_value,
}

#[derive(Default)]
struct HostState {
    objects: Vec<Box<RefCell<Obj>>>,
    symbols: HashMap<String, emacs_value>,
    functions: HashMap<String, emacs_value>,
    pending: Option<Pending>,
}

enum Target {
    Named(String),
    Native {
        min: isize,
        max: isize,
        func: emacs_function,
        data: *mut c_void,
    },
    Invalid,
}

pub struct MockHost {
    env: emacs_env,
    runtime: emacs_runtime,
    state: RefCell<HostState>,
    check_arity: Cell<bool>,
    user_ptrs_finalized: Rc<Cell<usize>>,
}

fn obj<'a>(value: emacs_value) -> &'a RefCell<Obj> {
    // SAFETY: every value handed out is a pointer into the host arena.
    unsafe { &*(value as *const RefCell<Obj>) }
}

unsafe fn host<'a>(env: *mut emacs_env) -> &'a MockHost {
    &*((*env).private_members as *const MockHost)
}

impl MockHost {
    /// Host with the full Emacs 28 table.
    pub fn new() -> Box<Self> {
        Self::with_version(AbiVersion::Emacs28)
    }

    /// Host reporting the table size of `version`.
    pub fn with_version(version: AbiVersion) -> Box<Self> {
        let mut host = Box::new(MockHost {
            env: table(version),
            runtime: emacs_runtime {
                size: RUNTIME_SIZE as isize,
                private_members: ptr::null_mut(),
                get_environment: Some(get_environment),
            },
            state: RefCell::new(HostState::default()),
            check_arity: Cell::new(true),
            user_ptrs_finalized: Rc::new(Cell::new(0)),
        });
        let this: *mut MockHost = &mut *host;
        unsafe {
            (*this).env.private_members = this as *mut emacs_env_private;
            (*this).runtime.private_members = this as *mut emacs_runtime_private;
        }
        host
    }

    pub fn env_ptr(&self) -> *mut emacs_env {
        ptr::addr_of!(self.env) as *mut emacs_env
    }

    pub fn runtime_ptr(&self) -> *mut emacs_runtime {
        ptr::addr_of!(self.runtime) as *mut emacs_runtime
    }

    /// Execution context for a test body.
    pub fn env(&self) -> Env {
        unsafe { Env::from_raw(self.env_ptr()) }.expect("mock env is valid")
    }

    /// Let calls through regardless of declared arity.
    pub fn skip_arity_check(&self) {
        self.check_arity.set(false);
    }

    /// Name of the pending signal symbol, if any.
    pub fn pending_signal(&self) -> Option<String> {
        let state = self.state.borrow();
        let pending = state.pending.as_ref()?;
        match &*obj(pending.symbol).borrow() {
            Obj::Symbol(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// First string in the pending signal's data.
    pub fn pending_message(&self) -> Option<String> {
        let state = self.state.borrow();
        let pending = state.pending.as_ref()?;
        let first = match &*obj(pending.data).borrow() {
            Obj::List(items) => *items.first()?,
            _ => return None,
        };
        let message = match &*obj(first).borrow() {
            Obj::Str(bytes) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        };
        message
    }

    /// Count of user-pointer finalizers run so far; outlives the host.
    pub fn user_ptr_finalizations(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.user_ptrs_finalized)
    }

    pub fn clear_pending(&self) {
        self.state.borrow_mut().pending = None;
    }

    pub fn is_fbound(&self, name: &str) -> bool {
        self.state.borrow().functions.contains_key(name)
    }

    fn alloc(&self, value: Obj) -> emacs_value {
        let cell = Box::new(RefCell::new(value));
        let raw = &*cell as *const RefCell<Obj> as emacs_value;
        self.state.borrow_mut().objects.push(cell);
        raw
    }

    fn intern(&self, name: &str) -> emacs_value {
        if let Some(symbol) = self.state.borrow().symbols.get(name) {
            return *symbol;
        }
        let symbol = self.alloc(Obj::Symbol(name.to_string()));
        self.state
            .borrow_mut()
            .symbols
            .insert(name.to_string(), symbol);
        symbol
    }

    fn nil(&self) -> emacs_value {
        self.intern("nil")
    }

    fn has_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    fn set_pending(&self, kind: emacs_funcall_exit, symbol: emacs_value, data: emacs_value) {
        let mut state = self.state.borrow_mut();
        if state.pending.is_none() {
            state.pending = Some(Pending { kind, symbol, data });
        }
    }

    fn signal(&self, symbol: &str, data: Vec<emacs_value>) -> emacs_value {
        let symbol = self.intern(symbol);
        let data = self.alloc(Obj::List(data));
        self.set_pending(emacs_funcall_exit::emacs_funcall_exit_signal, symbol, data);
        self.nil()
    }

    fn wrong_type(&self, predicate: &str, value: emacs_value) -> emacs_value {
        let predicate = self.intern(predicate);
        self.signal("wrong-type-argument", vec![predicate, value])
    }

    unsafe fn apply(
        &self,
        env: *mut emacs_env,
        function: emacs_value,
        mut args: Vec<emacs_value>,
    ) -> emacs_value {
        let target = match &*obj(function).borrow() {
            Obj::Symbol(name) => Target::Named(name.clone()),
            Obj::Function {
                min,
                max,
                func,
                data,
                ..
            } => Target::Native {
                min: *min,
                max: *max,
                func: *func,
                data: *data,
            },
            _ => Target::Invalid,
        };

        match target {
            Target::Named(name) => match name.as_str() {
                "fset" => self.fset(args),
                "list" => self.alloc(Obj::List(args)),
                _ => {
                    let cell = self.state.borrow().functions.get(&name).copied();
                    match cell {
                        Some(definition) => self.apply(env, definition, args),
                        None => self.signal("void-function", vec![function]),
                    }
                }
            },
            Target::Native {
                min,
                max,
                func,
                data,
            } => {
                let nargs = args.len() as isize;
                let fits = nargs >= min && (max == emacs_variadic_function || nargs <= max);
                if self.check_arity.get() && !fits {
                    let count = self.alloc(Obj::Int(nargs as i64));
                    return self.signal("wrong-number-of-arguments", vec![function, count]);
                }
                let out = func(env, nargs, args.as_mut_ptr(), data);
                if self.has_pending() {
                    self.nil()
                } else if out.is_null() {
                    // null result with nothing pending
                    let message =
                        self.alloc(Obj::Str(b"native function returned no value".to_vec()));
                    self.signal("error", vec![message])
                } else {
                    out
                }
            }
            Target::Invalid => self.signal("invalid-function", vec![function]),
        }
    }

    fn fset(&self, args: Vec<emacs_value>) -> emacs_value {
        if args.len() != 2 {
            let count = self.alloc(Obj::Int(args.len() as i64));
            let fset = self.intern("fset");
            return self.signal("wrong-number-of-arguments", vec![fset, count]);
        }
        let name = match &*obj(args[0]).borrow() {
            Obj::Symbol(name) => Some(name.clone()),
            _ => None,
        };
        match name {
            Some(name) => {
                self.state.borrow_mut().functions.insert(name, args[1]);
                args[1]
            }
            None => self.wrong_type("symbolp", args[0]),
        }
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        let objects = std::mem::take(&mut self.state.get_mut().objects);
        for object in &objects {
            match &*object.borrow() {
                Obj::Function {
                    data,
                    finalizer: Some(fin),
                    ..
                } => unsafe { fin(*data) },
                Obj::UserPtr {
                    ptr,
                    finalizer: Some(fin),
                } => {
                    unsafe { fin(*ptr) };
                    self.user_ptrs_finalized.set(self.user_ptrs_finalized.get() + 1);
                }
                _ => {}
            }
        }
    }
}

fn table(version: AbiVersion) -> emacs_env {
    let emacs28 = version >= AbiVersion::Emacs28;
    emacs_env {
        size: version.env_size() as isize,
        private_members: ptr::null_mut(),
        make_global_ref: Some(make_global_ref),
        free_global_ref: Some(free_global_ref),
        non_local_exit_check: Some(non_local_exit_check),
        non_local_exit_clear: Some(non_local_exit_clear),
        non_local_exit_get: Some(non_local_exit_get),
        non_local_exit_signal: Some(non_local_exit_signal),
        non_local_exit_throw: Some(non_local_exit_throw),
        make_function: Some(make_function),
        funcall: Some(funcall),
        intern: Some(intern),
        type_of: Some(type_of),
        is_not_nil: Some(is_not_nil),
        eq: Some(eq),
        extract_integer: Some(extract_integer),
        make_integer: Some(make_integer),
        extract_float: Some(extract_float),
        make_float: Some(make_float),
        copy_string_contents: Some(copy_string_contents),
        make_string: Some(make_string),
        make_user_ptr: Some(make_user_ptr),
        get_user_ptr: Some(get_user_ptr),
        set_user_ptr: Some(set_user_ptr),
        get_user_finalizer: Some(get_user_finalizer),
        set_user_finalizer: Some(set_user_finalizer),
        vec_get: None,
        vec_set: None,
        vec_size: None,
        should_quit: Some(should_quit),
        process_input: None,
        extract_time: None,
        make_time: None,
        extract_big_integer: None,
        make_big_integer: None,
        get_function_finalizer: if emacs28 {
            Some(get_function_finalizer)
        } else {
            None
        },
        set_function_finalizer: if emacs28 {
            Some(set_function_finalizer)
        } else {
            None
        },
        open_channel: None,
        make_interactive: None,
        make_unibyte_string: None,
    }
}

unsafe extern "C" fn get_environment(ert: *mut emacs_runtime) -> *mut emacs_env {
    let host = &*((*ert).private_members as *const MockHost);
    host.env_ptr()
}

unsafe extern "C" fn make_global_ref(_env: *mut emacs_env, value: emacs_value) -> emacs_value {
    value
}

unsafe extern "C" fn free_global_ref(_env: *mut emacs_env, _value: emacs_value) {}

unsafe extern "C" fn non_local_exit_check(env: *mut emacs_env) -> emacs_funcall_exit {
    host(env)
        .state
        .borrow()
        .pending
        .as_ref()
        .map_or(emacs_funcall_exit::emacs_funcall_exit_return, |p| p.kind)
}

unsafe extern "C" fn non_local_exit_clear(env: *mut emacs_env) {
    host(env).clear_pending();
}

unsafe extern "C" fn non_local_exit_get(
    env: *mut emacs_env,
    symbol_out: *mut emacs_value,
    data_out: *mut emacs_value,
) -> emacs_funcall_exit {
    match host(env).state.borrow().pending.as_ref() {
        Some(pending) => {
            *symbol_out = pending.symbol;
            *data_out = pending.data;
            pending.kind
        }
        None => emacs_funcall_exit::emacs_funcall_exit_return,
    }
}

unsafe extern "C" fn non_local_exit_signal(
    env: *mut emacs_env,
    symbol: emacs_value,
    data: emacs_value,
) {
    host(env).set_pending(emacs_funcall_exit::emacs_funcall_exit_signal, symbol, data);
}

unsafe extern "C" fn non_local_exit_throw(env: *mut emacs_env, tag: emacs_value, value: emacs_value) {
    host(env).set_pending(emacs_funcall_exit::emacs_funcall_exit_throw, tag, value);
}

unsafe extern "C" fn make_function(
    env: *mut emacs_env,
    min_arity: isize,
    max_arity: isize,
    function: Option<emacs_function>,
    _documentation: *const c_char,
    data: *mut c_void,
) -> emacs_value {
    let host = host(env);
    match function {
        Some(func) => host.alloc(Obj::Function {
            min: min_arity,
            max: max_arity,
            func,
            data,
            finalizer: None,
        }),
        None => host.signal("error", Vec::new()),
    }
}

unsafe extern "C" fn funcall(
    env: *mut emacs_env,
    function: emacs_value,
    nargs: isize,
    args: *mut emacs_value,
) -> emacs_value {
    let host = host(env);
    if host.has_pending() {
        return host.nil();
    }
    let args = if nargs > 0 && !args.is_null() {
        slice::from_raw_parts(args, nargs as usize).to_vec()
    } else {
        Vec::new()
    };
    host.apply(env, function, args)
}

unsafe extern "C" fn intern(env: *mut emacs_env, name: *const c_char) -> emacs_value {
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    host(env).intern(&name)
}

unsafe extern "C" fn type_of(env: *mut emacs_env, value: emacs_value) -> emacs_value {
    let name = match &*obj(value).borrow() {
        Obj::Symbol(_) => "symbol",
        Obj::Int(_) => "integer",
        Obj::Float(_) => "float",
        Obj::Str(_) => "string",
        Obj::List(_) => "cons",
        Obj::Function { .. } => "module-function",
        Obj::UserPtr { .. } => "user-ptr",
    };
    host(env).intern(name)
}

unsafe extern "C" fn is_not_nil(env: *mut emacs_env, value: emacs_value) -> bool {
    value != host(env).nil()
}

unsafe extern "C" fn eq(_env: *mut emacs_env, a: emacs_value, b: emacs_value) -> bool {
    if a == b {
        return true;
    }
    matches!(
        (&*obj(a).borrow(), &*obj(b).borrow()),
        (Obj::Int(x), Obj::Int(y)) if x == y
    )
}

unsafe extern "C" fn extract_integer(env: *mut emacs_env, value: emacs_value) -> i64 {
    let n = match &*obj(value).borrow() {
        Obj::Int(n) => Some(*n),
        _ => None,
    };
    n.unwrap_or_else(|| {
        host(env).wrong_type("integerp", value);
        0
    })
}

unsafe extern "C" fn make_integer(env: *mut emacs_env, value: i64) -> emacs_value {
    host(env).alloc(Obj::Int(value))
}

unsafe extern "C" fn extract_float(env: *mut emacs_env, value: emacs_value) -> f64 {
    let f = match &*obj(value).borrow() {
        Obj::Float(f) => Some(*f),
        _ => None,
    };
    f.unwrap_or_else(|| {
        host(env).wrong_type("floatp", value);
        0.0
    })
}

unsafe extern "C" fn make_float(env: *mut emacs_env, value: f64) -> emacs_value {
    host(env).alloc(Obj::Float(value))
}

unsafe extern "C" fn copy_string_contents(
    env: *mut emacs_env,
    value: emacs_value,
    buffer: *mut c_char,
    size_inout: *mut isize,
) -> bool {
    let bytes = match &*obj(value).borrow() {
        Obj::Str(bytes) => Some(bytes.clone()),
        _ => None,
    };
    let Some(bytes) = bytes else {
        host(env).wrong_type("stringp", value);
        return false;
    };
    let required = bytes.len() as isize + 1;
    if buffer.is_null() {
        *size_inout = required;
        return true;
    }
    if *size_inout < required {
        *size_inout = required;
        host(env).signal("args-out-of-range", Vec::new());
        return false;
    }
    ptr::copy_nonoverlapping(bytes.as_ptr(), buffer as *mut u8, bytes.len());
    *buffer.add(bytes.len()) = 0;
    *size_inout = required;
    true
}

unsafe extern "C" fn make_string(
    env: *mut emacs_env,
    contents: *const c_char,
    length: isize,
) -> emacs_value {
    let bytes = if length > 0 {
        slice::from_raw_parts(contents as *const u8, length as usize).to_vec()
    } else {
        Vec::new()
    };
    host(env).alloc(Obj::Str(bytes))
}

unsafe extern "C" fn make_user_ptr(
    env: *mut emacs_env,
    fin: Option<emacs_finalizer>,
    ptr: *mut c_void,
) -> emacs_value {
    host(env).alloc(Obj::UserPtr { ptr, finalizer: fin })
}

unsafe extern "C" fn get_user_ptr(env: *mut emacs_env, uptr: emacs_value) -> *mut c_void {
    let ptr = match &*obj(uptr).borrow() {
        Obj::UserPtr { ptr, .. } => Some(*ptr),
        _ => None,
    };
    ptr.unwrap_or_else(|| {
        host(env).wrong_type("user-ptrp", uptr);
        ptr::null_mut()
    })
}

unsafe extern "C" fn set_user_ptr(env: *mut emacs_env, uptr: emacs_value, new_ptr: *mut c_void) {
    let updated = match &mut *obj(uptr).borrow_mut() {
        Obj::UserPtr { ptr, .. } => {
            *ptr = new_ptr;
            true
        }
        _ => false,
    };
    if !updated {
        host(env).wrong_type("user-ptrp", uptr);
    }
}

unsafe extern "C" fn get_user_finalizer(
    env: *mut emacs_env,
    uptr: emacs_value,
) -> Option<emacs_finalizer> {
    let fin = match &*obj(uptr).borrow() {
        Obj::UserPtr { finalizer, .. } => Ok(*finalizer),
        _ => Err(()),
    };
    fin.unwrap_or_else(|()| {
        host(env).wrong_type("user-ptrp", uptr);
        None
    })
}

unsafe extern "C" fn set_user_finalizer(
    env: *mut emacs_env,
    uptr: emacs_value,
    fin: Option<emacs_finalizer>,
) {
    let updated = match &mut *obj(uptr).borrow_mut() {
        Obj::UserPtr { finalizer, .. } => {
            *finalizer = fin;
            true
        }
        _ => false,
    };
    if !updated {
        host(env).wrong_type("user-ptrp", uptr);
    }
}

unsafe extern "C" fn should_quit(_env: *mut emacs_env) -> bool {
    false
}

unsafe extern "C" fn get_function_finalizer(
    env: *mut emacs_env,
    function: emacs_value,
) -> Option<emacs_finalizer> {
    let fin = match &*obj(function).borrow() {
        Obj::Function { finalizer, .. } => Ok(*finalizer),
        _ => Err(()),
    };
    fin.unwrap_or_else(|()| {
        host(env).wrong_type("module-function-p", function);
        None
    })
}

unsafe extern "C" fn set_function_finalizer(
    env: *mut emacs_env,
    function: emacs_value,
    fin: Option<emacs_finalizer>,
) {
    let updated = match &mut *obj(function).borrow_mut() {
        Obj::Function { finalizer, .. } => {
            *finalizer = fin;
            true
        }
        _ => false,
    };
    if !updated {
        host(env).wrong_type("module-function-p", function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fset_and_call_by_name() {
        let host = MockHost::new();
        let env = host.env();
        let list = env.intern("list").unwrap();
        let name = env.intern("my-list").unwrap();
        env.call("fset", &[name, list]).unwrap();
        assert!(host.is_fbound("my-list"));
        let out = env.call("my-list", &[]).unwrap();
        assert!(env.eq(env.type_of(out).unwrap(), env.intern("cons").unwrap()).unwrap());
    }

    #[test]
    fn test_null_result_without_exit_signals() {
        unsafe extern "C" fn silent(
            _env: *mut emacs_env,
            _nargs: isize,
            _args: *mut emacs_value,
            _data: *mut c_void,
        ) -> emacs_value {
            ptr::null_mut()
        }

        let host = MockHost::new();
        let env = host.env();
        let doc = std::ffi::CString::new("").unwrap();
        let f = unsafe { env.make_function(silent, 0, 0, &doc, ptr::null_mut()) }.unwrap();
        assert!(env.funcall(f, &[]).is_err());
        assert_eq!(host.pending_signal().as_deref(), Some("error"));
        assert_eq!(
            host.pending_message().as_deref(),
            Some("native function returned no value")
        );
    }

    #[test]
    fn test_void_function() {
        let host = MockHost::new();
        let env = host.env();
        assert!(env.call("no-such-function", &[]).is_err());
        assert_eq!(host.pending_signal().as_deref(), Some("void-function"));
        host.clear_pending();
        assert!(env.check_exit().is_ok());
    }
}
