// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{
    cell::RefCell,
    fmt,
    io::{self, Write},
    rc::{Rc, Weak},
};

use fnv::FnvHashMap;
use tracing::debug;

use crate::{
    error::{EvalError, EvalResult},
    promise::{BinaryOperator, Expression, Iter, LazyCall, Promise, Symbol},
    stdlib::builtin_globals,
    value::Value,
};

/// Name-to-binding mapping for an evaluation session.
///
/// Ordinary lookups via [`Env::read`] never fail: names other than the registered built-ins
/// produce a [`Symbol`] that is only looked up when resolved. The stored binding itself is
/// reachable through [`Env::resolve_binding`].
///
/// `Env` is a cheaply-cloneable handle: clones share the same bindings. Deferred values keep a
/// weak back-reference to the environment they were created in.
#[derive(Clone)]
pub struct Env {
    state: Rc<EnvState>,
}
struct EnvState {
    bindings: RefCell<FnvHashMap<String, Value>>,
    builtins: FnvHashMap<&'static str, Value>,
    output: RefCell<Box<dyn Write>>,
    options: EnvOptions,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct EnvOptions {
    /// Print integers with their digits reversed (`print(10)` writes `01`)
    pub reverse_print: bool,
}

impl Env {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
    /// Creates an environment whose `print` built-in writes to the given sink.
    pub fn with_output(output: impl Write + 'static) -> Self {
        Self::with_options(output, EnvOptions::default())
    }
    pub fn with_options(output: impl Write + 'static, options: EnvOptions) -> Self {
        Self {
            state: Rc::new(EnvState {
                bindings: RefCell::new(FnvHashMap::default()),
                builtins: builtin_globals().collect(),
                output: RefCell::new(Box::new(output)),
                options,
            }),
        }
    }
    pub fn options(&self) -> EnvOptions {
        self.state.options
    }
    pub fn read(&self, name: &str) -> Value {
        match self.state.builtins.get(name) {
            Some(value) => value.clone(),
            None => Value::Deferred(self.symbol(name)),
        }
    }
    pub fn write(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        debug!(name = %name, value = ?value, "bind");
        self.state.bindings.borrow_mut().insert(name, value);
    }
    pub fn resolve_binding(&self, name: &str) -> EvalResult<Value> {
        self.state
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::NameNotBound(String::from(name)))
    }
    pub fn is_bound(&self, name: &str) -> bool {
        self.state.bindings.borrow().contains_key(name)
    }
    pub fn is_builtin(&self, name: &str) -> bool {
        self.state.builtins.contains_key(name)
    }
    pub fn symbol(&self, name: &str) -> Promise {
        Promise::Symbol(Symbol::new(self.downgrade(), name))
    }
    pub fn expression(
        &self,
        operator: BinaryOperator,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Promise {
        Promise::Expression(Rc::new(Expression::new(
            self.downgrade(),
            operator,
            left.into(),
            right.into(),
        )))
    }
    pub fn call(
        &self,
        function: impl Into<Value>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Promise {
        Promise::Call(Rc::new(LazyCall::new(
            self.downgrade(),
            function.into(),
            args,
            kwargs,
        )))
    }
    pub fn append(&self, head: impl Into<Value>, tail: impl Into<Value>) -> Promise {
        Promise::Sequence(Rc::new(Iter::new(
            self.downgrade(),
            head.into(),
            tail.into(),
        )))
    }
    pub fn downgrade(&self) -> WeakEnv {
        WeakEnv(Rc::downgrade(&self.state))
    }
    pub(crate) fn write_output(&self, text: &str) -> EvalResult<()> {
        let mut output = self.state.output.borrow_mut();
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }
}
impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Env>")
    }
}

#[derive(Clone)]
pub struct WeakEnv(Weak<EnvState>);
impl WeakEnv {
    pub fn upgrade(&self) -> EvalResult<Env> {
        self.0
            .upgrade()
            .map(|state| Env { state })
            .ok_or(EvalError::DetachedEnvironment)
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

/// In-memory output sink that can be shared with an [`Env`] and inspected afterwards.
#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);
impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}
impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::EvalError,
        promise::Promise,
        resolve::resolve,
        stdlib::{Builtin, Function},
        value::Value,
    };

    use super::Env;

    #[test]
    fn unbound_names_read_as_symbols() {
        let env = Env::new();
        let value = env.read("x");
        assert!(matches!(value, Value::Deferred(Promise::Symbol(_))));
        assert_eq!(
            resolve(&value),
            Err(EvalError::NameNotBound(String::from("x")))
        );
        env.write("x", Value::Int(3));
        assert_eq!(resolve(&value), Ok(Value::Int(3)));
        assert_eq!(resolve(&env.read("x")), Ok(Value::Int(3)));
    }

    #[test]
    fn bound_names_still_read_as_symbols() {
        let env = Env::new();
        env.write("x", Value::Int(3));
        assert!(matches!(env.read("x"), Value::Deferred(Promise::Symbol(_))));
        assert_eq!(env.resolve_binding("x"), Ok(Value::Int(3)));
    }

    #[test]
    fn builtins_read_eagerly() {
        let env = Env::new();
        assert_eq!(
            env.read("take"),
            Value::Function(Function::Lazy(Builtin::Take))
        );
        assert_eq!(
            env.read("print"),
            Value::Function(Function::Eager(Builtin::Print))
        );
        assert_eq!(env.read("None"), Value::Nil);
        assert_eq!(env.read("True"), Value::Boolean(true));
        assert!(env.is_builtin("tail"));
        assert!(!env.is_builtin("fibs"));
    }

    #[test]
    fn builtin_names_shadow_bindings() {
        let env = Env::new();
        env.write("len", Value::Int(3));
        assert!(env.is_bound("len"));
        assert_eq!(
            env.read("len"),
            Value::Function(Function::Eager(Builtin::Len))
        );
    }

    #[test]
    fn writes_replace_prior_bindings() {
        let env = Env::new();
        env.write("x", Value::Int(1));
        env.write("x", Value::Int(2));
        assert_eq!(env.resolve_binding("x"), Ok(Value::Int(2)));
    }

    #[test]
    fn symbols_outliving_environment() {
        let symbol = {
            let env = Env::new();
            env.write("x", Value::Int(1));
            env.symbol("x")
        };
        assert_eq!(
            resolve(&Value::Deferred(symbol)),
            Err(EvalError::DetachedEnvironment)
        );
    }

    #[test]
    fn clones_share_bindings() {
        let env = Env::new();
        let other = env.clone();
        other.write("x", Value::Int(1));
        assert_eq!(env.resolve_binding("x"), Ok(Value::Int(1)));
    }
}
