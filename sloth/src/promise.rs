// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{fmt, ops, rc::Rc};

use tracing::trace;

use crate::{
    env::{Env, WeakEnv},
    error::{EvalError, EvalResult},
    resolve::resolve,
    sequence::SequenceIterator,
    stdlib::{self, Builtin, Function},
    value::Value,
};

/// A value that has not been computed yet.
///
/// Constructing a promise never evaluates anything. Each call to [`Promise::resolve`] re-reads
/// the environment it is bound to, so the result always reflects the bindings that are current
/// at resolution time.
#[derive(Clone)]
pub enum Promise {
    Symbol(Symbol),
    Expression(Rc<Expression>),
    Call(Rc<LazyCall>),
    Sequence(Rc<Iter>),
}
impl Promise {
    /// Resolves a single layer of the deferred graph. The result may itself be deferred; use
    /// [`crate::resolve`] to collapse it completely.
    pub fn resolve(&self) -> EvalResult<Value> {
        match self {
            Self::Symbol(symbol) => symbol.resolve(),
            Self::Expression(expression) => expression.resolve(),
            Self::Call(call) => call.resolve(),
            Self::Sequence(_) => Ok(Value::Deferred(self.clone())),
        }
    }
    pub fn env(&self) -> &WeakEnv {
        match self {
            Self::Symbol(symbol) => &symbol.env,
            Self::Expression(expression) => &expression.env,
            Self::Call(call) => &call.env,
            Self::Sequence(node) => &node.env,
        }
    }
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Symbol(left), Self::Symbol(right)) => {
                left.name == right.name && left.env.ptr_eq(&right.env)
            }
            (Self::Expression(left), Self::Expression(right)) => Rc::ptr_eq(left, right),
            (Self::Call(left), Self::Call(right)) => Rc::ptr_eq(left, right),
            (Self::Sequence(left), Self::Sequence(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}
impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Value::Deferred(self.clone()), f)
    }
}
impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(symbol) => write!(f, "`{}", symbol.name),
            Self::Expression(expression) => write!(
                f,
                "({:?} {} {:?})",
                expression.left,
                expression.operator.symbol(),
                expression.right
            ),
            Self::Call(call) => {
                match &call.function {
                    Value::Function(function) => write!(f, "{}", function.builtin().name()),
                    target => write!(f, "{:?}", target),
                }?;
                let args = call
                    .args
                    .iter()
                    .map(|arg| format!("{:?}", arg))
                    .chain(
                        call.kwargs
                            .iter()
                            .map(|(key, value)| format!("{}={:?}", key, value)),
                    )
                    .collect::<Vec<_>>();
                write!(f, "({})", args.join(", "))
            }
            Self::Sequence(node) => write!(f, "({:?} >> {:?})", node.head, node.tail),
        }
    }
}

/// Late-bound reference to a name in an environment.
#[derive(Clone)]
pub struct Symbol {
    env: WeakEnv,
    name: Rc<str>,
}
impl Symbol {
    pub(crate) fn new(env: WeakEnv, name: &str) -> Self {
        Self {
            env,
            name: Rc::from(name),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn resolve(&self) -> EvalResult<Value> {
        trace!(symbol = %self.name, "resolve symbol");
        self.env.upgrade()?.resolve_binding(&self.name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}
impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
    /// Applies the operator to two operands that have already been resolved.
    pub fn apply(&self, left: &Value, right: &Value, env: &WeakEnv) -> EvalResult<Value> {
        match (self, left, right) {
            (_, Value::Int(left), Value::Int(right)) => self.apply_int(*left, *right),
            (_, Value::Int(left), Value::Float(right)) => self.apply_float(*left as f64, *right),
            (_, Value::Float(left), Value::Int(right)) => self.apply_float(*left, *right as f64),
            (_, Value::Float(left), Value::Float(right)) => self.apply_float(*left, *right),
            (Self::Add, Value::String(left), Value::String(right)) => {
                Ok(Value::string(format!("{}{}", left, right)))
            }
            (Self::Add, Value::List(left), Value::List(right)) => {
                let mut items = left.clone();
                items.append(right.clone());
                Ok(Value::List(items))
            }
            (Self::Multiply, Value::String(value), Value::Int(count))
            | (Self::Multiply, Value::Int(count), Value::String(value)) => Ok(Value::string(
                value.repeat(repeat_count(*count, value.len())?),
            )),
            (Self::Multiply, Value::List(items), Value::Int(count))
            | (Self::Multiply, Value::Int(count), Value::List(items)) => Ok(Value::List(
                (0..repeat_count(*count, items.len())?)
                    .flat_map(|_| items.iter().cloned())
                    .collect(),
            )),
            (
                Self::Add,
                Value::Deferred(Promise::Sequence(_)),
                Value::Deferred(Promise::Sequence(_)),
            ) => Ok(Value::Deferred(Promise::Call(Rc::new(LazyCall::new(
                env.clone(),
                Value::Function(Function::Eager(Builtin::Concat)),
                vec![left.clone(), right.clone()],
                Vec::new(),
            ))))),
            _ => Err(EvalError::type_mismatch(format!(
                "unsupported operand types for {}: '{}' and '{}'",
                self.symbol(),
                left.type_name(),
                right.type_name()
            ))),
        }
    }
    fn apply_int(&self, left: i64, right: i64) -> EvalResult<Value> {
        let result = match self {
            Self::Add => left.checked_add(right),
            Self::Subtract => left.checked_sub(right),
            Self::Multiply => left.checked_mul(right),
            Self::Divide => {
                if right == 0 {
                    return Err(EvalError::arithmetic(format!(
                        "Division by zero: {} / {}",
                        left, right
                    )));
                }
                left.checked_div(right)
            }
        };
        result.map(Value::Int).ok_or_else(|| {
            EvalError::arithmetic(format!(
                "Integer overflow: {} {} {}",
                left,
                self.symbol(),
                right
            ))
        })
    }
    fn apply_float(&self, left: f64, right: f64) -> EvalResult<Value> {
        match self {
            Self::Add => Ok(Value::Float(left + right)),
            Self::Subtract => Ok(Value::Float(left - right)),
            Self::Multiply => Ok(Value::Float(left * right)),
            Self::Divide => {
                if right == 0.0 {
                    Err(EvalError::arithmetic(format!(
                        "Division by zero: {:?} / {:?}",
                        left, right
                    )))
                } else {
                    Ok(Value::Float(left / right))
                }
            }
        }
    }
}

/// Upper bound on the number of elements (or bytes) produced by repeating a list or string.
pub const MAX_REPEAT_LENGTH: usize = 1 << 24;

fn repeat_count(count: i64, length: usize) -> EvalResult<usize> {
    if count <= 0 || length == 0 {
        return Ok(0);
    }
    usize::try_from(count)
        .ok()
        .and_then(|count| count.checked_mul(length).map(|total| (count, total)))
        .filter(|(_, total)| *total <= MAX_REPEAT_LENGTH)
        .map(|(count, _)| count)
        .ok_or_else(|| {
            EvalError::arithmetic(format!(
                "Repetition too large: {} * {} exceeds {} elements",
                length, count, MAX_REPEAT_LENGTH
            ))
        })
}

/// Combines two operands with an arithmetic operator: deferred operands produce an
/// [`Expression`] node, concrete operands are computed immediately.
pub fn operate(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    env: &Env,
) -> EvalResult<Value> {
    if left.is_deferred() || right.is_deferred() {
        Ok(Value::Deferred(env.expression(operator, left, right)))
    } else {
        operator.apply(&left, &right, &env.downgrade())
    }
}

/// Deferred binary arithmetic operation over two possibly-deferred operands.
pub struct Expression {
    env: WeakEnv,
    operator: BinaryOperator,
    left: Value,
    right: Value,
}
impl Expression {
    pub(crate) fn new(env: WeakEnv, operator: BinaryOperator, left: Value, right: Value) -> Self {
        Self {
            env,
            operator,
            left,
            right,
        }
    }
    pub fn operator(&self) -> BinaryOperator {
        self.operator
    }
    pub fn left(&self) -> &Value {
        &self.left
    }
    pub fn right(&self) -> &Value {
        &self.right
    }
    pub fn resolve(&self) -> EvalResult<Value> {
        let left = resolve(&self.left)?;
        let right = resolve(&self.right)?;
        trace!(operator = self.operator.symbol(), "resolve expression");
        self.operator.apply(&left, &right, &self.env)
    }
}

/// Deferred invocation of a function whose target and arguments may themselves be deferred.
pub struct LazyCall {
    env: WeakEnv,
    function: Value,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
}
impl LazyCall {
    pub(crate) fn new(
        env: WeakEnv,
        function: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Self {
        Self {
            env,
            function,
            args,
            kwargs,
        }
    }
    pub fn function(&self) -> &Value {
        &self.function
    }
    pub fn args(&self) -> &[Value] {
        &self.args
    }
    pub fn kwargs(&self) -> &[(String, Value)] {
        &self.kwargs
    }
    pub fn resolve(&self) -> EvalResult<Value> {
        let function = resolve(&self.function)?;
        let args = self
            .args
            .iter()
            .map(resolve)
            .collect::<EvalResult<Vec<_>>>()?;
        let kwargs = self
            .kwargs
            .iter()
            .map(|(key, value)| resolve(value).map(|value| (key.clone(), value)))
            .collect::<EvalResult<Vec<_>>>()?;
        trace!(function = ?self.function, "resolve call");
        let env = self.env.upgrade()?;
        stdlib::invoke(&function, args, kwargs, &env)
    }
}

/// Lazy singly-linked sequence node. The tail is conventionally another sequence, possibly
/// deferred, which allows unbounded sequences to be realised one element at a time.
pub struct Iter {
    env: WeakEnv,
    head: Value,
    tail: Value,
}
impl Iter {
    pub(crate) fn new(env: WeakEnv, head: Value, tail: Value) -> Self {
        Self { env, head, tail }
    }
    pub fn head(&self) -> &Value {
        &self.head
    }
    pub fn tail(&self) -> &Value {
        &self.tail
    }
    pub fn elements(self: &Rc<Self>) -> SequenceIterator {
        SequenceIterator::new(Value::Deferred(Promise::Sequence(Rc::clone(self))))
    }
}
impl Drop for Iter {
    fn drop(&mut self) {
        // Unlink uniquely-owned tails one node at a time to avoid recursive drops
        let mut tail = std::mem::replace(&mut self.tail, Value::Nil);
        while let Value::Deferred(Promise::Sequence(node)) = tail {
            match Rc::try_unwrap(node) {
                Ok(mut node) => {
                    tail = std::mem::replace(&mut node.tail, Value::Nil);
                }
                Err(_) => break,
            }
        }
    }
}

macro_rules! impl_deferred_operator {
    ($trait:ident, $method:ident, $operator:expr) => {
        impl<T: Into<Value>> ops::$trait<T> for Promise {
            type Output = Promise;
            fn $method(self, rhs: T) -> Promise {
                let env = self.env().clone();
                Promise::Expression(Rc::new(Expression::new(
                    env,
                    $operator,
                    Value::Deferred(self),
                    rhs.into(),
                )))
            }
        }
        impl_deferred_operator!(@reverse $trait, $method, $operator, i32);
        impl_deferred_operator!(@reverse $trait, $method, $operator, i64);
        impl_deferred_operator!(@reverse $trait, $method, $operator, f64);
    };
    (@reverse $trait:ident, $method:ident, $operator:expr, $type:ty) => {
        impl ops::$trait<Promise> for $type {
            type Output = Promise;
            fn $method(self, rhs: Promise) -> Promise {
                let env = rhs.env().clone();
                Promise::Expression(Rc::new(Expression::new(
                    env,
                    $operator,
                    Value::from(self),
                    Value::Deferred(rhs),
                )))
            }
        }
    };
}

impl_deferred_operator!(Add, add, BinaryOperator::Add);
impl_deferred_operator!(Sub, sub, BinaryOperator::Subtract);
impl_deferred_operator!(Mul, mul, BinaryOperator::Multiply);
impl_deferred_operator!(Div, div, BinaryOperator::Divide);

/// `head >> tail` appends a head onto a (possibly deferred) tail, producing a sequence node.
impl<T: Into<Value>> ops::Shr<T> for Promise {
    type Output = Promise;
    fn shr(self, rhs: T) -> Promise {
        let env = self.env().clone();
        Promise::Sequence(Rc::new(Iter::new(env, Value::Deferred(self), rhs.into())))
    }
}
impl ops::Shr<Promise> for i64 {
    type Output = Promise;
    fn shr(self, rhs: Promise) -> Promise {
        let env = rhs.env().clone();
        Promise::Sequence(Rc::new(Iter::new(env, Value::Int(self), Value::Deferred(rhs))))
    }
}

#[cfg(test)]
mod tests {
    use crate::{env::Env, error::EvalError, resolve::resolve, value::Value};

    use super::BinaryOperator;

    #[test]
    fn arithmetic_on_symbols_is_deferred() {
        let env = Env::new();
        let expression = env.symbol("x") + 1;
        assert_eq!(
            resolve(&Value::Deferred(expression.clone())),
            Err(EvalError::NameNotBound(String::from("x")))
        );
        env.write("x", Value::Int(2));
        assert_eq!(resolve(&Value::Deferred(expression)), Ok(Value::Int(3)));
    }

    #[test]
    fn reverse_operands_preserve_order() {
        let env = Env::new();
        env.write("x", Value::Int(4));
        let expression = 10_i64 - env.symbol("x");
        assert_eq!(resolve(&Value::Deferred(expression)), Ok(Value::Int(6)));
        let expression = 2.0 * env.symbol("x");
        assert_eq!(resolve(&Value::Deferred(expression)), Ok(Value::Float(8.0)));
    }

    #[test]
    fn all_operators_build_expressions() {
        let env = Env::new();
        env.write("x", Value::Int(12));
        let x = || env.symbol("x");
        let cases = vec![
            (x() + 3_i64, Value::Int(15)),
            (x() - 3_i64, Value::Int(9)),
            (x() * 3_i64, Value::Int(36)),
            (x() / 3_i64, Value::Int(4)),
        ];
        for (expression, expected) in cases {
            assert!(matches!(expression, super::Promise::Expression(_)));
            assert_eq!(resolve(&Value::Deferred(expression)), Ok(expected));
        }
    }

    #[test]
    fn quoted_representation_does_not_force() {
        let env = Env::new();
        let expression = env.symbol("x") + env.symbol("y");
        assert_eq!(format!("{:?}", expression), "(`x + `y)");
        let nested = (env.symbol("x") * 2_i64) - env.symbol("y");
        assert_eq!(format!("{:?}", nested), "((`x * 2) - `y)");
        let sequence = 1_i64 >> env.symbol("rest");
        assert_eq!(format!("{:?}", sequence), "(1 >> `rest)");
    }

    #[test]
    fn quoted_representation_of_calls() {
        let env = Env::new();
        let call = env
            .call(
                env.read("take"),
                vec![Value::Int(3), Value::Deferred(env.symbol("fibs"))],
                vec![(String::from("extra"), Value::Nil)],
            );
        assert_eq!(format!("{:?}", call), "take(3, `fibs, extra=None)");
    }

    #[test]
    fn integer_division() {
        let env = Env::new().downgrade();
        assert_eq!(
            BinaryOperator::Divide.apply(&Value::Int(7), &Value::Int(2), &env),
            Ok(Value::Int(3))
        );
        assert!(matches!(
            BinaryOperator::Divide.apply(&Value::Int(7), &Value::Int(0), &env),
            Err(EvalError::Arithmetic(_))
        ));
        assert!(matches!(
            BinaryOperator::Divide.apply(&Value::Float(7.0), &Value::Int(0), &env),
            Err(EvalError::Arithmetic(_))
        ));
        assert_eq!(
            BinaryOperator::Divide.apply(&Value::Int(7), &Value::Float(2.0), &env),
            Ok(Value::Float(3.5))
        );
    }

    #[test]
    fn integer_overflow() {
        let env = Env::new().downgrade();
        assert!(matches!(
            BinaryOperator::Add.apply(&Value::Int(i64::MAX), &Value::Int(1), &env),
            Err(EvalError::Arithmetic(_))
        ));
    }

    #[test]
    fn container_operators() {
        let env = Env::new().downgrade();
        assert_eq!(
            BinaryOperator::Add.apply(&Value::from("foo"), &Value::from("bar"), &env),
            Ok(Value::from("foobar"))
        );
        assert_eq!(
            BinaryOperator::Multiply.apply(&Value::from("ab"), &Value::Int(3), &env),
            Ok(Value::from("ababab"))
        );
        assert_eq!(
            BinaryOperator::Add.apply(
                &Value::list(vec![Value::Int(1)]),
                &Value::list(vec![Value::Int(2)]),
                &env
            ),
            Ok(Value::list(vec![Value::Int(1), Value::Int(2)]))
        );
        assert!(matches!(
            BinaryOperator::Subtract.apply(&Value::from("a"), &Value::Int(1), &env),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn oversized_repetition() {
        let env = Env::new().downgrade();
        assert!(matches!(
            BinaryOperator::Multiply.apply(&Value::from("ab"), &Value::Int(i64::MAX), &env),
            Err(EvalError::Arithmetic(_))
        ));
        assert!(matches!(
            BinaryOperator::Multiply.apply(
                &Value::Int(i64::MAX),
                &Value::list(vec![Value::Int(1)]),
                &env
            ),
            Err(EvalError::Arithmetic(_))
        ));
        assert_eq!(
            BinaryOperator::Multiply.apply(&Value::list(Vec::new()), &Value::Int(i64::MAX), &env),
            Ok(Value::list(Vec::new()))
        );
        assert_eq!(
            BinaryOperator::Multiply.apply(&Value::from(""), &Value::Int(i64::MAX), &env),
            Ok(Value::from(""))
        );
        assert_eq!(
            BinaryOperator::Multiply.apply(&Value::from("ab"), &Value::Int(-2), &env),
            Ok(Value::from(""))
        );
    }
}
