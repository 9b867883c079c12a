// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{cmp::Ordering, fmt, iter::once};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};
use tracing::trace;

use crate::{
    env::Env,
    error::{EvalError, EvalResult},
    resolve::resolve,
    sequence,
    value::Value,
};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub enum ArgType {
    /** Resolve argument before function application */
    Strict,
    /** Pass argument directly into function body without resolving */
    Lazy,
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct Arity {
    arg_type: ArgType,
    required: usize,
    variadic: bool,
}
impl Arity {
    pub fn strict(required: usize, variadic: bool) -> Self {
        Self {
            arg_type: ArgType::Strict,
            required,
            variadic,
        }
    }
    pub fn lazy(required: usize, variadic: bool) -> Self {
        Self {
            arg_type: ArgType::Lazy,
            required,
            variadic,
        }
    }
    pub fn arg_type(&self) -> ArgType {
        self.arg_type
    }
    pub fn required(&self) -> usize {
        self.required
    }
    pub fn variadic(&self) -> bool {
        self.variadic
    }
    fn validate(&self, name: &str, num_args: usize) -> EvalResult<()> {
        if num_args < self.required || (!self.variadic && num_args > self.required) {
            Err(EvalError::type_mismatch(format!(
                "{}() takes {}{} positional argument{} but {} {} given",
                name,
                if self.variadic { "at least " } else { "" },
                self.required,
                if self.required == 1 { "" } else { "s" },
                num_args,
                if num_args == 1 { "was" } else { "were" },
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(
    Hash,
    Eq,
    PartialEq,
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    Take,
    Tail,
    Head,
    Concat,
    Lazy,
    Print,
    Str,
    Repr,
    Len,
    Abs,
    Min,
    Max,
    Int,
    Float,
    List,
    Resolve,
    Quote,
}
impl Builtin {
    pub fn entries() -> impl Iterator<Item = Self> {
        Self::iter()
    }
    pub fn name(&self) -> &'static str {
        self.into()
    }
    /// Whether the environment registers this built-in as a lazy function, whose invocation
    /// produces a deferred call instead of running immediately.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Take | Self::Tail | Self::Head | Self::Concat)
    }
    pub fn arity(&self) -> Arity {
        match self {
            Self::Take => Arity::strict(2, false),
            Self::Tail => Arity::strict(1, false),
            Self::Head => Arity::strict(1, false),
            Self::Concat => Arity::strict(2, false),
            Self::Lazy => Arity::strict(1, false),
            Self::Print => Arity::strict(0, true),
            Self::Str => Arity::strict(1, false),
            Self::Repr => Arity::strict(1, false),
            Self::Len => Arity::strict(1, false),
            Self::Abs => Arity::strict(1, false),
            Self::Min => Arity::strict(1, true),
            Self::Max => Arity::strict(1, true),
            Self::Int => Arity::strict(1, false),
            Self::Float => Arity::strict(1, false),
            Self::List => Arity::strict(1, false),
            Self::Resolve => Arity::strict(1, false),
            Self::Quote => Arity::lazy(1, false),
        }
    }
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Print => &["sep", "end"],
            _ => &[],
        }
    }
    fn validate(&self, num_args: usize, kwargs: &[(String, Value)]) -> EvalResult<()> {
        self.arity().validate(self.name(), num_args)?;
        match kwargs
            .iter()
            .find(|(key, _)| !self.keywords().contains(&key.as_str()))
        {
            Some((key, _)) => Err(EvalError::type_mismatch(format!(
                "{}() got an unexpected keyword argument '{}'",
                self.name(),
                key
            ))),
            None => Ok(()),
        }
    }
}

/// Callable value: a built-in that either runs when called, or (when lazy) defers the call
/// until the result is resolved.
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Function {
    Eager(Builtin),
    Lazy(Builtin),
}
impl Function {
    pub fn builtin(&self) -> Builtin {
        match self {
            Self::Eager(builtin) | Self::Lazy(builtin) => *builtin,
        }
    }
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}
impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            Self::Lazy(builtin) => write!(f, "<lazy function {}>", builtin.name()),
        }
    }
}

/// Names pre-registered in every environment.
pub fn builtin_globals() -> impl Iterator<Item = (&'static str, Value)> {
    Builtin::entries()
        .map(|builtin| {
            let function = if builtin.is_lazy() {
                Function::Lazy(builtin)
            } else {
                Function::Eager(builtin)
            };
            (builtin.name(), Value::Function(function))
        })
        .chain(once(("None", Value::Nil)))
        .chain(once(("True", Value::Boolean(true))))
        .chain(once(("False", Value::Boolean(false))))
}

/// Calls a function value with unresolved arguments.
///
/// Lazy functions and deferred call targets produce a deferred call; eager built-ins resolve
/// their strict arguments and run immediately.
pub fn call(
    function: &Value,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &Env,
) -> EvalResult<Value> {
    match function {
        Value::Function(Function::Lazy(builtin)) => {
            builtin.validate(args.len(), &kwargs)?;
            Ok(Value::Deferred(env.call(
                Function::Eager(*builtin),
                args,
                kwargs,
            )))
        }
        Value::Function(Function::Eager(builtin)) => {
            let (args, kwargs) = match builtin.arity().arg_type() {
                ArgType::Lazy => (args, kwargs),
                ArgType::Strict => (
                    args.iter().map(resolve).collect::<EvalResult<Vec<_>>>()?,
                    kwargs
                        .into_iter()
                        .map(|(key, value)| resolve(&value).map(|value| (key, value)))
                        .collect::<EvalResult<Vec<_>>>()?,
                ),
            };
            apply(*builtin, args, kwargs, env)
        }
        Value::Deferred(_) => Ok(Value::Deferred(env.call(function.clone(), args, kwargs))),
        _ => Err(not_callable(function)),
    }
}

/// Invokes a function value with arguments that have already been resolved.
pub fn invoke(
    function: &Value,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &Env,
) -> EvalResult<Value> {
    match function {
        Value::Function(function) => apply(function.builtin(), args, kwargs, env),
        _ => Err(not_callable(function)),
    }
}

fn not_callable(target: &Value) -> EvalError {
    EvalError::type_mismatch(format!("'{}' object is not callable", target.type_name()))
}

fn apply(
    builtin: Builtin,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &Env,
) -> EvalResult<Value> {
    builtin.validate(args.len(), &kwargs)?;
    trace!(builtin = builtin.name(), "apply builtin");
    match builtin {
        Builtin::Take => sequence::take(expect_count(&args[0])?, &args[1]),
        Builtin::Tail => sequence::tail(&args[0]),
        Builtin::Head => sequence::head(&args[0]),
        Builtin::Concat => sequence::concat(&args[0], &args[1], &env.downgrade()),
        Builtin::Lazy => match &args[0] {
            Value::Function(function) => Ok(Value::Function(Function::Lazy(function.builtin()))),
            other => Err(not_callable(other)),
        },
        Builtin::Print => print(&args, &kwargs, env),
        Builtin::Str => Ok(Value::string(args[0].to_text())),
        Builtin::Repr => Ok(Value::string(format!("{}", args[0]))),
        Builtin::Len => len(&args[0]),
        Builtin::Abs => abs(&args[0]),
        Builtin::Min => extremum(builtin, &args, Ordering::Less),
        Builtin::Max => extremum(builtin, &args, Ordering::Greater),
        Builtin::Int => to_int(&args[0]),
        Builtin::Float => to_float(&args[0]),
        Builtin::List => sequence::collect(&args[0]),
        Builtin::Resolve => resolve(&args[0]),
        Builtin::Quote => Ok(Value::string(args[0].quoted())),
    }
}

fn expect_count(value: &Value) -> EvalResult<usize> {
    match value {
        Value::Int(count) if *count >= 0 => Ok(*count as usize),
        Value::Int(count) => Err(EvalError::type_mismatch(format!(
            "Expected a non-negative count, received {}",
            count
        ))),
        _ => Err(EvalError::type_mismatch(format!(
            "Expected an int count, received '{}'",
            value.type_name()
        ))),
    }
}

fn print(args: &[Value], kwargs: &[(String, Value)], env: &Env) -> EvalResult<Value> {
    let separator = keyword_text(kwargs, "sep", " ")?;
    let terminator = keyword_text(kwargs, "end", "\n")?;
    let reverse = env.options().reverse_print;
    let text = args
        .iter()
        .map(|arg| match arg {
            Value::Int(value) if reverse => value.to_string().chars().rev().collect(),
            _ => arg.to_text(),
        })
        .collect::<Vec<String>>()
        .join(&separator);
    env.write_output(&format!("{}{}", text, terminator))?;
    Ok(Value::Nil)
}

fn keyword_text(kwargs: &[(String, Value)], key: &str, default: &str) -> EvalResult<String> {
    match kwargs.iter().find(|(name, _)| name == key) {
        None | Some((_, Value::Nil)) => Ok(String::from(default)),
        Some((_, Value::String(value))) => Ok(String::from(&**value)),
        Some((_, value)) => Err(EvalError::type_mismatch(format!(
            "{} must be None or a string, not '{}'",
            key,
            value.type_name()
        ))),
    }
}

fn len(value: &Value) -> EvalResult<Value> {
    let length = match value {
        Value::String(value) => value.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        _ => {
            return Err(EvalError::type_mismatch(format!(
                "object of type '{}' has no len()",
                value.type_name()
            )))
        }
    };
    Ok(Value::Int(length as i64))
}

fn abs(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Int(value) => value
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::arithmetic(format!("Integer overflow: abs({})", value))),
        Value::Float(value) => Ok(Value::Float(value.abs())),
        _ => Err(EvalError::type_mismatch(format!(
            "bad operand type for abs(): '{}'",
            value.type_name()
        ))),
    }
}

fn extremum(builtin: Builtin, args: &[Value], target: Ordering) -> EvalResult<Value> {
    let candidates = match args {
        [Value::List(items)] => items.iter().cloned().collect::<Vec<_>>(),
        _ => args.to_vec(),
    };
    let mut candidates = candidates.into_iter();
    let first = candidates.next().ok_or_else(|| {
        EvalError::type_mismatch(format!("{}() arg is an empty sequence", builtin.name()))
    })?;
    candidates.try_fold(first, |current, candidate| {
        if compare(&candidate, &current)? == target {
            Ok(candidate)
        } else {
            Ok(current)
        }
    })
}

fn compare(left: &Value, right: &Value) -> EvalResult<Ordering> {
    let ordering = match (left, right) {
        (Value::Int(left), Value::Int(right)) => Some(left.cmp(right)),
        (Value::Int(left), Value::Float(right)) => (*left as f64).partial_cmp(right),
        (Value::Float(left), Value::Int(right)) => left.partial_cmp(&(*right as f64)),
        (Value::Float(left), Value::Float(right)) => left.partial_cmp(right),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => None,
    };
    ordering.ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "cannot compare '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn to_int(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Boolean(value) => Ok(Value::Int(if *value { 1 } else { 0 })),
        Value::Float(value) if value.is_finite() && value.trunc().abs() < i64::MAX as f64 => {
            Ok(Value::Int(value.trunc() as i64))
        }
        Value::Float(value) => Err(EvalError::arithmetic(format!(
            "cannot convert float {:?} to integer",
            value
        ))),
        Value::String(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalError::type_mismatch(format!("invalid literal for int(): {:?}", text))
        }),
        _ => Err(EvalError::type_mismatch(format!(
            "int() argument must be a string or a number, not '{}'",
            value.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Int(value) => Ok(Value::Float(*value as f64)),
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Boolean(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
        Value::String(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::type_mismatch(format!("could not convert string to float: {:?}", text))
        }),
        _ => Err(EvalError::type_mismatch(format!(
            "float() argument must be a string or a number, not '{}'",
            value.type_name()
        ))),
    }
}
