// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use sloth::{
    promise::operate, stdlib, BinaryOperator, Env, EvalError, EvalResult, MapValue, Value,
};
use tracing::{debug, info_span, trace};

use crate::{parse_program, Node, Operator, Statement};

#[derive(Clone, Copy, Default, Debug)]
pub struct InterpreterOptions {
    /// Log every executed statement along with the quoted form of its value
    pub debug: bool,
}

/// Executes a program against the environment for its side effects.
///
/// The whole program is parsed before anything runs, so a syntax error anywhere leaves the
/// environment untouched. Runtime errors stop execution at the failing statement; bindings
/// written by earlier statements are kept.
pub fn execute_statements(source: &str, env: &Env, options: InterpreterOptions) -> EvalResult<()> {
    let span = info_span!("execute");
    let _enter = span.enter();
    for statement in parse_program(source)? {
        execute(&statement, env, options)?;
    }
    Ok(())
}

/// Evaluates a single expression, returning its value without forcing it.
pub fn evaluate_expression(
    source: &str,
    env: &Env,
    options: InterpreterOptions,
) -> EvalResult<Value> {
    let span = info_span!("evaluate");
    let _enter = span.enter();
    let mut statements = parse_program(source)?;
    match (statements.pop(), statements.is_empty()) {
        (Some(statement @ Statement::Expression { .. }), true) => {
            execute(&statement, env, options).map(|value| value.unwrap_or(Value::Nil))
        }
        (Some(statement), _) => Err(EvalError::syntax(
            statement.line(),
            "Expected a single expression",
        )),
        (None, _) => Err(EvalError::syntax(1, "Expected a single expression")),
    }
}

/// Executes a line of input, returning the value of the final statement when it is a bare
/// expression.
pub fn execute_statement(
    source: &str,
    env: &Env,
    options: InterpreterOptions,
) -> EvalResult<Option<Value>> {
    let span = info_span!("execute");
    let _enter = span.enter();
    parse_program(source)?
        .iter()
        .try_fold(None, |_, statement| execute(statement, env, options))
}

fn execute(statement: &Statement, env: &Env, options: InterpreterOptions) -> EvalResult<Option<Value>> {
    let result = match statement {
        Statement::Assign { name, value, .. } => {
            let value = evaluate(value, env)?;
            if options.debug {
                debug!(line = statement.line(), "{} = {:?}", name, value);
            }
            env.write(name.as_str(), value);
            None
        }
        Statement::Expression { value, .. } => {
            let value = evaluate(value, env)?;
            if options.debug {
                debug!(line = statement.line(), "{:?}", value);
            }
            Some(value)
        }
    };
    Ok(result)
}

fn evaluate(node: &Node, env: &Env) -> EvalResult<Value> {
    trace!(node = %node, "evaluate");
    match node {
        Node::Int(value) => Ok(Value::Int(*value)),
        Node::Float(value) => Ok(Value::Float(*value)),
        Node::String(value) => Ok(Value::string(value.as_str())),
        Node::Identifier(name) => Ok(env.read(name)),
        Node::List(items) => items
            .iter()
            .map(|item| evaluate(item, env))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::list),
        Node::Map(entries) => entries
            .iter()
            .map(|(key, value)| Ok((evaluate(key, env)?, evaluate(value, env)?)))
            .collect::<EvalResult<Vec<_>>>()
            .map(|entries| Value::Map(MapValue::from_entries(entries))),
        Node::Negate(operand) => operate(
            BinaryOperator::Subtract,
            Value::Int(0),
            evaluate(operand, env)?,
            env,
        ),
        Node::Binary(Operator::Arithmetic(operator), left, right) => {
            operate(*operator, evaluate(left, env)?, evaluate(right, env)?, env)
        }
        Node::Binary(Operator::Append, head, tail) => Ok(Value::Deferred(
            env.append(evaluate(head, env)?, evaluate(tail, env)?),
        )),
        Node::Call {
            target,
            args,
            kwargs,
        } => {
            let target = evaluate(target, env)?;
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<EvalResult<Vec<_>>>()?;
            let kwargs = kwargs
                .iter()
                .map(|(key, value)| Ok((key.clone(), evaluate(value, env)?)))
                .collect::<EvalResult<Vec<_>>>()?;
            stdlib::call(&target, args, kwargs, env)
        }
    }
}
