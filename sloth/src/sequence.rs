// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::rc::Rc;

use im::Vector;
use tracing::trace;

use crate::{
    env::WeakEnv,
    error::{EvalError, EvalResult},
    promise::{BinaryOperator, Iter, LazyCall, Promise},
    resolve::resolve,
    stdlib::{Builtin, Function},
    value::Value,
};

/// Pulls elements from a lazy sequence one at a time.
///
/// Each call to `next` forces the pending remainder of the sequence (which may be deferred)
/// and then the head of the resulting node. The tail of that node is left unforced until the
/// following call, so consuming `n` elements forces exactly `n` heads and `n - 1` tails.
/// Traversal is iterative, so long sequences do not grow the call stack.
pub struct SequenceIterator {
    remaining: Option<Value>,
}
impl SequenceIterator {
    pub fn new(sequence: Value) -> Self {
        Self {
            remaining: Some(sequence),
        }
    }
}
impl Iterator for SequenceIterator {
    type Item = EvalResult<Value>;
    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining.take()?;
        let node = match resolve(&remaining) {
            Err(err) => return Some(Err(err)),
            Ok(Value::Nil) => return None,
            Ok(value) => match value.as_sequence() {
                Some(node) => Rc::clone(node),
                None => {
                    return Some(Err(EvalError::type_mismatch(format!(
                        "sequence tail must be a sequence or None, received '{}'",
                        value.type_name()
                    ))))
                }
            },
        };
        trace!(head = ?node.head(), "force sequence element");
        match resolve(node.head()) {
            Err(err) => Some(Err(err)),
            Ok(head) => {
                self.remaining = Some(node.tail().clone());
                Some(Ok(head))
            }
        }
    }
}

/// Forces the first `count` elements of a sequence into a list.
pub fn take(count: usize, sequence: &Value) -> EvalResult<Value> {
    match sequence {
        Value::List(items) => {
            if items.len() < count {
                Err(EvalError::SequenceExhausted {
                    requested: count,
                    available: items.len(),
                })
            } else {
                Ok(Value::List(items.take(count)))
            }
        }
        Value::Deferred(Promise::Sequence(node)) => {
            let mut items = Vector::new();
            for item in node.elements().take(count) {
                items.push_back(item?);
            }
            if items.len() < count {
                Err(EvalError::SequenceExhausted {
                    requested: count,
                    available: items.len(),
                })
            } else {
                Ok(Value::List(items))
            }
        }
        _ => Err(expected_sequence("take", sequence)),
    }
}

/// Returns the unforced tail of a sequence node.
pub fn tail(sequence: &Value) -> EvalResult<Value> {
    match sequence.as_sequence() {
        Some(node) => Ok(node.tail().clone()),
        None => Err(expected_sequence("tail", sequence)),
    }
}

pub fn head(sequence: &Value) -> EvalResult<Value> {
    match sequence.as_sequence() {
        Some(node) => resolve(node.head()),
        None => Err(expected_sequence("head", sequence)),
    }
}

/// Element-wise sum of two sequences.
///
/// Both heads are forced immediately; the tail is a deferred call that concatenates the two
/// tails once it is itself resolved. The result ends as soon as either input ends.
pub fn concat(left: &Value, right: &Value, env: &WeakEnv) -> EvalResult<Value> {
    match (left, right) {
        (Value::Nil, _) | (_, Value::Nil) => Ok(Value::Nil),
        (Value::Deferred(Promise::Sequence(left)), Value::Deferred(Promise::Sequence(right))) => {
            let head =
                BinaryOperator::Add.apply(&resolve(left.head())?, &resolve(right.head())?, env)?;
            let tail = LazyCall::new(
                env.clone(),
                Value::Function(Function::Eager(Builtin::Concat)),
                vec![left.tail().clone(), right.tail().clone()],
                Vec::new(),
            );
            Ok(Value::Deferred(Promise::Sequence(Rc::new(Iter::new(
                env.clone(),
                head,
                Value::Deferred(Promise::Call(Rc::new(tail))),
            )))))
        }
        (Value::Deferred(Promise::Sequence(_)), other) | (other, _) => {
            Err(expected_sequence("concat", other))
        }
    }
}

/// Forces every element of a finite sequence into a list. Does not terminate for unbounded
/// sequences.
pub fn collect(sequence: &Value) -> EvalResult<Value> {
    match sequence {
        Value::List(_) => Ok(sequence.clone()),
        Value::Deferred(Promise::Sequence(node)) => node
            .elements()
            .collect::<EvalResult<Vector<_>>>()
            .map(Value::List),
        _ => Err(expected_sequence("list", sequence)),
    }
}

fn expected_sequence(function: &str, received: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "{}() expected a sequence, received '{}'",
        function,
        received.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use crate::{
        env::Env,
        error::EvalError,
        promise::{BinaryOperator, Promise},
        resolve::resolve,
        stdlib::Builtin,
        value::Value,
    };

    use super::{collect, concat, head, tail, take, SequenceIterator};

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int))
    }

    fn fibs(env: &Env) -> Value {
        // fibs = 0 >> 1 >> fibs + tail(fibs)
        let tail_of_fibs = env.call(
            env.read(Builtin::Tail.name()),
            vec![env.read("fibs")],
            Vec::new(),
        );
        let rest = env.symbol("fibs") + tail_of_fibs;
        let fibs = env.append(0, env.append(1, rest));
        env.write("fibs", fibs);
        env.read("fibs")
    }

    #[test]
    fn take_forces_only_requested_prefix() {
        let env = Env::new();
        let failing = env.expression(BinaryOperator::Divide, 1, 0);
        let sequence = Value::Deferred(env.append(1, env.append(2, failing)));
        assert_eq!(take(2, &sequence), Ok(ints(&[1, 2])));
        assert!(matches!(
            take(3, &sequence),
            Err(EvalError::Arithmetic(_))
        ));
    }

    #[test]
    fn take_on_exhausted_sequence() {
        let env = Env::new();
        let sequence = Value::Deferred(env.append(1, env.append(2, Value::Nil)));
        assert_eq!(
            take(3, &sequence),
            Err(EvalError::SequenceExhausted {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(take(0, &sequence), Ok(ints(&[])));
    }

    #[test]
    fn take_on_lists() {
        assert_eq!(take(2, &ints(&[1, 2, 3])), Ok(ints(&[1, 2])));
        assert_eq!(
            take(4, &ints(&[1, 2, 3])),
            Err(EvalError::SequenceExhausted {
                requested: 4,
                available: 3
            })
        );
        assert!(matches!(
            take(1, &Value::Int(3)),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn fibonacci_sequence() {
        let env = Env::new();
        let fibs = resolve(&fibs(&env)).unwrap();
        assert_eq!(take(3, &fibs), Ok(ints(&[0, 1, 1])));
        assert_eq!(
            take(10, &fibs),
            Ok(ints(&[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]))
        );
    }

    #[test]
    fn tail_returns_deferred_remainder() {
        let env = Env::new();
        env.write("rest", env.append(2, env.append(3, Value::Nil)));
        let sequence = Value::Deferred(env.append(1, env.symbol("rest")));
        let remainder = tail(&sequence).unwrap();
        assert!(matches!(remainder, Value::Deferred(Promise::Symbol(_))));
        let remainder = resolve(&remainder).unwrap();
        assert_eq!(take(2, &remainder), Ok(ints(&[2, 3])));
        assert_eq!(head(&remainder), Ok(Value::Int(2)));
    }

    #[test]
    fn tail_of_non_sequence() {
        assert!(matches!(
            tail(&Value::Int(3)),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(
            head(&Value::from("foo")),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn concat_sums_elementwise() {
        let env = Env::new();
        let left = Value::Deferred(env.append(1, env.append(2, env.append(3, Value::Nil))));
        let right = Value::Deferred(env.append(10, env.append(20, Value::Nil)));
        let result = concat(&left, &right, &env.downgrade()).unwrap();
        assert_eq!(collect(&result), Ok(ints(&[11, 22])));
        assert!(matches!(
            concat(&left, &Value::Int(1), &env.downgrade()),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn adding_sequences_concatenates() {
        let env = Env::new();
        env.write("a", env.append(1, env.append(2, Value::Nil)));
        env.write("b", env.append(3, env.append(4, Value::Nil)));
        let sum = env.symbol("a") + env.symbol("b");
        let result = resolve(&Value::Deferred(sum)).unwrap();
        assert_eq!(take(2, &result), Ok(ints(&[4, 6])));
    }

    #[test]
    fn iterator_stops_at_end_of_sequence() {
        let env = Env::new();
        let sequence = Value::Deferred(env.append(1, env.append(2, Value::Nil)));
        let items = SequenceIterator::new(sequence).collect::<Vec<_>>();
        assert_eq!(items, vec![Ok(Value::Int(1)), Ok(Value::Int(2))]);
    }

    #[test]
    fn non_sequence_tails_are_rejected() {
        let env = Env::new();
        let sequence = Value::Deferred(env.append(1, env.append(2, 3)));
        assert_eq!(take(2, &sequence), Ok(ints(&[1, 2])));
        assert!(matches!(
            take(3, &sequence),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(collect(&sequence), Err(EvalError::TypeMismatch(_))));
        let sequence = Value::Deferred(env.append(1, ints(&[2, 3])));
        assert!(matches!(collect(&sequence), Err(EvalError::TypeMismatch(_))));
    }

    #[test]
    fn iterator_is_fused_after_errors() {
        let env = Env::new();
        let sequence = Value::Deferred(env.append(env.symbol("missing"), Value::Nil));
        let mut iterator = SequenceIterator::new(sequence);
        assert_eq!(
            iterator.next(),
            Some(Err(EvalError::NameNotBound(String::from("missing"))))
        );
        assert_eq!(iterator.next(), None);
    }

    #[test]
    fn long_sequences_are_traversed_iteratively() {
        let env = Env::new();
        let sequence = (0..10_000)
            .rev()
            .fold(Value::Nil, |tail, index| Value::Deferred(env.append(index, tail)));
        let items = collect(&sequence).unwrap();
        match items {
            Value::List(items) => {
                assert_eq!(items.len(), 10_000);
                assert_eq!(items.back(), Some(&Value::Int(9_999)));
            }
            _ => panic!("Expected list"),
        }
    }
}
