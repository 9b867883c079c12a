// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::cell::Cell;

use im::Vector;
use tracing::trace;

use crate::{
    error::{EvalError, EvalResult},
    value::{MapValue, Value},
};

/// Maximum number of nested deferred values that may be collapsed by a single resolution.
pub const MAX_RESOLVE_DEPTH: usize = 256;

thread_local! {
    static RESOLVE_DEPTH: Cell<usize> = Cell::new(0);
}

struct DepthGuard;
impl DepthGuard {
    fn enter() -> EvalResult<Self> {
        RESOLVE_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= MAX_RESOLVE_DEPTH {
                Err(EvalError::RecursionLimit(MAX_RESOLVE_DEPTH))
            } else {
                depth.set(current + 1);
                Ok(DepthGuard)
            }
        })
    }
}
impl Drop for DepthGuard {
    fn drop(&mut self) {
        RESOLVE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Collapses a value down to a concrete value.
///
/// Lists and mappings are rebuilt with every element (and key) resolved. Lazy sequences are
/// returned unchanged, since forcing them could require unbounded work. Any other deferred value
/// is resolved repeatedly until a concrete value (or a sequence) is produced.
pub fn resolve(value: &Value) -> EvalResult<Value> {
    match value {
        Value::List(items) => items
            .iter()
            .map(resolve)
            .collect::<EvalResult<Vector<_>>>()
            .map(Value::List),
        Value::Map(map) => map
            .iter()
            .map(|(key, value)| Ok((resolve(key)?, resolve(value)?)))
            .collect::<EvalResult<Vec<_>>>()
            .map(|entries| Value::Map(MapValue::from_entries(entries))),
        Value::Deferred(promise) if !promise.is_sequence() => {
            let _guard = DepthGuard::enter()?;
            let mut current = promise.resolve()?;
            let mut layers = 1;
            while let Some(next) = current.as_promise().filter(|next| !next.is_sequence()) {
                if layers >= MAX_RESOLVE_DEPTH {
                    return Err(EvalError::RecursionLimit(MAX_RESOLVE_DEPTH));
                }
                trace!(layer = layers, value = ?next, "resolve layer");
                current = next.resolve()?;
                layers += 1;
            }
            resolve(&current)
        }
        _ => Ok(value.clone()),
    }
}
