// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
pub mod env;
pub mod error;
pub mod json;
pub mod promise;
pub mod resolve;
pub mod sequence;
pub mod stdlib;
pub mod value;

pub use env::{Env, EnvOptions, OutputBuffer};
pub use error::{EvalError, EvalResult};
pub use promise::{BinaryOperator, Expression, Iter, LazyCall, Promise, Symbol};
pub use resolve::resolve;
pub use stdlib::{Builtin, Function};
pub use value::{MapValue, Value};
