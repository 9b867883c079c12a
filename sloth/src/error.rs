// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::fmt;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    NameNotBound(String),
    TypeMismatch(String),
    Arithmetic(String),
    SequenceExhausted { requested: usize, available: usize },
    Syntax { line: usize, message: String },
    DetachedEnvironment,
    RecursionLimit(usize),
    Io(String),
}
impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }
    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::Arithmetic(message.into())
    }
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}
impl std::error::Error for EvalError {}
impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameNotBound(name) => write!(f, "NameNotBound: name '{}' is not defined", name),
            Self::TypeMismatch(message) => write!(f, "TypeMismatch: {}", message),
            Self::Arithmetic(message) => write!(f, "ArithmeticError: {}", message),
            Self::SequenceExhausted {
                requested,
                available,
            } => write!(
                f,
                "SequenceExhausted: requested {} elements, sequence provided {}",
                requested, available
            ),
            Self::Syntax { line, message } => write!(f, "SyntaxError (line {}): {}", line, message),
            Self::DetachedEnvironment => {
                write!(f, "Deferred value outlived the environment it was bound to")
            }
            Self::RecursionLimit(depth) => {
                write!(f, "RecursionError: maximum resolution depth {} exceeded", depth)
            }
            Self::Io(message) => write!(f, "IOError: {}", message),
        }
    }
}
impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::EvalError;

    #[test]
    fn format_errors() {
        assert_eq!(
            format!("{}", EvalError::NameNotBound(String::from("x"))),
            "NameNotBound: name 'x' is not defined"
        );
        assert_eq!(
            format!(
                "{}",
                EvalError::SequenceExhausted {
                    requested: 3,
                    available: 2
                }
            ),
            "SequenceExhausted: requested 3 elements, sequence provided 2"
        );
        assert_eq!(
            format!("{}", EvalError::syntax(4, "Unexpected ')'")),
            "SyntaxError (line 4): Unexpected ')'"
        );
    }
}
