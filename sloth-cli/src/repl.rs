// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::io::{self, BufRead, Write};

use sloth::{json, resolve, Env, EvalResult, Value};
use sloth_script::{execute_statement, InterpreterOptions};

#[derive(Clone, Copy, Default, Debug)]
pub struct ReplOptions {
    pub interpreter: InterpreterOptions,
    pub json: bool,
}

/// Reads statements one line at a time until `exit` or end of input.
///
/// Errors are reported on the error stream and do not end the session.
pub fn run(
    mut input: impl BufRead,
    mut output: impl Write,
    mut errors: impl Write,
    env: &Env,
    options: ReplOptions,
) -> io::Result<()> {
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let line = {
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            line
        };
        let line = line.trim_end();

        if line == "exit" {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match eval(line, env, options) {
            Ok(None) => Ok(()),
            Ok(Some(Value::Nil)) => Ok(()),
            Ok(Some(value)) => {
                if options.json {
                    match json::stringify(&value) {
                        Ok(text) => writeln!(output, "{}", text),
                        Err(message) => writeln!(errors, "{}", message),
                    }
                } else {
                    writeln!(output, "{}", value)
                }
            }
            Err(err) => writeln!(errors, "{}", err),
        }?;
    }
    Ok(())
}

fn eval(line: &str, env: &Env, options: ReplOptions) -> EvalResult<Option<Value>> {
    match execute_statement(line, env, options.interpreter)? {
        Some(value) => resolve(&value).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use sloth::{Env, OutputBuffer};

    use super::{run, ReplOptions};

    fn session(input: &str, options: ReplOptions) -> (String, String, String) {
        let printed = OutputBuffer::new();
        let env = Env::with_output(printed.clone());
        let output = OutputBuffer::new();
        let errors = OutputBuffer::new();
        run(
            input.as_bytes(),
            output.clone(),
            errors.clone(),
            &env,
            options,
        )
        .unwrap();
        (output.contents(), errors.contents(), printed.contents())
    }

    #[test]
    fn prints_expression_results() {
        let (output, errors, _) = session(
            "x = 2\nx * 3\nfibs = 0 >> 1 >> fibs + tail(fibs)\ntake(5, fibs)\n",
            ReplOptions::default(),
        );
        assert_eq!(output, "> > 6\n> > [0, 1, 1, 2, 3]\n> ");
        assert_eq!(errors, "");
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let (output, errors, _) = session("y + 1\n1 / 0\n(\n4\n", ReplOptions::default());
        assert_eq!(output, "> > > > 4\n> ");
        assert_eq!(
            errors,
            "NameNotBound: name 'y' is not defined\nArithmeticError: Division by zero: 1 / 0\nSyntaxError (line 1): Expected expression, received end of input\n"
        );
    }

    #[test]
    fn oversized_values_do_not_end_the_session() {
        let (output, errors, _) = session(
            "'ab' * 9223372036854775807\nlist(1 >> 2 >> 3)\n1 + 1\n",
            ReplOptions::default(),
        );
        assert_eq!(output, "> > > 2\n> ");
        assert!(errors.starts_with("ArithmeticError: Repetition too large"));
        assert!(errors.contains("\nTypeMismatch: sequence tail must be a sequence or None"));
    }

    #[test]
    fn exit_ends_the_session() {
        let (output, _, printed) = session(
            "print('hi')\nNone\nexit\nprint('unreachable')\n",
            ReplOptions::default(),
        );
        assert_eq!(output, "> > > ");
        assert_eq!(printed, "hi\n");
    }

    #[test]
    fn json_output() {
        let (output, errors, _) = session(
            "[1, 'a', {'k': 2.5}]\nlen\n",
            ReplOptions {
                json: true,
                ..ReplOptions::default()
            },
        );
        assert_eq!(output, "> [1,\"a\",{\"k\":2.5}]\n> > ");
        assert_eq!(
            errors,
            "JSON serialization failed: Unable to serialize value: <built-in function len>\n"
        );
    }
}
