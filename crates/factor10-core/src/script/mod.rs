//! The factory scripting language.
//!
//! A small JavaScript-flavored language: declarations, control flow,
//! arithmetic, and calls. Scripts reach the outside world only through a
//! [`ScriptHost`], which decides which global functions exist and what
//! methods objects answer to.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

use std::fmt;

pub use value::{ObjectRef, Value};

/// 1-based position in script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A script failed to compile or to run to completion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("syntax error at {span}: {message}")]
    Syntax { span: Span, message: String },

    #[error("runtime error at {span}: {message}")]
    Runtime { span: Span, message: String },

    #[error("script exceeded {limit} evaluation steps (at {span})")]
    StepLimit { span: Span, limit: u64 },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Syntax { span, .. }
            | CompileError::Runtime { span, .. }
            | CompileError::StepLimit { span, .. } => *span,
        }
    }
}

/// The environment a script runs against.
///
/// Host errors are plain messages; the interpreter attaches the source
/// position of the failing call.
pub trait ScriptHost {
    /// Whether `name` is a callable global.
    fn has_function(&self, name: &str) -> bool;

    fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, String>;

    fn call_method(
        &mut self,
        receiver: ObjectRef,
        method: &str,
        args: &[Value],
    ) -> Result<Value, String>;
}

/// Tokenize, parse, and run `src` against `host`, evaluating at most
/// `max_steps` statements and expressions.
pub fn execute<H: ScriptHost>(src: &str, host: &mut H, max_steps: u64) -> Result<(), CompileError> {
    let tokens = lexer::tokenize(src)?;
    let program = parser::parse(tokens)?;
    interpreter::Interpreter::new(host, max_steps).run(&program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_displays_line_and_column() {
        assert_eq!(Span::new(3, 14).to_string(), "3:14");
    }

    #[test]
    fn error_message_includes_position() {
        let err = CompileError::Runtime {
            span: Span::new(2, 5),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "runtime error at 2:5: boom");
        assert_eq!(err.span(), Span::new(2, 5));
    }
}
