// interpreter.rs - Tri-modal token dispatcher and line entry points

use crate::primitives::{self, PRIMITIVES};
use crate::runner;
use crate::scanner::Scanner;
use crate::state::{Error, ProgramState, Result};
use crate::syntax::{self, SYNTAX};
use crate::value::{Num, Value};
use std::fmt::Write;
use tracing::trace;

/// The prelude compiled silently at startup.  User programs may rely on
/// every word it defines, in this order.
pub const PRELUDE: &str = include_str!("prelude.mp");

/// What the dispatcher does with each classified token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Run,
    Compile,
    Ignore,
}

/// Drives the scanner over one line, classifying each lexeme and running,
/// compiling, or ignoring it.  Syntax forms get handed the whole
/// interpreter so they can consume further tokens and recurse into the
/// compiler.
pub struct Interpreter<'a> {
    pub scanner: Scanner<'a>,
    pub action: Action,
    pub state: &'a mut ProgramState,
}

impl<'a> Interpreter<'a> {
    pub fn new(line: &'a str, state: &'a mut ProgramState) -> Interpreter<'a> {
        Interpreter {
            scanner: Scanner::new(line),
            action: Action::Run,
            state,
        }
    }

    /// Classify the pending lexeme: user word first (newest shadowing
    /// oldest), then primitive, then syntax form, then decimal number.
    /// `Ok(None)` means the line is exhausted.  A successful classification
    /// claims the token; a failed candidate class leaves it for the next.
    pub fn read_value(&mut self) -> Result<Option<Value>> {
        let text = self.scanner.get_token();
        if text.is_empty() {
            return Ok(None);
        }
        if let Some(idx) = self.state.lookup_word(text) {
            self.scanner.mark_handled();
            return Ok(Some(Value::Word(idx)));
        }
        if let Some(idx) = primitives::lookup(text) {
            self.scanner.mark_handled();
            return Ok(Some(Value::Primitive(idx)));
        }
        if let Some(idx) = syntax::lookup(text) {
            self.scanner.mark_handled();
            return Ok(Some(Value::Syntax(idx)));
        }
        if let Some(number) = parse_number(text)? {
            self.scanner.mark_handled();
            return Ok(Some(Value::Number(number)));
        }
        Err(Error::UndefinedWord)
    }

    /// Process one token according to the current action.  Returns false
    /// once the line is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        match self.action {
            Action::Run => self.run_next(),
            Action::Compile => Ok(self.compile_next()?.is_some()),
            Action::Ignore => self.ignore_next(),
        }
    }

    pub fn run_next(&mut self) -> Result<bool> {
        match self.read_value()? {
            None => Ok(false),
            Some(value) => {
                self.run_value(value)?;
                Ok(true)
            }
        }
    }

    fn run_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Word(idx) => runner::run_word(idx, self.state),
            Value::Primitive(idx) => {
                let prim = PRIMITIVES.get(idx).ok_or(Error::CodeOutOfBounds)?;
                (prim.run)(self.state)
            }
            Value::Syntax(idx) => {
                let form = SYNTAX.get(idx).ok_or(Error::CodeOutOfBounds)?;
                (form.interpret)(self)
            }
            Value::Number(number) => self.state.push(number),
            Value::RawFunction(_) => Err(Error::RawFunctionInterpreted),
        }
    }

    /// Compile one token, reporting how many cells it emitted so enclosing
    /// forms can treat the fragment as a unit.  `Ok(None)` at end of line.
    pub fn compile_next(&mut self) -> Result<Option<usize>> {
        match self.read_value()? {
            None => Ok(None),
            Some(value) => Ok(Some(self.compile_value(value)?)),
        }
    }

    fn compile_value(&mut self, value: Value) -> Result<usize> {
        match value {
            Value::Word(idx) => {
                self.state.emit(Value::Word(idx))?;
                Ok(1)
            }
            Value::Primitive(idx) => {
                self.state.emit(Value::Primitive(idx))?;
                Ok(1)
            }
            Value::Syntax(idx) => {
                let form = SYNTAX.get(idx).ok_or(Error::CodeOutOfBounds)?;
                (form.compile)(self)
            }
            Value::Number(number) => {
                self.state.emit(Value::Number(number))?;
                Ok(1)
            }
            Value::RawFunction(_) => Err(Error::RawFunctionInterpreted),
        }
    }

    /// Skip one token.  Syntax forms still get a say so that a skipped
    /// `(`, `"`, or `[` consumes everything through its terminator.
    pub fn ignore_next(&mut self) -> Result<bool> {
        match self.read_value()? {
            None => Ok(false),
            Some(value) => {
                if let Value::Syntax(idx) = value {
                    let form = SYNTAX.get(idx).ok_or(Error::CodeOutOfBounds)?;
                    (form.ignore)(self)?;
                }
                Ok(true)
            }
        }
    }

    /// Render an error report into the output buffer: a blank line, the
    /// error text, and where in the line the failing lexeme started.
    fn report_error(&mut self, err: &Error) {
        let token = self.scanner.token_text();
        let out = &mut self.state.output;
        let _ = write!(out, "\nError: {}\n", err);
        if token.is_empty() {
            out.push_str("@ end of line\n");
        } else {
            let _ = writeln!(out, "@ word starting at {}: {}", self.scanner.token_start(), token);
        }
    }
}

/// Parse a decimal literal through the unsigned view.  `Ok(None)` when the
/// text is not all digits; overflow is a hard error rather than a fall
/// through to "undefined word".
fn parse_number(text: &str) -> Result<Option<Num>> {
    let mut value: u64 = 0;
    for byte in text.bytes() {
        if !byte.is_ascii_digit() {
            return Ok(None);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((byte - b'0') as u64))
            .ok_or(Error::NumberTooLarge)?;
    }
    Ok(Some(Num::from_pos(value)))
}

/// Interpret one line against the state.  Any error is rendered into the
/// output buffer before being returned, so callers use the result only for
/// control flow and must not report it again.
pub fn interpret_line(state: &mut ProgramState, line: &str) -> Result<()> {
    trace!(line, "interpreting");
    let mut interp = Interpreter::new(line, state);
    loop {
        match interp.advance() {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(err) => {
                interp.report_error(&err);
                return Err(err);
            }
        }
    }
}

/// Compile the startup prelude.  Unlike `interpret_line` this propagates
/// errors without rendering them; a failure here is a host bug, not a user
/// mistake.
pub fn load_prelude(state: &mut ProgramState) -> Result<()> {
    for line in PRELUDE.lines() {
        let mut interp = Interpreter::new(line, state);
        while interp.advance()? {}
    }
    Ok(())
}
