// runner.rs - Executes a slice of compiled cells

use crate::primitives::{self, PRIMITIVES};
use crate::state::{Error, ProgramState, Result};
use crate::value::{RawFn, Value};

/// Executes the cells of one compiled word.
///
/// The runner keeps the slice it started on separately from its moving
/// cursor: `rec` replays by resetting the cursor to the initial slice, and
/// `ret` finishes early by zeroing the remaining length.  Cells are indices
/// into the shared code buffer rather than borrowed slices, because nearly
/// every cell needs the whole `ProgramState` mutably while it runs.
pub struct Runner {
    init_pos: usize,
    init_len: usize,
    pos: usize,
    len: usize,
}

impl Runner {
    /// A runner over `len` cells starting at `pos` in the code buffer.
    pub fn over(pos: usize, len: usize) -> Runner {
        Runner { init_pos: pos, init_len: len, pos, len }
    }

    /// Run every remaining cell.  The first error unwinds out of the word.
    pub fn run(&mut self, state: &mut ProgramState) -> Result<()> {
        while self.len > 0 {
            self.step(state)?;
        }
        Ok(())
    }

    fn step(&mut self, state: &mut ProgramState) -> Result<()> {
        let cell = *state.code.get(self.pos).ok_or(Error::CodeOutOfBounds)?;
        self.pos += 1;
        self.len -= 1;

        match cell {
            Value::Word(word_idx) => run_word(word_idx, state),
            Value::Primitive(prim_idx) => {
                let prim = PRIMITIVES.get(prim_idx).ok_or(Error::CodeOutOfBounds)?;
                (prim.run)(state)
            }
            Value::Syntax(_) => Err(Error::SyntaxInCompiledCode),
            Value::Number(number) => state.push(number),
            Value::RawFunction(raw) => self.run_raw(raw, state),
        }
    }

    fn run_raw(&mut self, raw: RawFn, state: &mut ProgramState) -> Result<()> {
        match raw {
            RawFn::Recurse => {
                self.pos = self.init_pos;
                self.len = self.init_len;
                Ok(())
            }
            RawFn::Return => {
                self.len = 0;
                Ok(())
            }
            RawFn::Skip => {
                let (flag, count) = state.pop2()?;
                if flag.is_zero() {
                    let skip = (count.pos() as usize).min(self.len);
                    self.pos += skip;
                    self.len -= skip;
                }
                Ok(())
            }
            RawFn::RepAnd => {
                let (reps, count) = state.pop2()?;
                let span = (count.pos() as usize).min(self.len);
                for _ in 0..reps.pos() {
                    Runner::over(self.pos, span).run(state)?;
                }
                self.pos += span;
                self.len -= span;
                state.push(reps)
            }
            RawFn::PrintRaw => {
                let index = state.pop1()?.pos() as usize;
                let text = state
                    .strings
                    .get(index)
                    .cloned()
                    .ok_or(Error::InvalidStringRef)?;
                state.print_str(&text);
                Ok(())
            }
            RawFn::PrintDefinition => {
                let word_idx = state.pop1()?.pos() as usize;
                print_definition(word_idx, state)
            }
        }
    }
}

/// Look a word up and run its slice of the code buffer to completion.
pub fn run_word(word_idx: usize, state: &mut ProgramState) -> Result<()> {
    let word = state.words.get(word_idx).ok_or(Error::CodeOutOfBounds)?;
    let (pos, len) = (word.code_pos, word.code_len);
    if pos + len > state.code.len() {
        return Err(Error::CodeOutOfBounds);
    }
    Runner::over(pos, len).run(state)
}

/// Pretty-print one user word the way it could be typed back in:
/// `: name ( desc ) body ;`.
pub fn print_definition(word_idx: usize, state: &mut ProgramState) -> Result<()> {
    use std::fmt::Write;

    let word = state.words.get(word_idx).ok_or(Error::CodeOutOfBounds)?;
    if word.code_pos + word.code_len > state.code.len() {
        return Err(Error::CodeOutOfBounds);
    }

    let mut text = String::new();
    let _ = write!(text, ": {} ", word.name);
    if !word.desc.is_empty() {
        let _ = write!(text, "( {} ) ", word.desc);
    }
    for cell in &state.code[word.code_pos..word.code_pos + word.code_len] {
        match *cell {
            Value::Word(idx) => {
                let name = state.words.get(idx).map(|w| w.name.as_str()).unwrap_or("?");
                let _ = write!(text, "{} ", name);
            }
            Value::Primitive(idx) => {
                let name = PRIMITIVES.get(idx).map(|p| p.name).unwrap_or("?");
                let _ = write!(text, "{} ", name);
            }
            Value::Syntax(idx) => {
                let name = crate::syntax::SYNTAX.get(idx).map(|s| s.name).unwrap_or("?");
                let _ = write!(text, "{} ", name);
            }
            Value::Number(number) => {
                let _ = write!(text, "{} ", number.sign());
            }
            Value::RawFunction(raw) => {
                let _ = write!(text, "{} ", raw.name());
            }
        }
    }
    text.push_str(";\n");
    state.print_str(&text);
    Ok(())
}

/// The primitive-table index of a named primitive; used by the compiler
/// when a form needs to emit a primitive cell directly.
pub(crate) fn primitive_index(name: &'static str) -> Result<usize> {
    primitives::lookup(name).ok_or(Error::CodeOutOfBounds)
}
