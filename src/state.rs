// state.rs - Shared interpreter state: stack, code buffer, word store

use crate::value::{Num, Value};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised while scanning, compiling, or running a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UndefinedWord,
    NumberTooLarge,
    StackLen { needed: usize },
    StackCapacity,
    CodeCapacity,
    WordCapacity,
    NameCapacity,
    DivisionByZero,
    NthZero,
    UnclosedComment,
    UnclosedString,
    UnclosedBlock,
    UnterminatedDefinition,
    ExpectedWord,
    OutsideDefinition { name: &'static str },
    ColonInsideDefinition,
    RawFunctionInterpreted,
    SyntaxInCompiledCode,
    CodeOutOfBounds,
    HexTooLong,
    BadHexDigit,
    ShortStringTooLong,
    InvalidStringRef,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UndefinedWord => write!(f, "undefined word"),
            Error::NumberTooLarge => write!(f, "number too large"),
            Error::StackLen { needed } => {
                write!(f, "stack length should be >= {}", needed)
            }
            Error::StackCapacity => write!(f, "stack capacity exceeded"),
            Error::CodeCapacity => write!(f, "code capacity exceeded"),
            Error::WordCapacity => write!(f, "word storage capacity exceeded"),
            Error::NameCapacity => write!(f, "name storage capacity exceeded"),
            Error::DivisionByZero => write!(f, "division by zero"),
            Error::NthZero => write!(f, "\"nth\" expects a non-zero index"),
            Error::UnclosedComment => write!(f, "unclosed comment"),
            Error::UnclosedString => write!(f, "unclosed string"),
            Error::UnclosedBlock => write!(f, "unclosed block"),
            Error::UnterminatedDefinition => write!(f, "unterminated word definition"),
            Error::ExpectedWord => write!(f, "expected following word"),
            Error::OutsideDefinition { name } => {
                write!(f, "\"{}\" used outside a word body", name)
            }
            Error::ColonInsideDefinition => write!(f, "\":\" used inside a word body"),
            Error::RawFunctionInterpreted => write!(f, "cannot interpret raw function"),
            Error::SyntaxInCompiledCode => {
                write!(f, "cannot run compiled syntax expression")
            }
            Error::CodeOutOfBounds => write!(f, "code reference out of bounds"),
            Error::HexTooLong => write!(f, "hex literal too long (at most eight digits)"),
            Error::BadHexDigit => write!(f, "non-hex character in hex literal"),
            Error::ShortStringTooLong => {
                write!(f, "short string literals hold at most eight characters")
            }
            Error::InvalidStringRef => write!(f, "invalid string reference"),
        }
    }
}

impl std::error::Error for Error {}

/// Storage limits.  `None` grows without bound (the hosted default); a
/// `Some` capacity makes the corresponding allocation fail with a capacity
/// error instead of growing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Maximum number of cells on the data stack.
    pub stack_capacity: Option<usize>,
    /// Maximum number of cells in the shared code buffer.
    pub code_capacity: Option<usize>,
    /// Maximum number of user word definitions.
    pub words_capacity: Option<usize>,
    /// Maximum total bytes of word names and descriptions.
    pub names_capacity: Option<usize>,
}

/// A user-defined word: a named, documented slice of the shared code buffer.
#[derive(Debug, Clone)]
pub struct Word {
    pub name: String,
    pub desc: String,
    pub code_pos: usize,
    pub code_len: usize,
}

/// Everything a program touches: the data stack, the shared code buffer,
/// the user-word store, the string arena backing compiled help text, and
/// the output buffer the REPL drains after each line.
pub struct ProgramState {
    pub stack: Vec<Num>,
    pub code: Vec<Value>,
    pub words: Vec<Word>,
    pub strings: Vec<String>,
    pub output: String,
    pub exit_requested: bool,
    config: Config,
    names_used: usize,
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramState {
    pub fn new() -> ProgramState {
        ProgramState::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> ProgramState {
        ProgramState {
            stack: Vec::new(),
            code: Vec::new(),
            words: Vec::new(),
            strings: Vec::new(),
            output: String::new(),
            exit_requested: false,
            config,
            names_used: 0,
        }
    }

    // ========================================================================
    // DATA STACK
    // ========================================================================

    /// Check that at least `n` entries are on the stack.
    pub fn need(&self, n: usize) -> Result<()> {
        if self.stack.len() < n {
            Err(Error::StackLen { needed: n })
        } else {
            Ok(())
        }
    }

    pub fn push(&mut self, value: Num) -> Result<()> {
        if let Some(cap) = self.config.stack_capacity {
            if self.stack.len() >= cap {
                return Err(Error::StackCapacity);
            }
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop1(&mut self) -> Result<Num> {
        self.stack.pop().ok_or(Error::StackLen { needed: 1 })
    }

    /// Pop two entries; the first of the pair was the deeper one.
    pub fn pop2(&mut self) -> Result<(Num, Num)> {
        self.need(2)?;
        let b = self.stack.pop().ok_or(Error::StackLen { needed: 2 })?;
        let a = self.stack.pop().ok_or(Error::StackLen { needed: 2 })?;
        Ok((a, b))
    }

    /// Pop three entries, deepest first.
    pub fn pop3(&mut self) -> Result<(Num, Num, Num)> {
        self.need(3)?;
        let c = self.stack.pop().ok_or(Error::StackLen { needed: 3 })?;
        let b = self.stack.pop().ok_or(Error::StackLen { needed: 3 })?;
        let a = self.stack.pop().ok_or(Error::StackLen { needed: 3 })?;
        Ok((a, b, c))
    }

    pub fn peek(&self) -> Result<Num> {
        self.stack.last().copied().ok_or(Error::StackLen { needed: 1 })
    }

    // ========================================================================
    // CODE BUFFER
    // ========================================================================

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Append one cell to the shared code buffer.
    pub fn emit(&mut self, cell: Value) -> Result<()> {
        if let Some(cap) = self.config.code_capacity {
            if self.code.len() >= cap {
                return Err(Error::CodeCapacity);
            }
        }
        self.code.push(cell);
        Ok(())
    }

    /// Roll the code buffer back to `len` cells.  Every syntactic form that
    /// compiles a variable-length fragment snapshots the length on entry and
    /// truncates back to it on any failure path.
    pub fn truncate_code(&mut self, len: usize) {
        self.code.truncate(len);
    }

    // ========================================================================
    // WORD STORE
    // ========================================================================

    /// Find a user word by name, newest first, so redefinition shadows
    /// earlier definitions without deleting them.
    pub fn lookup_word(&self, name: &str) -> Option<usize> {
        self.words.iter().rposition(|w| w.name == name)
    }

    /// Publish a new word over `[code_pos, code_pos + code_len)`.  The body
    /// must already be in the code buffer; on a capacity failure the caller
    /// is responsible for rolling the buffer back.
    pub fn define_word(
        &mut self,
        name: String,
        desc: String,
        code_pos: usize,
        code_len: usize,
    ) -> Result<()> {
        if let Some(cap) = self.config.words_capacity {
            if self.words.len() >= cap {
                return Err(Error::WordCapacity);
            }
        }
        let name_bytes = name.len() + desc.len();
        if let Some(cap) = self.config.names_capacity {
            if self.names_used + name_bytes > cap {
                return Err(Error::NameCapacity);
            }
        }
        self.names_used += name_bytes;
        self.words.push(Word { name, desc, code_pos, code_len });
        Ok(())
    }

    // ========================================================================
    // STRING ARENA AND OUTPUT
    // ========================================================================

    /// Store a compiler-synthesised text and return its arena index.  Only
    /// `help` and `def` compilation allocate here.
    pub fn intern_string(&mut self, text: String) -> usize {
        self.strings.push(text);
        self.strings.len() - 1
    }

    pub fn print_str(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Print a number the default way: signed, with one trailing space.
    pub fn print_num(&mut self, value: Num) {
        use std::fmt::Write;
        let _ = write!(self.output, "{} ", value.sign());
    }

    /// Take the accumulated output, leaving the buffer empty.  The REPL
    /// drains this after every line.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}
