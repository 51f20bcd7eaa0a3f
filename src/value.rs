// value.rs - Machine words and compiled-code cells

use std::fmt;

/// Number of bytes in a machine word.  Short string literals and the
/// per-word packing of `"` string literals are sized by this.
pub const WORD_BYTES: usize = 8;

/// One machine word, viewable as unsigned (`pos`) or signed (`sign`).
///
/// Bitwise and address operations go through the unsigned view; comparison
/// and printing go through the signed view.  Boolean true is all-ones so
/// that `not` flips truth values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Num(u64);

impl Num {
    pub const FALSE: Num = Num(0);
    pub const TRUE: Num = Num(u64::MAX);

    pub fn from_pos(pos: u64) -> Num {
        Num(pos)
    }

    pub fn from_sign(sign: i64) -> Num {
        Num(sign as u64)
    }

    pub fn from_flag(flag: bool) -> Num {
        if flag { Num::TRUE } else { Num::FALSE }
    }

    pub fn pos(self) -> u64 {
        self.0
    }

    pub fn sign(self) -> i64 {
        self.0 as i64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Printing defaults to the signed view.
impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sign())
    }
}

impl fmt::Debug for Num {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.sign(), self.pos())
    }
}

/// A synthetic opcode.  These cells are emitted by the compiler to implement
/// control flow and reflective printing at run time; the scanner never
/// produces one, so a user program cannot name them directly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RawFn {
    /// Reset the runner to the start of the current word (tail replay).
    Recurse,
    /// Skip the remainder of the current word.
    Return,
    /// Pop a cell count and a flag; if the flag is zero, advance past the
    /// counted cells.
    Skip,
    /// Pop a cell count and a repetition count, run the counted cells that
    /// many times, then push the repetition count back.
    RepAnd,
    /// Pop a string-arena index and print the referenced text.
    PrintRaw,
    /// Pop a word index and pretty-print that word's definition.
    PrintDefinition,
}

impl RawFn {
    pub fn name(self) -> &'static str {
        match self {
            RawFn::Recurse => "rec",
            RawFn::Return => "ret",
            RawFn::Skip => "?",
            RawFn::RepAnd => "rep_and",
            RawFn::PrintRaw => "<internal:print_raw>",
            RawFn::PrintDefinition => "<internal:print_definition>",
        }
    }
}

/// One cell of compiled code.
///
/// `Syntax` only appears transiently while a line is being compiled; a
/// published word body never contains one, and the runner reports an error
/// if it ever encounters one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Value {
    /// Index into the user-word store.
    Word(usize),
    /// Index into the primitive table.
    Primitive(usize),
    /// Index into the syntax-form table.
    Syntax(usize),
    /// A machine-word literal.
    Number(Num),
    /// A synthetic opcode.
    RawFunction(RawFn),
}

/// Pack raw bytes into machine words, `WORD_BYTES` per word, first byte in
/// the least significant position, the last word padded with zeroes.  This
/// is the layout both `'` and `"` literals use, and the one `pstr` and
/// `print_string` unpack.
pub fn pack_words(bytes: &[u8]) -> Vec<Num> {
    bytes
        .chunks(WORD_BYTES)
        .map(|chunk| {
            let mut value: u64 = 0;
            for &byte in chunk.iter().rev() {
                value = (value << 8) | byte as u64;
            }
            Num::from_pos(value)
        })
        .collect()
}
