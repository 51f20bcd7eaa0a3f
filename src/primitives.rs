// primitives.rs - Built-in stack, arithmetic, bitwise, output and
// reflective operations

use crate::state::{Error, ProgramState, Result};
use crate::syntax;
use crate::value::{Num, WORD_BYTES};

/// A built-in operation: a name, a help line, and the host function that
/// implements it.
pub struct Primitive {
    pub name: &'static str,
    pub desc: &'static str,
    pub run: fn(&mut ProgramState) -> Result<()>,
}

/// Declare the primitive table in one place.
macro_rules! primitive_table {
    ( $( $name:literal, $desc:literal => $fun:ident; )* ) => {
        pub static PRIMITIVES: &[Primitive] = &[
            $( Primitive { name: $name, desc: $desc, run: $fun }, )*
        ];
    };
}

primitive_table! {
    // Stack
    ".", "( -- ) print the stack, up to the top sixteen entries" => prim_show_stack;
    "stack_len", "( -- n ) push the number of entries on the stack" => prim_stack_len;
    "dup", "( a -- a a ) duplicate the top entry" => prim_dup;
    "swap", "( a b -- b a ) exchange the top two entries" => prim_swap;
    "rot", "( a b c -- b c a ) rotate the third entry to the top" => prim_rot;
    "unrot", "( a b c -- c a b ) rotate the top entry down to third" => prim_unrot;
    "rev", "( a b c -- c b a ) reverse the top three entries" => prim_rev;
    "drop", "( a -- ) discard the top entry" => prim_drop;
    "rev_n", "( ... n -- ... ) reverse the top n entries in place" => prim_rev_n;
    "nth", "( ... n -- ... x ) copy the n-th entry from the top, 1-based" => prim_nth;

    // Arithmetic
    "inc", "( a -- a+1 ) increment" => prim_inc;
    "dec", "( a -- a-1 ) decrement" => prim_dec;
    "+", "( a b -- a+b ) add" => prim_add;
    "*", "( a b -- a*b ) multiply" => prim_mul;
    "/", "( a b -- a/b ) signed division" => prim_div;

    // Bitwise
    "shl", "( a n -- a<<n ) shift left, zero once n reaches the word size" => prim_shl;
    "shr", "( a n -- a>>n ) shift right, zero once n reaches the word size" => prim_shr;
    "or", "( a b -- a|b ) bitwise or" => prim_or;
    "and", "( a b -- a&b ) bitwise and" => prim_and;
    "xor", "( a b -- a^b ) bitwise exclusive or" => prim_xor;
    "not", "( a -- ~a ) bitwise complement" => prim_not;

    // Comparison
    "=", "( a b -- flag ) true when the entries are equal" => prim_eq;
    "<", "( a b -- flag ) true when a is less than b, signed" => prim_lt;

    // Literals
    "true", "( -- -1 ) push true, all bits set" => prim_true;
    "false", "( -- 0 ) push false" => prim_false;

    // Output
    "print", "( a -- ) print signed, with a trailing space" => prim_print;
    "pstr", "( a -- ) print up to eight packed characters, stopping at NUL" => prim_pstr;
    "print_string", "( ... n -- ) print n packed string words" => prim_print_string;

    // System
    "exit", "( -- ) leave the read loop" => prim_exit;
    "quit", "( -- ) leave the read loop" => prim_exit;

    // Reflective
    "syntax", "( -- ) list the syntax forms" => prim_list_syntax;
    "primitives", "( -- ) list the primitives" => prim_list_primitives;
    "words", "( -- ) list the user-defined words" => prim_list_words;
    "guide", "( -- ) print an introduction to the language" => prim_guide;
}

/// Resolve a lexeme against the primitive table, newest entry first.
pub fn lookup(name: &str) -> Option<usize> {
    PRIMITIVES.iter().rposition(|p| p.name == name)
}

// ============================================================================
// STACK
// ============================================================================

/// How many entries `.` will show before eliding the rest.
const SHOW_STACK_MAX: usize = 16;

fn prim_show_stack(state: &mut ProgramState) -> Result<()> {
    if state.stack.is_empty() {
        state.print_str("empty.\n");
        return Ok(());
    }
    if state.stack.len() > SHOW_STACK_MAX {
        state.print_str("... ");
    }
    let shown: Vec<Num> = state.stack.iter().rev().take(SHOW_STACK_MAX).copied().collect();
    for value in shown {
        state.print_num(value);
    }
    state.print_str("\n");
    Ok(())
}

fn prim_stack_len(state: &mut ProgramState) -> Result<()> {
    let len = state.stack.len() as u64;
    state.push(Num::from_pos(len))
}

fn prim_dup(state: &mut ProgramState) -> Result<()> {
    let top = state.peek()?;
    state.push(top)
}

fn prim_swap(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(b)?;
    state.push(a)
}

fn prim_rot(state: &mut ProgramState) -> Result<()> {
    let (a, b, c) = state.pop3()?;
    state.push(b)?;
    state.push(c)?;
    state.push(a)
}

fn prim_unrot(state: &mut ProgramState) -> Result<()> {
    let (a, b, c) = state.pop3()?;
    state.push(c)?;
    state.push(a)?;
    state.push(b)
}

fn prim_rev(state: &mut ProgramState) -> Result<()> {
    let (a, b, c) = state.pop3()?;
    state.push(c)?;
    state.push(b)?;
    state.push(a)
}

fn prim_drop(state: &mut ProgramState) -> Result<()> {
    state.pop1()?;
    Ok(())
}

fn prim_rev_n(state: &mut ProgramState) -> Result<()> {
    let n = state.pop1()?.pos() as usize;
    state.need(n)?;
    let len = state.stack.len();
    state.stack[len - n..].reverse();
    Ok(())
}

fn prim_nth(state: &mut ProgramState) -> Result<()> {
    let n = state.pop1()?.pos() as usize;
    if n == 0 {
        return Err(Error::NthZero);
    }
    state.need(n)?;
    let copy = state.stack[state.stack.len() - n];
    state.push(copy)
}

// ============================================================================
// ARITHMETIC AND BITWISE
// ============================================================================

fn prim_inc(state: &mut ProgramState) -> Result<()> {
    let a = state.pop1()?;
    state.push(Num::from_pos(a.pos().wrapping_add(1)))
}

fn prim_dec(state: &mut ProgramState) -> Result<()> {
    let a = state.pop1()?;
    state.push(Num::from_pos(a.pos().wrapping_sub(1)))
}

fn prim_add(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_pos(a.pos().wrapping_add(b.pos())))
}

fn prim_mul(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_pos(a.pos().wrapping_mul(b.pos())))
}

fn prim_div(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    if b.sign() == 0 {
        return Err(Error::DivisionByZero);
    }
    state.push(Num::from_sign(a.sign().wrapping_div(b.sign())))
}

fn prim_shl(state: &mut ProgramState) -> Result<()> {
    let (a, n) = state.pop2()?;
    let shifted = if n.pos() >= u64::BITS as u64 { 0 } else { a.pos() << n.pos() };
    state.push(Num::from_pos(shifted))
}

fn prim_shr(state: &mut ProgramState) -> Result<()> {
    let (a, n) = state.pop2()?;
    let shifted = if n.pos() >= u64::BITS as u64 { 0 } else { a.pos() >> n.pos() };
    state.push(Num::from_pos(shifted))
}

fn prim_or(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_pos(a.pos() | b.pos()))
}

fn prim_and(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_pos(a.pos() & b.pos()))
}

fn prim_xor(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_pos(a.pos() ^ b.pos()))
}

fn prim_not(state: &mut ProgramState) -> Result<()> {
    let a = state.pop1()?;
    state.push(Num::from_pos(!a.pos()))
}

// ============================================================================
// COMPARISON AND LITERALS
// ============================================================================

fn prim_eq(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_flag(a.pos() == b.pos()))
}

fn prim_lt(state: &mut ProgramState) -> Result<()> {
    let (a, b) = state.pop2()?;
    state.push(Num::from_flag(a.sign() < b.sign()))
}

fn prim_true(state: &mut ProgramState) -> Result<()> {
    state.push(Num::TRUE)
}

fn prim_false(state: &mut ProgramState) -> Result<()> {
    state.push(Num::FALSE)
}

// ============================================================================
// OUTPUT
// ============================================================================

fn prim_print(state: &mut ProgramState) -> Result<()> {
    let a = state.pop1()?;
    state.print_num(a);
    Ok(())
}

fn prim_pstr(state: &mut ProgramState) -> Result<()> {
    let a = state.pop1()?;
    let bytes: Vec<u8> = a
        .pos()
        .to_le_bytes()
        .iter()
        .copied()
        .take_while(|&b| b != 0)
        .collect();
    let text = String::from_utf8_lossy(&bytes).into_owned();
    state.print_str(&text);
    Ok(())
}

fn prim_print_string(state: &mut ProgramState) -> Result<()> {
    let n = state.pop1()?.pos() as usize;
    state.need(n)?;
    let mut packed = Vec::with_capacity(n);
    for _ in 0..n {
        packed.push(state.pop1()?);
    }
    packed.reverse();
    let mut bytes: Vec<u8> = Vec::with_capacity(n * WORD_BYTES);
    for word in packed {
        bytes.extend_from_slice(&word.pos().to_le_bytes());
    }
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    let text = String::from_utf8_lossy(&bytes).into_owned();
    state.print_str(&text);
    Ok(())
}

// ============================================================================
// SYSTEM AND REFLECTION
// ============================================================================

fn prim_exit(state: &mut ProgramState) -> Result<()> {
    state.exit_requested = true;
    Ok(())
}

fn prim_list_syntax(state: &mut ProgramState) -> Result<()> {
    let listing = syntax::SYNTAX
        .iter()
        .map(|form| form.name)
        .collect::<Vec<_>>()
        .join(" ");
    state.print_str(&listing);
    state.print_str("\n");
    Ok(())
}

fn prim_list_primitives(state: &mut ProgramState) -> Result<()> {
    let listing = PRIMITIVES
        .iter()
        .map(|prim| prim.name)
        .collect::<Vec<_>>()
        .join(" ");
    state.print_str(&listing);
    state.print_str("\n");
    Ok(())
}

fn prim_list_words(state: &mut ProgramState) -> Result<()> {
    let listing = state
        .words
        .iter()
        .map(|word| word.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    state.print_str(&listing);
    state.print_str("\n");
    Ok(())
}

const GUIDE: &str = "\
mieliepit is a stack language: each token on a line either pushes a number
or runs a word against the stack.

  3 4 + .                    add, then show the stack
  : sq ( n -- n*n ) dup * ;  define a word with a documentation comment
  5 sq .                     use it
  flag ? word                run word only when flag is not zero
  n rep word                 run word n times
  [ ... ]                    group several tokens into one unit for ? or rep
  rec / ret                  restart or leave the current word body
  hex FF  ' abc  \" text \"    hex, short string, and string literals

help <word> shows one word's documentation; def <word> shows a definition.
words, primitives and syntax list everything there is; exit or quit leaves.
";

fn prim_guide(state: &mut ProgramState) -> Result<()> {
    state.print_str(GUIDE);
    Ok(())
}
