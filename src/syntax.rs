// syntax.rs - Context-sensitive forms that may consume following tokens
//
// Every form supplies three handlers, one per dispatcher mode.  Compile
// handlers report how many cells they emitted so that an enclosing `?`,
// `rep`, or `[` can treat the fragment as one unit.

use crate::interpreter::Interpreter;
use crate::runner::{self, Runner};
use crate::state::{Error, Result};
use crate::value::{pack_words, Num, RawFn, Value, WORD_BYTES};
use tracing::debug;

type ModeFn = fn(&mut Interpreter) -> Result<()>;
type CompileFn = fn(&mut Interpreter) -> Result<usize>;

/// A syntax form: a name, a help line, and one handler per mode.
pub struct SyntaxForm {
    pub name: &'static str,
    pub desc: &'static str,
    pub interpret: ModeFn,
    pub ignore: ModeFn,
    pub compile: CompileFn,
}

macro_rules! syntax_table {
    ( $( $name:literal, $desc:literal => $interpret:ident, $ignore:ident, $compile:ident; )* ) => {
        pub static SYNTAX: &[SyntaxForm] = &[
            $( SyntaxForm {
                name: $name,
                desc: $desc,
                interpret: $interpret,
                ignore: $ignore,
                compile: $compile,
            }, )*
        ];
    };
}

syntax_table! {
    "(", "start a comment running to the matching )" =>
        comment_interpret, comment_interpret, comment_compile;
    "\"", "start a string literal running to the next lone \"" =>
        string_interpret, string_ignore, string_compile;
    "hex", "read the next token as a hexadecimal number" =>
        hex_interpret, consume_one_token, hex_compile;
    "'", "read the next token as a short packed string" =>
        short_string_interpret, consume_one_token, short_string_compile;
    "help", "print the next word's documentation" =>
        help_interpret, consume_one_token, help_compile;
    "def", "print the next word's definition" =>
        def_interpret, consume_one_token, def_compile;
    "rec", "restart the current word body from its first token" =>
        rec_interpret, ignore_nothing, rec_compile;
    "ret", "leave the current word body" =>
        ret_interpret, ignore_nothing, ret_compile;
    "?", "run the next item only when the popped flag is not zero" =>
        skip_interpret, ignore_next_item, skip_compile;
    ":", "define a word: : name ( desc ) body ;" =>
        define_interpret, define_ignore, define_compile;
    "rep_and", "run the next item n times, then push n back" =>
        rep_and_interpret, ignore_next_item, rep_and_compile;
    "rep", "run the next item n times" =>
        rep_interpret, ignore_next_item, rep_compile;
    "[", "group tokens up to the matching ] into one item" =>
        block_interpret, block_ignore, block_compile;
}

/// Resolve a lexeme against the syntax table, newest entry first.
pub fn lookup(name: &str) -> Option<usize> {
    SYNTAX.iter().rposition(|form| form.name == name)
}

// ============================================================================
// COMMENTS
// ============================================================================

/// Consume tokens through the matching `)`.  Contents are not resolved, so
/// a comment may hold arbitrary prose; nested `(` tokens nest.
fn comment_interpret(interp: &mut Interpreter) -> Result<()> {
    let mut depth = 1usize;
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedComment);
        }
        interp.scanner.mark_handled();
        match token {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

fn comment_compile(interp: &mut Interpreter) -> Result<usize> {
    comment_interpret(interp)?;
    Ok(0)
}

// ============================================================================
// STRING LITERALS
// ============================================================================

/// Scan tokens up to the closing lone `"` and return the byte span of the
/// raw source between the first and last fragment.  The inter-fragment
/// bytes come along verbatim; nothing is re-inserted or normalised.
fn scan_string_span(interp: &mut Interpreter) -> Result<(usize, usize)> {
    let mut first: Option<usize> = None;
    let mut last_end = 0;
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedString);
        }
        let start = interp.scanner.token_start();
        interp.scanner.mark_handled();
        if token == "\"" {
            return Ok(match first {
                Some(begin) => (begin, last_end),
                None => (start, start),
            });
        }
        if first.is_none() {
            first = Some(start);
        }
        last_end = start + token.len();
    }
}

fn string_words(interp: &mut Interpreter) -> Result<Vec<Num>> {
    let (start, end) = scan_string_span(interp)?;
    let span = &interp.scanner.line()[start..end];
    Ok(pack_words(span.as_bytes()))
}

/// Push the packed words, then the word count.
fn string_interpret(interp: &mut Interpreter) -> Result<()> {
    let words = string_words(interp)?;
    let count = words.len() as u64;
    for word in words {
        interp.state.push(word)?;
    }
    interp.state.push(Num::from_pos(count))
}

fn string_compile(interp: &mut Interpreter) -> Result<usize> {
    let words = string_words(interp)?;
    let count = words.len();
    for word in words {
        interp.state.emit(Value::Number(word))?;
    }
    interp.state.emit(Value::Number(Num::from_pos(count as u64)))?;
    Ok(count + 1)
}

fn string_ignore(interp: &mut Interpreter) -> Result<()> {
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedString);
        }
        interp.scanner.mark_handled();
        if token == "\"" {
            return Ok(());
        }
    }
}

// ============================================================================
// HEX AND SHORT STRING LITERALS
// ============================================================================

/// At most eight hex digits: literals stay within the 32-bit range.
const HEX_MAX_DIGITS: usize = 8;

fn read_hex(interp: &mut Interpreter) -> Result<Num> {
    let token = interp.scanner.get_token();
    if token.is_empty() {
        return Err(Error::ExpectedWord);
    }
    if token.len() > HEX_MAX_DIGITS {
        return Err(Error::HexTooLong);
    }
    let mut value: u64 = 0;
    for byte in token.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(Error::BadHexDigit),
        };
        value = (value << 4) | digit as u64;
    }
    interp.scanner.mark_handled();
    Ok(Num::from_pos(value))
}

fn hex_interpret(interp: &mut Interpreter) -> Result<()> {
    let number = read_hex(interp)?;
    interp.state.push(number)
}

fn hex_compile(interp: &mut Interpreter) -> Result<usize> {
    let number = read_hex(interp)?;
    interp.state.emit(Value::Number(number))?;
    Ok(1)
}

fn read_short_string(interp: &mut Interpreter) -> Result<Num> {
    let token = interp.scanner.get_token();
    if token.is_empty() {
        return Err(Error::ExpectedWord);
    }
    if token.len() > WORD_BYTES {
        return Err(Error::ShortStringTooLong);
    }
    let packed = pack_words(token.as_bytes());
    interp.scanner.mark_handled();
    Ok(packed.first().copied().unwrap_or(Num::FALSE))
}

fn short_string_interpret(interp: &mut Interpreter) -> Result<()> {
    let number = read_short_string(interp)?;
    interp.state.push(number)
}

fn short_string_compile(interp: &mut Interpreter) -> Result<usize> {
    let number = read_short_string(interp)?;
    interp.state.emit(Value::Number(number))?;
    Ok(1)
}

/// Shared ignore handler for forms whose single operand needs no
/// validation when skipped.
fn consume_one_token(interp: &mut Interpreter) -> Result<()> {
    let token = interp.scanner.get_token();
    if token.is_empty() {
        return Err(Error::ExpectedWord);
    }
    interp.scanner.mark_handled();
    Ok(())
}

fn ignore_nothing(_interp: &mut Interpreter) -> Result<()> {
    Ok(())
}

// ============================================================================
// HELP AND DEF
// ============================================================================

fn read_target(interp: &mut Interpreter) -> Result<Value> {
    interp.read_value()?.ok_or(Error::ExpectedWord)
}

fn help_text(interp: &Interpreter, target: Value) -> String {
    match target {
        Value::Word(idx) => {
            let word = &interp.state.words[idx];
            format!("`{}`: {}\n", word.name, word.desc)
        }
        Value::Primitive(idx) => {
            let prim = &crate::primitives::PRIMITIVES[idx];
            format!("`{}`: {}\n", prim.name, prim.desc)
        }
        Value::Syntax(idx) => {
            let form = &SYNTAX[idx];
            format!("`{}`: {}\n", form.name, form.desc)
        }
        Value::Number(number) => {
            format!("Pushes the number {} to the stack\n", number.sign())
        }
        Value::RawFunction(raw) => format!("`{}`: internal opcode\n", raw.name()),
    }
}

fn help_interpret(interp: &mut Interpreter) -> Result<()> {
    let target = read_target(interp)?;
    let text = help_text(interp, target);
    interp.state.print_str(&text);
    Ok(())
}

/// Compiled help synthesises its text now and emits a push of the arena
/// index plus a raw print opcode, so running the word reproduces the same
/// output.
fn help_compile(interp: &mut Interpreter) -> Result<usize> {
    let target = read_target(interp)?;
    let text = help_text(interp, target);
    let index = interp.state.intern_string(text);
    interp.state.emit(Value::Number(Num::from_pos(index as u64)))?;
    interp.state.emit(Value::RawFunction(RawFn::PrintRaw))?;
    Ok(2)
}

fn def_placeholder(target: Value) -> String {
    match target {
        Value::Word(_) => String::new(),
        Value::Primitive(idx) => {
            format!("`{}` is a primitive\n", crate::primitives::PRIMITIVES[idx].name)
        }
        Value::Syntax(idx) => format!("`{}` is a syntax form\n", SYNTAX[idx].name),
        Value::Number(number) => format!("{} is a number\n", number.sign()),
        Value::RawFunction(raw) => format!("`{}` is an internal opcode\n", raw.name()),
    }
}

fn def_interpret(interp: &mut Interpreter) -> Result<()> {
    let target = read_target(interp)?;
    match target {
        Value::Word(idx) => runner::print_definition(idx, interp.state),
        other => {
            let text = def_placeholder(other);
            interp.state.print_str(&text);
            Ok(())
        }
    }
}

fn def_compile(interp: &mut Interpreter) -> Result<usize> {
    let target = read_target(interp)?;
    match target {
        Value::Word(idx) => {
            interp.state.emit(Value::Number(Num::from_pos(idx as u64)))?;
            interp.state.emit(Value::RawFunction(RawFn::PrintDefinition))?;
            Ok(2)
        }
        other => {
            let text = def_placeholder(other);
            let index = interp.state.intern_string(text);
            interp.state.emit(Value::Number(Num::from_pos(index as u64)))?;
            interp.state.emit(Value::RawFunction(RawFn::PrintRaw))?;
            Ok(2)
        }
    }
}

// ============================================================================
// REC AND RET
// ============================================================================

fn rec_interpret(_interp: &mut Interpreter) -> Result<()> {
    Err(Error::OutsideDefinition { name: "rec" })
}

fn rec_compile(interp: &mut Interpreter) -> Result<usize> {
    interp.state.emit(Value::RawFunction(RawFn::Recurse))?;
    Ok(1)
}

fn ret_interpret(_interp: &mut Interpreter) -> Result<()> {
    Err(Error::OutsideDefinition { name: "ret" })
}

fn ret_compile(interp: &mut Interpreter) -> Result<usize> {
    interp.state.emit(Value::RawFunction(RawFn::Return))?;
    Ok(1)
}

// ============================================================================
// CONDITIONAL SKIP
// ============================================================================

/// Interpreted `?` pops the flag and either runs or skips the next item.
/// A missing item at end of line is a no-op.
fn skip_interpret(interp: &mut Interpreter) -> Result<()> {
    let flag = interp.state.pop1()?;
    if flag.is_zero() {
        interp.ignore_next()?;
    } else {
        interp.run_next()?;
    }
    Ok(())
}

/// Shared ignore handler for forms whose following item must be skipped
/// along with them.
fn ignore_next_item(interp: &mut Interpreter) -> Result<()> {
    interp.ignore_next()?;
    Ok(())
}

/// Compiled `?` becomes `Number(len) skip <item>`: at run time the length
/// is pushed just before the skip opcode pops it together with the flag.
/// The length is backpatched once the item's cell count is known.
fn skip_compile(interp: &mut Interpreter) -> Result<usize> {
    let patch_pos = interp.state.code_len();
    interp.state.emit(Value::Number(Num::FALSE))?;
    interp.state.emit(Value::RawFunction(RawFn::Skip))?;
    let emitted = interp.compile_next()?.ok_or(Error::ExpectedWord)?;
    *interp.state.code.get_mut(patch_pos).ok_or(Error::CodeOutOfBounds)? =
        Value::Number(Num::from_pos(emitted as u64));
    Ok(emitted + 2)
}

// ============================================================================
// WORD DEFINITION
// ============================================================================

/// Collect the raw span of a `( ... )` description, nesting included,
/// without resolving its contents.
fn collect_desc(interp: &mut Interpreter) -> Result<String> {
    let mut depth = 1usize;
    let mut first: Option<usize> = None;
    let mut last_end = 0;
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedComment);
        }
        let start = interp.scanner.token_start();
        interp.scanner.mark_handled();
        match token {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        if first.is_none() {
            first = Some(start);
        }
        last_end = start + token.len();
    }
    Ok(match first {
        Some(begin) => interp.scanner.line()[begin..last_end].to_string(),
        None => String::new(),
    })
}

fn compile_body(interp: &mut Interpreter) -> Result<usize> {
    let mut total = 0;
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnterminatedDefinition);
        }
        if token == ";" {
            interp.scanner.mark_handled();
            return Ok(total);
        }
        total += interp.compile_next()?.ok_or(Error::UnterminatedDefinition)?;
    }
}

/// `: name ( desc ) body ;` — compile the body into the shared buffer and
/// publish a word over it.  Any failure rolls the buffer back to where the
/// definition started.
fn define_interpret(interp: &mut Interpreter) -> Result<()> {
    let name = {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::ExpectedWord);
        }
        interp.scanner.mark_handled();
        token.to_string()
    };

    let mut desc = String::new();
    if interp.scanner.get_token() == "(" {
        interp.scanner.mark_handled();
        desc = collect_desc(interp)?;
    }

    let code_start = interp.state.code_len();
    let body = compile_body(interp);
    match body {
        Ok(len) => {
            let published = interp.state.define_word(name, desc, code_start, len);
            if let Err(err) = published {
                interp.state.truncate_code(code_start);
                return Err(err);
            }
            debug!(
                word = interp.state.words.last().map(|w| w.name.as_str()).unwrap_or(""),
                cells = len,
                "defined word"
            );
            Ok(())
        }
        Err(err) => {
            interp.state.truncate_code(code_start);
            Err(err)
        }
    }
}

fn define_ignore(interp: &mut Interpreter) -> Result<()> {
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnterminatedDefinition);
        }
        interp.scanner.mark_handled();
        if token == ";" {
            return Ok(());
        }
    }
}

fn define_compile(_interp: &mut Interpreter) -> Result<usize> {
    Err(Error::ColonInsideDefinition)
}

// ============================================================================
// COUNTED REPETITION
// ============================================================================

fn rep_compile_and_run(interp: &mut Interpreter, code_start: usize, keep_count: bool) -> Result<()> {
    let emitted = interp.compile_next()?.ok_or(Error::ExpectedWord)?;
    let reps = interp.state.pop1()?;
    for _ in 0..reps.pos() {
        Runner::over(code_start, emitted).run(interp.state)?;
    }
    if keep_count {
        interp.state.push(reps)?;
    }
    Ok(())
}

/// Interpreted repetition compiles the next item into a temporary region at
/// the end of the code buffer, runs it, and truncates the region again
/// whether or not the runs succeeded.
fn rep_interpret_common(interp: &mut Interpreter, keep_count: bool) -> Result<()> {
    let code_start = interp.state.code_len();
    let result = rep_compile_and_run(interp, code_start, keep_count);
    interp.state.truncate_code(code_start);
    result
}

fn rep_and_interpret(interp: &mut Interpreter) -> Result<()> {
    rep_interpret_common(interp, true)
}

fn rep_interpret(interp: &mut Interpreter) -> Result<()> {
    rep_interpret_common(interp, false)
}

/// Compiled repetition becomes `Number(len) rep_and <item>`, with the
/// length backpatched; plain `rep` appends a `drop` for the count that
/// `rep_and` pushes back.
fn rep_compile_common(interp: &mut Interpreter, keep_count: bool) -> Result<usize> {
    let patch_pos = interp.state.code_len();
    interp.state.emit(Value::Number(Num::FALSE))?;
    interp.state.emit(Value::RawFunction(RawFn::RepAnd))?;
    let emitted = interp.compile_next()?.ok_or(Error::ExpectedWord)?;
    *interp.state.code.get_mut(patch_pos).ok_or(Error::CodeOutOfBounds)? =
        Value::Number(Num::from_pos(emitted as u64));
    if keep_count {
        Ok(emitted + 2)
    } else {
        let drop_idx = runner::primitive_index("drop")?;
        interp.state.emit(Value::Primitive(drop_idx))?;
        Ok(emitted + 3)
    }
}

fn rep_and_compile(interp: &mut Interpreter) -> Result<usize> {
    rep_compile_common(interp, true)
}

fn rep_compile(interp: &mut Interpreter) -> Result<usize> {
    rep_compile_common(interp, false)
}

// ============================================================================
// BLOCKS
// ============================================================================

fn block_interpret(interp: &mut Interpreter) -> Result<()> {
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedBlock);
        }
        if token == "]" {
            interp.scanner.mark_handled();
            return Ok(());
        }
        interp.run_next()?;
    }
}

fn block_ignore(interp: &mut Interpreter) -> Result<()> {
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedBlock);
        }
        if token == "]" {
            interp.scanner.mark_handled();
            return Ok(());
        }
        interp.ignore_next()?;
    }
}

/// A compiled block reports the summed cell count of its items, so an
/// enclosing `?` or `rep` skips or repeats the whole group.
fn block_compile(interp: &mut Interpreter) -> Result<usize> {
    let mut total = 0;
    loop {
        let token = interp.scanner.get_token();
        if token.is_empty() {
            return Err(Error::UnclosedBlock);
        }
        if token == "]" {
            interp.scanner.mark_handled();
            return Ok(total);
        }
        total += interp.compile_next()?.ok_or(Error::UnclosedBlock)?;
    }
}
