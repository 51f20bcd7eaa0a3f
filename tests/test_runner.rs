use mieliepit::interpreter::{interpret_line, load_prelude};
use mieliepit::runner::{run_word, Runner};
use mieliepit::state::{Error, ProgramState};
use mieliepit::value::{Num, RawFn, Value};

fn eval(state: &mut ProgramState, line: &str) {
    interpret_line(state, line).unwrap();
}

fn signs(state: &ProgramState) -> Vec<i64> {
    state.stack.iter().map(|n| n.sign()).collect()
}

#[test]
fn test_runner_executes_a_slice() {
    let mut state = ProgramState::new();
    state.code.push(Value::Number(Num::from_sign(2)));
    state.code.push(Value::Number(Num::from_sign(3)));
    let add = mieliepit::primitives::lookup("+").unwrap();
    state.code.push(Value::Primitive(add));

    Runner::over(0, 3).run(&mut state).unwrap();
    assert_eq!(signs(&state), vec![5]);
}

#[test]
fn test_ret_skips_the_rest_of_the_word() {
    let mut state = ProgramState::new();
    eval(&mut state, ": early 1 ret 2 ; early");
    assert_eq!(signs(&state), vec![1]);
}

#[test]
fn test_rec_is_a_tail_replay() {
    let mut state = ProgramState::new();
    eval(&mut state, ": countdown dup print dup 0 = ? ret dec rec ;");
    eval(&mut state, "5 countdown");
    assert_eq!(state.take_output(), "5 4 3 2 1 0 ");
    assert_eq!(signs(&state), vec![0]);
}

#[test]
fn test_words_nest_through_the_host_stack() {
    let mut state = ProgramState::new();
    eval(&mut state, ": a 1 + ; : b a a ; : c b b ;");
    eval(&mut state, "0 c");
    assert_eq!(signs(&state), vec![4]);
}

#[test]
fn test_syntax_cell_in_a_runner_is_an_error() {
    let mut state = ProgramState::new();
    state.code.push(Value::Syntax(0));
    state.define_word("bad".to_string(), String::new(), 0, 1).unwrap();
    assert_eq!(
        interpret_line(&mut state, "bad"),
        Err(Error::SyntaxInCompiledCode)
    );
}

#[test]
fn test_run_word_checks_the_slice_bounds() {
    let mut state = ProgramState::new();
    state.define_word("broken".to_string(), String::new(), 0, 4).unwrap();
    assert_eq!(run_word(0, &mut state), Err(Error::CodeOutOfBounds));
}

#[test]
fn test_compiled_rep_and_replays_its_region() {
    let mut state = ProgramState::new();
    eval(&mut state, ": grow 3 rep_and [ dup + ] ; 1 grow");
    // 1 doubled three times, with the count pushed back on top.
    assert_eq!(signs(&state), vec![8, 3]);
}

#[test]
fn test_print_raw_requires_a_valid_arena_index() {
    let mut state = ProgramState::new();
    state.code.push(Value::Number(Num::from_pos(99)));
    state.code.push(Value::RawFunction(RawFn::PrintRaw));
    state.define_word("bad".to_string(), String::new(), 0, 2).unwrap();
    assert_eq!(interpret_line(&mut state, "bad"), Err(Error::InvalidStringRef));
}

#[test]
fn test_print_definition_opcode() {
    let mut state = ProgramState::new();
    eval(&mut state, ": sq ( n -- n*n ) dup * ;");
    state.code.push(Value::Number(Num::from_pos(0)));
    state.code.push(Value::RawFunction(RawFn::PrintDefinition));
    let pos = state.code_len() - 2;
    state.define_word("show".to_string(), String::new(), pos, 2).unwrap();
    eval(&mut state, "show");
    assert_eq!(state.take_output(), ": sq ( n -- n*n ) dup * ;\n");
}

#[test]
fn test_clear_recurses_until_the_stack_is_empty() {
    let mut state = ProgramState::new();
    load_prelude(&mut state).unwrap();
    eval(&mut state, "1 2 3 4 5 clear");
    assert!(state.stack.is_empty());
}

#[test]
fn test_raw_function_names() {
    assert_eq!(RawFn::Recurse.name(), "rec");
    assert_eq!(RawFn::Return.name(), "ret");
    assert_eq!(RawFn::Skip.name(), "?");
    assert_eq!(RawFn::RepAnd.name(), "rep_and");
    assert_eq!(RawFn::PrintRaw.name(), "<internal:print_raw>");
    assert_eq!(RawFn::PrintDefinition.name(), "<internal:print_definition>");
}
