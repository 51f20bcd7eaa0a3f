use mieliepit::interpreter::interpret_line;
use mieliepit::state::{Error, ProgramState};
use mieliepit::value::pack_words;

fn eval(state: &mut ProgramState, line: &str) {
    interpret_line(state, line).unwrap();
}

fn eval_err(state: &mut ProgramState, line: &str) -> Error {
    interpret_line(state, line).unwrap_err()
}

fn signs(state: &ProgramState) -> Vec<i64> {
    state.stack.iter().map(|n| n.sign()).collect()
}

// ============================================================================
// COMMENTS
// ============================================================================

#[test]
fn test_comment_contents_are_not_resolved() {
    let mut state = ProgramState::new();
    eval(&mut state, "( this prose would never parse ) 5");
    assert_eq!(signs(&state), vec![5]);
}

#[test]
fn test_comments_nest() {
    let mut state = ProgramState::new();
    eval(&mut state, "( outer ( inner ) still a comment ) 1");
    assert_eq!(signs(&state), vec![1]);
}

#[test]
fn test_unclosed_comment() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "( never closed"), Error::UnclosedComment);
    assert!(state.take_output().contains("@ end of line"));
}

#[test]
fn test_comment_compiles_to_nothing() {
    let mut state = ProgramState::new();
    eval(&mut state, ": f 1 ( ignored words ) 2 ;");
    assert_eq!(state.words.last().unwrap().code_len, 2);
}

// ============================================================================
// STRING LITERALS
// ============================================================================

#[test]
fn test_short_string_packing() {
    let mut state = ProgramState::new();
    eval(&mut state, "' abc");
    assert_eq!(state.stack[0].pos(), 0x636261);
}

#[test]
fn test_short_string_full_word() {
    let mut state = ProgramState::new();
    eval(&mut state, "' abcdefgh");
    assert_eq!(state.stack[0].pos(), u64::from_le_bytes(*b"abcdefgh"));
}

#[test]
fn test_short_string_overlength() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "' abcdefghi"), Error::ShortStringTooLong);
}

#[test]
fn test_short_string_needs_a_token() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "'"), Error::ExpectedWord);
}

#[test]
fn test_string_pushes_words_then_count() {
    let mut state = ProgramState::new();
    eval(&mut state, "\" abc \"");
    assert_eq!(state.stack.len(), 2);
    assert_eq!(state.stack[0].pos(), 0x636261);
    assert_eq!(state.stack[1].pos(), 1);
}

#[test]
fn test_string_packs_the_raw_source_span() {
    let mut state = ProgramState::new();
    eval(&mut state, "\" hello world \"");
    let expected = pack_words(b"hello world");
    assert_eq!(state.stack.len(), expected.len() + 1);
    for (i, word) in expected.iter().enumerate() {
        assert_eq!(state.stack[i].pos(), word.pos());
    }
    assert_eq!(state.stack.last().unwrap().pos(), expected.len() as u64);
}

#[test]
fn test_string_prints_back() {
    let mut state = ProgramState::new();
    eval(&mut state, "\" hello world \" print_string");
    assert_eq!(state.take_output(), "hello world");
    assert!(state.stack.is_empty());
}

#[test]
fn test_empty_string() {
    let mut state = ProgramState::new();
    eval(&mut state, "\" \"");
    assert_eq!(signs(&state), vec![0]);
}

#[test]
fn test_unclosed_string() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "\" no closing quote"), Error::UnclosedString);
}

#[test]
fn test_string_compiles_into_a_word() {
    let mut state = ProgramState::new();
    eval(&mut state, ": greet \" hi there \" print_string ;");
    eval(&mut state, "greet");
    assert_eq!(state.take_output(), "hi there");
}

// ============================================================================
// HEX LITERALS
// ============================================================================

#[test]
fn test_hex_basics() {
    let mut state = ProgramState::new();
    eval(&mut state, "hex FF hex 10");
    assert_eq!(signs(&state), vec![255, 16]);
}

#[test]
fn test_hex_case_insensitive() {
    let mut state = ProgramState::new();
    eval(&mut state, "hex abcdef hex ABCDEF =");
    assert_eq!(signs(&state), vec![-1]);
}

#[test]
fn test_hex_full_range() {
    let mut state = ProgramState::new();
    eval(&mut state, "hex FFFFFFFF");
    assert_eq!(state.stack[0].pos(), 0xFFFF_FFFF);
}

#[test]
fn test_hex_rejects_non_hex_letters() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "hex 1z"), Error::BadHexDigit);
}

#[test]
fn test_hex_rejects_overlength() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "hex 123456789"), Error::HexTooLong);
}

#[test]
fn test_hex_needs_a_token() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "hex"), Error::ExpectedWord);
}

// ============================================================================
// HELP AND DEF
// ============================================================================

#[test]
fn test_help_on_a_primitive() {
    let mut state = ProgramState::new();
    eval(&mut state, "help dup");
    assert_eq!(state.take_output(), "`dup`: ( a -- a a ) duplicate the top entry\n");
}

#[test]
fn test_help_on_a_user_word() {
    let mut state = ProgramState::new();
    eval(&mut state, ": sq ( n -- n*n ) dup * ;");
    eval(&mut state, "help sq");
    assert_eq!(state.take_output(), "`sq`: n -- n*n\n");
}

#[test]
fn test_help_on_a_number() {
    let mut state = ProgramState::new();
    eval(&mut state, "help 42");
    assert_eq!(state.take_output(), "Pushes the number 42 to the stack\n");
}

#[test]
fn test_help_on_a_syntax_form() {
    let mut state = ProgramState::new();
    eval(&mut state, "help hex");
    assert!(state.take_output().starts_with("`hex`:"));
}

#[test]
fn test_help_on_an_unknown_word() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "help nosuch"), Error::UndefinedWord);
}

#[test]
fn test_compiled_help_reproduces_the_output() {
    let mut state = ProgramState::new();
    eval(&mut state, ": h help dup ;");
    eval(&mut state, "h");
    assert_eq!(state.take_output(), "`dup`: ( a -- a a ) duplicate the top entry\n");
}

#[test]
fn test_def_prints_a_definition_back() {
    let mut state = ProgramState::new();
    eval(&mut state, ": sq ( n -- n*n ) dup * ;");
    eval(&mut state, "def sq");
    assert_eq!(state.take_output(), ": sq ( n -- n*n ) dup * ;\n");
}

#[test]
fn test_def_without_a_description() {
    let mut state = ProgramState::new();
    eval(&mut state, ": two 2 ;");
    eval(&mut state, "def two");
    assert_eq!(state.take_output(), ": two 2 ;\n");
}

#[test]
fn test_def_renders_control_cells_by_name() {
    let mut state = ProgramState::new();
    eval(&mut state, ": count dup 0 = ? ret rec ;");
    eval(&mut state, "def count");
    assert_eq!(state.take_output(), ": count dup 0 = 1 ? ret rec ;\n");
}

#[test]
fn test_def_of_a_primitive_is_a_placeholder() {
    let mut state = ProgramState::new();
    eval(&mut state, "def dup");
    assert_eq!(state.take_output(), "`dup` is a primitive\n");
}

#[test]
fn test_def_of_a_number() {
    let mut state = ProgramState::new();
    eval(&mut state, "def 7");
    assert_eq!(state.take_output(), "7 is a number\n");
}

#[test]
fn test_compiled_def_reproduces_the_output() {
    let mut state = ProgramState::new();
    eval(&mut state, ": sq ( n -- n*n ) dup * ;");
    eval(&mut state, ": show def sq ;");
    eval(&mut state, "show");
    assert_eq!(state.take_output(), ": sq ( n -- n*n ) dup * ;\n");
}

// ============================================================================
// WORD DEFINITION
// ============================================================================

#[test]
fn test_definition_and_use() {
    let mut state = ProgramState::new();
    eval(&mut state, ": sq ( n -- n*n ) dup * ; 5 sq");
    assert_eq!(signs(&state), vec![25]);
}

#[test]
fn test_description_may_nest_comments() {
    let mut state = ProgramState::new();
    eval(&mut state, ": f ( a ( b ) c ) 1 ;");
    assert_eq!(state.words.last().unwrap().desc, "a ( b ) c");
}

#[test]
fn test_definition_without_a_name_fails() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, ":"), Error::ExpectedWord);
}

#[test]
fn test_unterminated_definition_rolls_back() {
    let mut state = ProgramState::new();
    let code_len = state.code_len();
    assert_eq!(eval_err(&mut state, ": f dup *"), Error::UnterminatedDefinition);
    assert_eq!(state.code_len(), code_len);
    assert!(state.words.is_empty());
}

#[test]
fn test_bad_body_rolls_back() {
    let mut state = ProgramState::new();
    eval(&mut state, ": keep 1 ;");
    let code_len = state.code_len();
    assert_eq!(eval_err(&mut state, ": f dup nosuchword ;"), Error::UndefinedWord);
    assert_eq!(state.code_len(), code_len);
    assert_eq!(state.words.len(), 1);

    // The state stays usable after the rollback.
    eval(&mut state, ": g 2 ; g keep");
    assert_eq!(signs(&state), vec![2, 1]);
}

#[test]
fn test_colon_inside_a_body_fails() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, ": f : g ;"), Error::ColonInsideDefinition);
    assert!(state.words.is_empty());
}

#[test]
fn test_redefinition_shadows() {
    let mut state = ProgramState::new();
    eval(&mut state, ": f 1 ;");
    eval(&mut state, ": f 2 ;");
    eval(&mut state, "f");
    assert_eq!(signs(&state), vec![2]);
    assert_eq!(state.words.len(), 2);
}

#[test]
fn test_rec_outside_a_body() {
    let mut state = ProgramState::new();
    assert_eq!(
        eval_err(&mut state, "rec"),
        Error::OutsideDefinition { name: "rec" }
    );
}

#[test]
fn test_ret_outside_a_body() {
    let mut state = ProgramState::new();
    assert_eq!(
        eval_err(&mut state, "ret"),
        Error::OutsideDefinition { name: "ret" }
    );
}

// ============================================================================
// CONDITIONAL SKIP
// ============================================================================

#[test]
fn test_skip_pops_the_flag_and_ignores_on_zero() {
    let mut state = ProgramState::new();
    eval(&mut state, "1 0 ? drop");
    assert_eq!(signs(&state), vec![1]);
}

#[test]
fn test_skip_runs_on_nonzero() {
    let mut state = ProgramState::new();
    eval(&mut state, "1 2 ? drop");
    assert!(state.stack.is_empty());
}

#[test]
fn test_skip_with_empty_stack() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "? drop"), Error::StackLen { needed: 1 });
}

#[test]
fn test_compiled_skip_both_ways() {
    let mut state = ProgramState::new();
    eval(&mut state, ": maybe7 ? 7 ;");
    eval(&mut state, "1 maybe7");
    assert_eq!(signs(&state), vec![7]);

    let mut state = ProgramState::new();
    eval(&mut state, ": maybe7 ? 7 ;");
    eval(&mut state, "0 maybe7");
    assert!(state.stack.is_empty());
}

#[test]
fn test_skipped_syntax_form_consumes_its_tokens() {
    let mut state = ProgramState::new();
    eval(&mut state, "0 ? ( a comment ) 5");
    assert_eq!(signs(&state), vec![5]);
}

// ============================================================================
// REPETITION
// ============================================================================

#[test]
fn test_rep_runs_n_times() {
    let mut state = ProgramState::new();
    eval(&mut state, "0 5 rep inc");
    assert_eq!(signs(&state), vec![5]);
}

#[test]
fn test_rep_and_pushes_the_count_back() {
    let mut state = ProgramState::new();
    eval(&mut state, "0 5 rep_and inc");
    assert_eq!(signs(&state), vec![5, 5]);
}

#[test]
fn test_rep_truncates_its_temporary_region() {
    let mut state = ProgramState::new();
    let code_len = state.code_len();
    eval(&mut state, "0 3 rep inc");
    assert_eq!(state.code_len(), code_len);
}

#[test]
fn test_rep_zero_times() {
    let mut state = ProgramState::new();
    eval(&mut state, "9 0 rep inc");
    assert_eq!(signs(&state), vec![9]);
}

#[test]
fn test_compiled_rep() {
    let mut state = ProgramState::new();
    eval(&mut state, ": add5 5 rep inc ;");
    eval(&mut state, "0 add5");
    assert_eq!(signs(&state), vec![5]);
}

#[test]
fn test_compiled_rep_and_keeps_the_count() {
    let mut state = ProgramState::new();
    eval(&mut state, ": twice 2 rep_and [ dup + ] ;");
    eval(&mut state, "3 twice");
    assert_eq!(signs(&state), vec![12, 2]);
}

#[test]
fn test_rep_needs_a_count() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "rep inc"), Error::StackLen { needed: 1 });
}

// ============================================================================
// BLOCKS
// ============================================================================

#[test]
fn test_block_runs_inline() {
    let mut state = ProgramState::new();
    eval(&mut state, "[ 1 2 + ]");
    assert_eq!(signs(&state), vec![3]);
}

#[test]
fn test_block_is_one_unit_for_skip() {
    let mut state = ProgramState::new();
    eval(&mut state, "0 ? [ 1 2 + ] 9");
    assert_eq!(signs(&state), vec![9]);

    let mut state = ProgramState::new();
    eval(&mut state, "1 ? [ 1 2 + ] 9");
    assert_eq!(signs(&state), vec![3, 9]);
}

#[test]
fn test_compiled_block_is_one_unit_for_skip() {
    let mut state = ProgramState::new();
    eval(&mut state, ": f ? [ 1 2 ] 9 ;");
    eval(&mut state, "0 f");
    assert_eq!(signs(&state), vec![9]);

    let mut state = ProgramState::new();
    eval(&mut state, ": f ? [ 1 2 ] 9 ;");
    eval(&mut state, "1 f");
    assert_eq!(signs(&state), vec![1, 2, 9]);
}

#[test]
fn test_block_repeats_as_a_unit() {
    let mut state = ProgramState::new();
    eval(&mut state, "0 3 rep [ 1 + ]");
    assert_eq!(signs(&state), vec![3]);
}

#[test]
fn test_unclosed_block() {
    let mut state = ProgramState::new();
    assert_eq!(eval_err(&mut state, "[ 1 2"), Error::UnclosedBlock);
}
