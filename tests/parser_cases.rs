//! End-to-end checks over the whole pipeline: lexer → token post-processing
//! → SLR parse → IR lowering, with structural assertions on the produced
//! Koopa module.

use koopa::ir::{FunctionData, Program, ValueKind};

use cmmc::ast;
use cmmc::grammar::Grammar;
use cmmc::irgen;
use cmmc::lexer::{post_process, Lexer};
use cmmc::parser::slr::{ParseResult, SlrParser};

fn parse_source(source: &str) -> ParseResult {
  let lexer = Lexer::new().expect("lexer rules must compile");
  let tokens = post_process(&lexer.tokenize(source));
  SlrParser::new(Grammar::language()).parse(&tokens)
}

fn parse_program(source: &str) -> Box<ast::Program> {
  let result = parse_source(source);
  assert!(result.success, "failed to parse {:?}", source);
  result.program.expect("successful parse must yield a program")
}

fn compile(source: &str) -> cmmc::Result<Program> {
  irgen::generate_program(&parse_program(source))
}

// `koopa::ir::Program` does not implement `Debug`, so `Result::unwrap_err`
// (which requires `T: Debug` to format the `Ok` case on panic) cannot be
// called directly on `cmmc::Result<Program>`. This mirrors `unwrap_err`
// without that bound.
fn compile_err(source: &str) -> Box<dyn std::error::Error> {
  match compile(source) {
    Ok(_) => panic!("expected {:?} to fail to compile", source),
    Err(e) => e,
  }
}

fn expect_success(source: &str) {
  let result = parse_source(source);
  assert!(result.success, "expected {:?} to parse", source);
  assert!(result.program.is_some());
}

fn expect_failure(source: &str) {
  let result = parse_source(source);
  assert!(!result.success, "expected {:?} to be rejected", source);
  assert!(result.program.is_none());
}

fn func<'p>(program: &'p Program, name: &str) -> &'p FunctionData {
  program
    .funcs()
    .values()
    .find(|fd| fd.name() == name)
    .unwrap_or_else(|| panic!("function {} not found", name))
}

/// Every laid-out basic block must end with exactly one terminator.
fn assert_terminated(fd: &FunctionData) {
  for (bb, node) in fd.layout().bbs().iter() {
    let insts: Vec<_> = node.insts().keys().copied().collect();
    let last = *insts.last().unwrap_or_else(|| {
      panic!("block {:?} in {} is empty", fd.dfg().bb(*bb).name(), fd.name())
    });
    assert!(
      matches!(
        fd.dfg().value(last).kind(),
        ValueKind::Return(_) | ValueKind::Branch(_) | ValueKind::Jump(_)
      ),
      "block in {} does not end with a terminator",
      fd.name()
    );
    for &inst in &insts[..insts.len() - 1] {
      assert!(
        !matches!(
          fd.dfg().value(inst).kind(),
          ValueKind::Return(_) | ValueKind::Branch(_) | ValueKind::Jump(_)
        ),
        "block in {} has an interior terminator",
        fd.name()
      );
    }
  }
}

// --- parser edge cases ---

#[test]
fn basic_program_parses() {
  expect_success(
    r#"
    int main() {
        int a = 1, b = 2;
        a = a + b - 1;
        if (a == 2) {
            return 0;
        } else {
            b = b * 2;
            return b;
        }
    }
    "#,
  );
}

#[test]
fn dangling_else_parses() {
  expect_success(
    r#"
    int main() {
        int a = 1;
        int b = 2;
        if (a)
            if (b) return 3;
            else return 4;
        return 0;
    }
    "#,
  );
}

#[test]
fn missing_semicolon_is_rejected() {
  expect_failure(
    r#"
    int main() {
        int a = 1
        return a;
    }
    "#,
  );
}

#[test]
fn unbalanced_brace_is_rejected() {
  expect_failure(
    r#"
    int main() {
        if (1) {
            return 1;
    }
    "#,
  );
}

#[test]
fn lex_error_surfaces_as_parse_error() {
  let result = parse_source("int main(){ return @; }");
  assert!(!result.success);
  let last = result.steps.last().expect("trace must include the failing step");
  assert_eq!(last.action, cmmc::parser::ParseAction::Error);
  assert_eq!(last.lookahead.name(), "@");
}

#[test]
fn ast_dump_reflects_the_parse() {
  let program = parse_program("int main() { if (1) return 1; else return 0; }");
  let mut sink = Vec::new();
  cmmc::ast::dump::print_ast(&program, &mut sink).unwrap();
  let text = String::from_utf8(sink).unwrap();
  assert!(text.starts_with("Program\n"));
  assert!(text.contains("Func int main"));
  assert!(text.contains("Then"));
  assert!(text.contains("Else"));
}

// --- lowering scenarios ---

#[test]
fn arithmetic_function_lowers_terminated() {
  let program = compile("int main() { int a = 1 + 2 * 3; return a; }").unwrap();
  let main = func(&program, "@main");
  assert_terminated(main);
}

#[test]
fn short_circuit_and_produces_merge_block_argument() {
  let program = compile(
    r#"
    int main() {
        int a = 1;
        int b = 0;
        if (a && b) return 1;
        return 0;
    }
    "#,
  )
  .unwrap();
  let main = func(&program, "@main");
  assert_terminated(main);

  // the && merge block carries its result as a block argument
  let merge_params: Vec<_> =
    main.dfg().bbs().values().filter(|bb| !bb.params().is_empty()).collect();
  assert_eq!(merge_params.len(), 1, "exactly one φ-carrying merge block");

  // origin branches into the diamond with the false constant, the rhs end
  // jumps in with the computed value
  let has_branch_with_args = main.dfg().values().values().any(|v| {
    matches!(v.kind(), ValueKind::Branch(b) if !b.true_args().is_empty() || !b.false_args().is_empty())
  });
  let has_jump_with_args = main
    .dfg()
    .values()
    .values()
    .any(|v| matches!(v.kind(), ValueKind::Jump(j) if !j.args().is_empty()));
  assert!(has_branch_with_args, "short-circuit origin must pass the constant");
  assert!(has_jump_with_args, "rhs block must pass its value to the merge");
}

#[test]
fn const_assignment_is_rejected() {
  let err = compile_err("const int K = 5; int main(){ K = 6; return 0; }");
  assert!(err.to_string().contains("assignment to const K"), "got: {}", err);
}

#[test]
fn global_initializer_is_folded() {
  let program = compile("const int K = 1 + 2 * 3; int main(){ return K; }").unwrap();
  let mut found = false;
  for &global in program.inst_layout() {
    let data = program.borrow_value(global);
    if data.name().as_deref() != Some("@K") {
      continue;
    }
    let ValueKind::GlobalAlloc(alloc) = data.kind() else {
      panic!("@K should be a global allocation");
    };
    let init = program.borrow_value(alloc.init());
    assert!(matches!(init.kind(), ValueKind::Integer(i) if i.value() == 7));
    found = true;
  }
  assert!(found, "global @K not emitted");
}

#[test]
fn uninitialized_global_is_zero_filled() {
  let program = compile("int g; int main(){ return g; }").unwrap();
  let global = program.inst_layout()[0];
  let data = program.borrow_value(global);
  let ValueKind::GlobalAlloc(alloc) = data.kind() else {
    panic!("expected a global allocation");
  };
  let init = program.borrow_value(alloc.init());
  assert!(matches!(init.kind(), ValueKind::ZeroInit(_)));
}

#[test]
fn non_constant_global_initializer_is_rejected() {
  let err = compile_err("int a = 1; int b = a + 1; int main(){ return b; }");
  assert!(err.to_string().contains("not a constant expression"), "got: {}", err);
}

#[test]
fn missing_return_still_terminates_function() {
  let program = compile("int main() { int a = 3; }").unwrap();
  assert_terminated(func(&program, "@main"));
}

#[test]
fn void_function_and_calls_lower() {
  let program = compile(
    r#"
    void tick() { return; }
    int twice(int x) { return x + x; }
    int main() {
        tick();
        return twice(21);
    }
    "#,
  )
  .unwrap();
  for name in ["@tick", "@twice", "@main"] {
    assert_terminated(func(&program, name));
  }
}

#[test]
fn void_value_cannot_be_used_as_operand() {
  let err = compile_err(
    r#"
    void tick() { return; }
    int main() { return tick() + 1; }
    "#,
  );
  assert!(err.to_string().contains("void value"), "got: {}", err);
}

#[test]
fn argument_count_mismatch_is_rejected() {
  let err = compile_err(
    r#"
    int twice(int x) { return x + x; }
    int main() { return twice(1, 2); }
    "#,
  );
  assert!(err.to_string().contains("expects 1 arguments, got 2"), "got: {}", err);
}

#[test]
fn undefined_identifier_is_rejected() {
  let err = compile_err("int main() { return missing; }");
  assert!(err.to_string().contains("undefined identifier missing"), "got: {}", err);
}

#[test]
fn inner_shadowing_leaves_outer_binding_writable_state() {
  // the inner K shadows the const global; assigning it is fine
  let program = compile(
    r#"
    const int K = 5;
    int main() {
        int K = 1;
        K = 2;
        return K;
    }
    "#,
  )
  .unwrap();
  assert_terminated(func(&program, "@main"));
}

#[test]
fn float_programs_parse_but_do_not_lower() {
  let source = "int main() { float x = 1.5; return 0; }";
  expect_success(source);
  let err = compile_err(source);
  assert!(err.to_string().contains("float lowering"), "got: {}", err);
}

#[test]
fn branches_that_return_keep_blocks_terminated() {
  let program = compile(
    r#"
    int sign(int x) {
        if (x > 0) return 1;
        else {
            if (x == 0) return 0;
            return 0 - 1;
        }
    }
    int main() { return sign(0 - 7); }
    "#,
  )
  .unwrap();
  assert_terminated(func(&program, "@sign"));
}
