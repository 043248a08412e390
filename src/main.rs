use std::env::args;
use std::fs;
use std::io::{stdin, stdout, Read};

use koopa::back::KoopaGenerator;

use cmmc::grammar::Grammar;
use cmmc::irgen;
use cmmc::lexer::{post_process, print_tokens, Lexer};
use cmmc::parser::{print_parse_steps, slr::SlrParser};
use cmmc::Result;

mod argparse;

fn compile() -> Result<()> {
  let parsed = argparse::parse(args())?;
  if parsed.help {
    argparse::print_usage("cmmc");
    return Ok(());
  }

  let source = match parsed.input.as_deref() {
    None => {
      let mut buf = String::new();
      stdin().read_to_string(&mut buf).map_err(|e| format!("cannot read stdin: {}", e))?;
      buf
    }
    Some(path) => {
      fs::read_to_string(path).map_err(|e| format!("cannot open input file {}: {}", path, e))?
    }
  };

  let lexer = Lexer::new()?;
  let tokens = lexer.tokenize(&source);
  if parsed.dump_tokens || parsed.lex_only {
    print_tokens(&mut stdout(), &tokens)?;
    if parsed.lex_only {
      return Ok(());
    }
  }

  let tokens = post_process(&tokens);
  let parser = SlrParser::new(Grammar::language());
  let result = parser.parse(&tokens);
  if parsed.dump_parse || parsed.trace_only {
    print_parse_steps(&mut stdout(), &result.steps)?;
  }
  if !result.success {
    return Err("parse failed".into());
  }
  if parsed.trace_only {
    return Ok(());
  }

  let program = result.program.ok_or("parser produced no syntax tree")?;
  let ir = irgen::generate_program(&program)?;

  if let Some(path) = &parsed.output {
    let file =
      fs::File::create(path).map_err(|e| format!("cannot write output file {}: {}", path, e))?;
    KoopaGenerator::new(file).generate_on(&ir)?;
  }
  if parsed.print_ir {
    KoopaGenerator::new(stdout()).generate_on(&ir)?;
  }
  Ok(())
}

fn main() {
  if let Err(e) = compile() {
    eprintln!("{}", e);
    std::process::exit(1);
  }
}
