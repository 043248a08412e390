use std::env::Args;

#[derive(Debug, Default)]
pub struct ParsedArgs {
  pub help: bool,
  pub input: Option<String>,
  pub output: Option<String>,
  pub print_ir: bool,
  pub dump_tokens: bool,
  pub dump_parse: bool,
  pub lex_only: bool,
  pub trace_only: bool,
}

pub fn print_usage(program: &str) {
  eprintln!(
    "Usage:\n  {} [options] <source-file>\n\nOptions:\n  -o <file>       Write IR output to <file>\n  -S              Print IR to stdout (default when no -o)\n  --dump-tokens   Print the token stream\n  --dump-parse    Print the parser trace\n  --lex-only      Tokenize only\n  --gtrace-only   Parse and print the trace, do not emit IR\n  -h, --help      Show this help\n\nSource file:\n  <source-file>   Path to source file\n  -               Read source from stdin (default)",
    program
  );
}

pub fn parse(mut args: Args) -> Result<ParsedArgs, Box<dyn std::error::Error>> {
  let _name = args.next();

  let mut parsed = ParsedArgs::default();
  let mut explicit_print = false;
  let mut pending_output = false;

  for arg in args {
    if pending_output {
      parsed.output = Some(arg);
      pending_output = false;
    } else if arg == "-" {
      parsed.input = None;
    } else if arg.starts_with('-') {
      match arg.as_str() {
        "-o" => pending_output = true,
        "-S" => explicit_print = true,
        "--dump-tokens" => parsed.dump_tokens = true,
        "--dump-parse" => parsed.dump_parse = true,
        "--lex-only" => parsed.lex_only = true,
        "--gtrace-only" => parsed.trace_only = true,
        "-h" | "--help" => parsed.help = true,
        _ => return Err(format!("unknown option: {}", arg).into()),
      }
    } else {
      parsed.input = Some(arg);
    }
  }

  if pending_output {
    return Err("-o requires a filename".into());
  }
  parsed.print_ir = explicit_print || parsed.output.is_none();
  Ok(parsed)
}
