use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum CompileError {
  UndeclaredSymbol(String),
  AssignToConst(String),
  VoidValue(&'static str),
  ArgumentMismatch(String, usize, usize),
  NonConstInitializer(String),
  Unsupported(&'static str),
  Other(String),
}

impl CompileError {
  fn message(&self) -> String {
    match self {
      Self::UndeclaredSymbol(name) => format!("undefined identifier {}", name),
      Self::AssignToConst(name) => format!("assignment to const {}", name),
      Self::VoidValue(what) => format!("void value used as {}", what),
      Self::ArgumentMismatch(name, expected, got) => {
        format!("call to {} expects {} arguments, got {}", name, expected, got)
      }
      Self::NonConstInitializer(name) => {
        format!("global initializer of {} is not a constant expression", name)
      }
      Self::Unsupported(what) => format!("{} is not supported", what),
      Self::Other(msg) => msg.clone(),
    }
  }
}

impl Error for CompileError {}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "\x1b[0;31mcompile error\x1b[0m: {}", self.message())
  }
}
