use std::fmt;

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
  pub line: i32,
  pub column: i32,
}

impl Default for Location {
  fn default() -> Self {
    Location { line: 1, column: 1 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
  Keyword,
  Operator,
  Separator,
  Identifier,
  IntLiteral,
  FloatLiteral,
  Spacer,
  FuncDef,
  End,
  Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
  KwInt,
  KwVoid,
  KwReturn,
  KwMain,
  KwFloat,
  KwIf,
  KwElse,
  KwConst,

  // `int`/`float` retyped by post-processing when they head a function definition
  KwIntFunc,
  KwFloatFunc,

  OpEqual,
  OpLessEqual,
  OpGreaterEqual,
  OpNotEqual,
  OpAnd,
  OpOr,
  OpPlus,
  OpMinus,
  OpMultiply,
  OpDivide,
  OpMod,
  OpAssign,
  OpGreater,
  OpLess,
  OpNot,

  SepLParen,
  SepRParen,
  SepLBrace,
  SepRBrace,
  SepComma,
  SepSemicolon,

  LiteralInt,
  LiteralFloat,

  Identifier,
  Spacer,
  EndOfFile,
  Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub ty: TokenType,
  pub category: TokenCategory,
  pub loc: Location,
  pub lexeme: String,
}

impl Token {
  pub fn new(ty: TokenType, category: TokenCategory, loc: Location, lexeme: String) -> Self {
    Token { ty, category, loc, lexeme }
  }

  pub fn end_of_file(loc: Location) -> Self {
    Token::new(TokenType::EndOfFile, TokenCategory::End, loc, String::new())
  }

  /// Lookup key for grammar terminal mapping. The lexeme is payload only.
  pub fn key(&self) -> (TokenType, TokenCategory) {
    (self.ty, self.category)
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
      f,
      "{}\tToken(Type::{:?}, Category::{:?}, Location({},{}))",
      self.lexeme, self.ty, self.category, self.loc.line, self.loc.column
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_format() {
    let token = Token::new(
      TokenType::Identifier,
      TokenCategory::Identifier,
      Location { line: 2, column: 5 },
      "abc".into(),
    );
    assert_eq!(
      token.to_string(),
      "abc\tToken(Type::Identifier, Category::Identifier, Location(2,5))"
    );
  }

  #[test]
  fn key_ignores_lexeme() {
    let a = Token::new(
      TokenType::LiteralInt,
      TokenCategory::IntLiteral,
      Location::default(),
      "1".into(),
    );
    let b = Token::new(
      TokenType::LiteralInt,
      TokenCategory::IntLiteral,
      Location { line: 3, column: 9 },
      "42".into(),
    );
    assert_eq!(a.key(), b.key());
  }
}
