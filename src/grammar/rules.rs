//! The C-- grammar: productions wired to their AST builders, plus the map
//! from lexed tokens to grammar terminals.

use super::{nt, t, Grammar, Symbol};
use crate::ast::builder::*;
use crate::lexer::token::{TokenCategory, TokenType};

impl Grammar {
  /// Builds the language grammar in parser-ready form. Production 0 is the
  /// augmented start used by the SLR accept action.
  pub fn language() -> Grammar {
    let mut g = Grammar::empty(nt("Program"));
    g.init_rules();
    g.init_token_map();
    g.recompute_sets();
    g
  }

  /// Language grammar rewritten for predictive parsing.
  pub fn language_ll1() -> Grammar {
    let mut g = Grammar::empty(nt("Program"));
    g.init_rules();
    g.init_token_map();
    g.normalize_ll1();
    g
  }

  fn init_rules(&mut self) {
    // Program -> CompUnit
    self.add_production("Program", vec![nt("CompUnit")], build_single_forward);

    // CompUnit -> (Decl | FuncDef)*
    self.add_production("CompUnit", vec![Symbol::Epsilon], build_program_empty);
    self.add_production("CompUnit", vec![nt("CompUnitList")], build_single_forward);
    self.add_production("CompUnitList", vec![nt("CompUnitItem")], build_comp_unit_list_item);
    self.add_production(
      "CompUnitList",
      vec![nt("CompUnitList"), nt("CompUnitItem")],
      build_comp_unit_list_append,
    );
    self.add_production("CompUnitItem", vec![nt("Decl")], build_single_forward);
    self.add_production("CompUnitItem", vec![nt("FuncDef")], build_single_forward);

    // Decl -> ConstDecl | VarDecl
    self.add_production("Decl", vec![nt("ConstDecl")], build_single_forward);
    self.add_production("Decl", vec![nt("VarDecl")], build_single_forward);

    // ConstDecl -> 'const' BType ConstDef (',' ConstDef)* ';'
    self.add_production(
      "ConstDecl",
      vec![t("const"), nt("BType"), nt("ConstDefList"), t(";")],
      build_const_decl,
    );
    self.add_production("ConstDefList", vec![nt("ConstDef")], build_def_list_item);
    self.add_production(
      "ConstDefList",
      vec![nt("ConstDefList"), t(","), nt("ConstDef")],
      build_def_list_append,
    );

    // BType -> 'int' | 'float'
    self.add_production("BType", vec![t("int")], build_type_int);
    self.add_production("BType", vec![t("float")], build_type_float);

    // ConstDef -> Ident '=' ConstInitVal
    self.add_production("ConstDef", vec![t("Ident"), t("="), nt("ConstInitVal")], build_const_def);
    self.add_production("ConstInitVal", vec![nt("ConstExp")], build_single_forward);

    // VarDecl -> BType VarDef (',' VarDef)* ';'
    self.add_production("VarDecl", vec![nt("BType"), nt("VarDefList"), t(";")], build_var_decl);
    self.add_production("VarDefList", vec![nt("VarDef")], build_def_list_item);
    self.add_production(
      "VarDefList",
      vec![nt("VarDefList"), t(","), nt("VarDef")],
      build_def_list_append,
    );

    // VarDef -> Ident | Ident '=' InitVal
    self.add_production("VarDef", vec![t("Ident")], build_var_def_uninit);
    self.add_production("VarDef", vec![t("Ident"), t("="), nt("InitVal")], build_var_def_init);
    self.add_production("InitVal", vec![nt("Exp")], build_single_forward);

    // FuncDef -> FuncType Ident '(' FuncFParams? ')' Block
    self.add_production(
      "FuncDef",
      vec![nt("FuncType"), t("Ident"), t("("), t(")"), nt("Block")],
      build_func_def_no_params,
    );
    self.add_production(
      "FuncDef",
      vec![nt("FuncType"), t("Ident"), t("("), nt("FuncFParams"), t(")"), nt("Block")],
      build_func_def,
    );

    // FuncType -> 'void' | function-position 'int' | 'float'
    self.add_production("FuncType", vec![t("void")], build_type_void);
    self.add_production("FuncType", vec![t("func_int")], build_type_int);
    self.add_production("FuncType", vec![t("func_float")], build_type_float);

    // FuncFParams -> FuncFParam (',' FuncFParam)*
    self.add_production("FuncFParams", vec![nt("FuncFParam")], build_func_fparams_item);
    self.add_production(
      "FuncFParams",
      vec![nt("FuncFParams"), t(","), nt("FuncFParam")],
      build_func_fparams_append,
    );
    self.add_production("FuncFParam", vec![nt("BType"), t("Ident")], build_func_fparam);

    // Block -> '{' BlockItem* '}'
    self.add_production("Block", vec![t("{"), t("}")], build_block_empty);
    self.add_production("Block", vec![t("{"), nt("BlockItemList"), t("}")], build_block);
    self.add_production("BlockItemList", vec![nt("BlockItem")], build_block_item_list_item);
    self.add_production(
      "BlockItemList",
      vec![nt("BlockItemList"), nt("BlockItem")],
      build_block_item_list_append,
    );
    self.add_production("BlockItem", vec![nt("Decl")], build_block_item_decl);
    self.add_production("BlockItem", vec![nt("Stmt")], build_block_item_stmt);

    // statements
    self.add_production("Stmt", vec![nt("LVal"), t("="), nt("Exp"), t(";")], build_stmt_assign);
    self.add_production("Stmt", vec![nt("Exp"), t(";")], build_stmt_exp);
    self.add_production("Stmt", vec![t(";")], build_stmt_empty);
    self.add_production("Stmt", vec![nt("Block")], build_stmt_block);
    self.add_production(
      "Stmt",
      vec![t("if"), t("("), nt("Cond"), t(")"), nt("Stmt")],
      build_stmt_if,
    );
    self.add_production(
      "Stmt",
      vec![t("if"), t("("), nt("Cond"), t(")"), nt("Stmt"), t("else"), nt("Stmt")],
      build_stmt_if_else,
    );
    self.add_production("Stmt", vec![t("return"), nt("Exp"), t(";")], build_stmt_return);
    self.add_production("Stmt", vec![t("return"), t(";")], build_stmt_return_void);

    // expressions
    self.add_production("Exp", vec![nt("LOrExp")], build_single_forward);
    self.add_production("Cond", vec![nt("LOrExp")], build_single_forward);
    self.add_production("LVal", vec![t("Ident")], build_lval_ident);

    self.add_production("PrimaryExp", vec![t("("), nt("Exp"), t(")")], build_exp_paren);
    self.add_production("PrimaryExp", vec![nt("LVal")], build_exp_lval);
    self.add_production("PrimaryExp", vec![nt("Number")], build_single_forward);

    self.add_production("Number", vec![nt("IntConst")], build_exp_int);
    self.add_production("Number", vec![nt("FloatConst")], build_exp_float);

    self.add_production("UnaryExp", vec![nt("PrimaryExp")], build_single_forward);
    self.add_production(
      "UnaryExp",
      vec![t("Ident"), t("("), nt("FuncRParamsOpt"), t(")")],
      build_exp_call,
    );
    self.add_production("UnaryExp", vec![nt("UnaryOp"), nt("UnaryExp")], build_unary_exp);

    self.add_production("FuncRParamsOpt", vec![Symbol::Epsilon], build_nothing);
    self.add_production("FuncRParamsOpt", vec![nt("FuncRParams")], build_single_forward);

    self.add_production("UnaryOp", vec![t("+")], build_unary_op_positive);
    self.add_production("UnaryOp", vec![t("-")], build_unary_op_negative);
    self.add_production("UnaryOp", vec![t("!")], build_unary_op_not);

    self.add_production("FuncRParams", vec![nt("FuncRParam")], build_func_rparams_item);
    self.add_production(
      "FuncRParams",
      vec![nt("FuncRParams"), t(","), nt("FuncRParam")],
      build_func_rparams_append,
    );
    self.add_production("FuncRParam", vec![nt("Exp")], build_single_forward);

    self.add_production("MulExp", vec![nt("UnaryExp")], build_single_forward);
    self.add_production("MulExp", vec![nt("MulExp"), t("*"), nt("UnaryExp")], build_binary_mul);
    self.add_production("MulExp", vec![nt("MulExp"), t("/"), nt("UnaryExp")], build_binary_div);
    self.add_production("MulExp", vec![nt("MulExp"), t("%"), nt("UnaryExp")], build_binary_mod);

    self.add_production("AddExp", vec![nt("MulExp")], build_single_forward);
    self.add_production("AddExp", vec![nt("AddExp"), t("+"), nt("MulExp")], build_binary_add);
    self.add_production("AddExp", vec![nt("AddExp"), t("-"), nt("MulExp")], build_binary_sub);

    self.add_production("RelExp", vec![nt("AddExp")], build_single_forward);
    self.add_production("RelExp", vec![nt("RelExp"), t("<"), nt("AddExp")], build_binary_lt);
    self.add_production("RelExp", vec![nt("RelExp"), t(">"), nt("AddExp")], build_binary_gt);
    self.add_production("RelExp", vec![nt("RelExp"), t("<="), nt("AddExp")], build_binary_le);
    self.add_production("RelExp", vec![nt("RelExp"), t(">="), nt("AddExp")], build_binary_ge);

    self.add_production("EqExp", vec![nt("RelExp")], build_single_forward);
    self.add_production("EqExp", vec![nt("EqExp"), t("=="), nt("RelExp")], build_binary_eq);
    self.add_production("EqExp", vec![nt("EqExp"), t("!="), nt("RelExp")], build_binary_neq);

    self.add_production("LAndExp", vec![nt("EqExp")], build_single_forward);
    self.add_production("LAndExp", vec![nt("LAndExp"), t("&&"), nt("EqExp")], build_binary_and);

    self.add_production("LOrExp", vec![nt("LAndExp")], build_single_forward);
    self.add_production("LOrExp", vec![nt("LOrExp"), t("||"), nt("LAndExp")], build_binary_or);

    self.add_production("ConstExp", vec![nt("AddExp")], build_single_forward);

    // terminal wrappers
    self.add_production("IntConst", vec![t("LiteralInt")], build_single_forward);
    self.add_production("FloatConst", vec![t("LiteralFloat")], build_single_forward);
  }

  fn init_token_map(&mut self) {
    use TokenCategory as Cat;
    use TokenType as Ty;

    // keywords; `main` is an ordinary identifier to the grammar
    self.map_token(Ty::KwInt, Cat::Keyword, t("int"));
    self.map_token(Ty::KwVoid, Cat::Keyword, t("void"));
    self.map_token(Ty::KwReturn, Cat::Keyword, t("return"));
    self.map_token(Ty::KwMain, Cat::Keyword, t("Ident"));
    self.map_token(Ty::KwFloat, Cat::Keyword, t("float"));
    self.map_token(Ty::KwIf, Cat::Keyword, t("if"));
    self.map_token(Ty::KwElse, Cat::Keyword, t("else"));
    self.map_token(Ty::KwConst, Cat::Keyword, t("const"));

    // operators
    self.map_token(Ty::OpEqual, Cat::Operator, t("=="));
    self.map_token(Ty::OpLessEqual, Cat::Operator, t("<="));
    self.map_token(Ty::OpGreaterEqual, Cat::Operator, t(">="));
    self.map_token(Ty::OpNotEqual, Cat::Operator, t("!="));
    self.map_token(Ty::OpAnd, Cat::Operator, t("&&"));
    self.map_token(Ty::OpOr, Cat::Operator, t("||"));
    self.map_token(Ty::OpPlus, Cat::Operator, t("+"));
    self.map_token(Ty::OpMinus, Cat::Operator, t("-"));
    self.map_token(Ty::OpMultiply, Cat::Operator, t("*"));
    self.map_token(Ty::OpDivide, Cat::Operator, t("/"));
    self.map_token(Ty::OpMod, Cat::Operator, t("%"));
    self.map_token(Ty::OpAssign, Cat::Operator, t("="));
    self.map_token(Ty::OpGreater, Cat::Operator, t(">"));
    self.map_token(Ty::OpLess, Cat::Operator, t("<"));
    self.map_token(Ty::OpNot, Cat::Operator, t("!"));

    // separators
    self.map_token(Ty::SepLParen, Cat::Separator, t("("));
    self.map_token(Ty::SepRParen, Cat::Separator, t(")"));
    self.map_token(Ty::SepLBrace, Cat::Separator, t("{"));
    self.map_token(Ty::SepRBrace, Cat::Separator, t("}"));
    self.map_token(Ty::SepComma, Cat::Separator, t(","));
    self.map_token(Ty::SepSemicolon, Cat::Separator, t(";"));

    // literals and identifiers
    self.map_token(Ty::LiteralInt, Cat::IntLiteral, t("LiteralInt"));
    self.map_token(Ty::LiteralFloat, Cat::FloatLiteral, t("LiteralFloat"));
    self.map_token(Ty::Identifier, Cat::Identifier, t("Ident"));
    self.map_token(Ty::EndOfFile, Cat::End, Symbol::End);

    // function-position type keywords introduced by token post-processing
    self.map_token(Ty::KwIntFunc, Cat::FuncDef, t("func_int"));
    self.map_token(Ty::KwFloatFunc, Cat::FuncDef, t("func_float"));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::token::{Location, Token};

  #[test]
  fn augmented_start_is_production_zero() {
    let g = Grammar::language();
    assert_eq!(g.productions[0].head, nt("Program"));
    assert_eq!(g.productions[0].body, vec![nt("CompUnit")]);
  }

  #[test]
  fn every_non_terminal_has_a_production() {
    let g = Grammar::language();
    for name in &g.non_terminal_order {
      assert!(!g.alternates(name).is_empty(), "non-terminal {} has no production", name);
    }
  }

  #[test]
  fn body_symbols_are_all_registered() {
    let g = Grammar::language();
    for prod in &g.productions {
      for sym in &prod.body {
        match sym {
          Symbol::Terminal(name) => assert!(g.terminals.contains(name)),
          Symbol::NonTerminal(name) => assert!(g.non_terminals.contains(name)),
          Symbol::Epsilon | Symbol::End => {}
        }
      }
    }
  }

  #[test]
  fn main_maps_to_identifier_terminal() {
    let g = Grammar::language();
    let token = Token::new(
      TokenType::KwMain,
      TokenCategory::Keyword,
      Location::default(),
      "main".into(),
    );
    assert_eq!(g.terminal_for(&token), Some(&t("Ident")));
  }

  #[test]
  fn invalid_tokens_have_no_terminal() {
    let g = Grammar::language();
    let token = Token::new(
      TokenType::Invalid,
      TokenCategory::Invalid,
      Location::default(),
      "@".into(),
    );
    assert_eq!(g.terminal_for(&token), None);
  }

  #[test]
  fn language_ll1_has_no_left_recursion() {
    let g = Grammar::language_ll1();
    for name in &g.non_terminal_order {
      for id in g.alternates(name) {
        assert_ne!(g.productions[id].body[0], nt(name.clone()), "{} is left-recursive", name);
      }
    }
  }
}
