//! Semantic actions for the shift-reduce parser. Each production owns exactly
//! one of these; the driver pops the matched value slots left-to-right and
//! hands them over by value.

use std::mem;

use super::{
  BasicOp, BasicType, Block, BlockItem, Expr, FuncDef, Param, Program, SemVal, Stmt, UnaryOp,
  VarDecl, VarInit,
};

pub type SemanticAction = fn(Vec<SemVal>) -> SemVal;

fn take(vals: &mut Vec<SemVal>, i: usize) -> SemVal {
  mem::take(&mut vals[i])
}

/// Placeholder for rewritten or purely structural productions.
pub fn build_nothing(_: Vec<SemVal>) -> SemVal {
  SemVal::None
}

pub fn build_single_forward(mut vals: Vec<SemVal>) -> SemVal {
  take(&mut vals, 0)
}

pub fn build_type_int(_: Vec<SemVal>) -> SemVal {
  SemVal::Type(BasicType::Int)
}

pub fn build_type_float(_: Vec<SemVal>) -> SemVal {
  SemVal::Type(BasicType::Float)
}

pub fn build_type_void(_: Vec<SemVal>) -> SemVal {
  SemVal::Type(BasicType::Void)
}

// --- program structure ---

fn add_to_program(program: &mut Program, item: SemVal) {
  match item {
    SemVal::Decl(decl) => program.globals.push(*decl),
    SemVal::Func(func) => program.functions.push(*func),
    other => panic!("value stack holds {:?} where a top-level declaration was expected", other),
  }
}

pub fn build_program_empty(_: Vec<SemVal>) -> SemVal {
  SemVal::Program(Box::default())
}

pub fn build_comp_unit_list_item(mut vals: Vec<SemVal>) -> SemVal {
  let mut program = Program::default();
  add_to_program(&mut program, take(&mut vals, 0));
  SemVal::Program(Box::new(program))
}

pub fn build_comp_unit_list_append(mut vals: Vec<SemVal>) -> SemVal {
  let mut program = match take(&mut vals, 0) {
    SemVal::Program(p) => p,
    other => other.mismatch("a program"),
  };
  add_to_program(&mut program, take(&mut vals, 1));
  SemVal::Program(program)
}

// --- declarations ---

pub fn build_const_decl(mut vals: Vec<SemVal>) -> SemVal {
  let decl = VarDecl {
    is_const: true,
    ty: take(&mut vals, 1).into_type(),
    items: take(&mut vals, 2).into_inits(),
  };
  SemVal::Decl(Box::new(decl))
}

pub fn build_var_decl(mut vals: Vec<SemVal>) -> SemVal {
  let decl = VarDecl {
    is_const: false,
    ty: take(&mut vals, 0).into_type(),
    items: take(&mut vals, 1).into_inits(),
  };
  SemVal::Decl(Box::new(decl))
}

pub fn build_def_list_item(mut vals: Vec<SemVal>) -> SemVal {
  take(&mut vals, 0)
}

pub fn build_def_list_append(mut vals: Vec<SemVal>) -> SemVal {
  let mut list = take(&mut vals, 0).into_inits();
  list.extend(take(&mut vals, 2).into_inits());
  SemVal::Inits(list)
}

pub fn build_const_def(mut vals: Vec<SemVal>) -> SemVal {
  let name = take(&mut vals, 0).into_str();
  let value = Some(take(&mut vals, 2).into_expr());
  SemVal::Inits(vec![VarInit { name, value }])
}

pub fn build_var_def_uninit(mut vals: Vec<SemVal>) -> SemVal {
  let name = take(&mut vals, 0).into_str();
  SemVal::Inits(vec![VarInit { name, value: None }])
}

pub fn build_var_def_init(mut vals: Vec<SemVal>) -> SemVal {
  let name = take(&mut vals, 0).into_str();
  let value = Some(take(&mut vals, 2).into_expr());
  SemVal::Inits(vec![VarInit { name, value }])
}

// --- functions ---

pub fn build_func_def(mut vals: Vec<SemVal>) -> SemVal {
  let func = FuncDef {
    ty: take(&mut vals, 0).into_type(),
    name: take(&mut vals, 1).into_str(),
    params: take(&mut vals, 3).into_params(),
    body: take(&mut vals, 5).into_block(),
  };
  SemVal::Func(Box::new(func))
}

pub fn build_func_def_no_params(mut vals: Vec<SemVal>) -> SemVal {
  let func = FuncDef {
    ty: take(&mut vals, 0).into_type(),
    name: take(&mut vals, 1).into_str(),
    params: vec![],
    body: take(&mut vals, 4).into_block(),
  };
  SemVal::Func(Box::new(func))
}

pub fn build_func_fparams_item(mut vals: Vec<SemVal>) -> SemVal {
  take(&mut vals, 0)
}

pub fn build_func_fparams_append(mut vals: Vec<SemVal>) -> SemVal {
  let mut list = take(&mut vals, 0).into_params();
  list.extend(take(&mut vals, 2).into_params());
  SemVal::Params(list)
}

pub fn build_func_fparam(mut vals: Vec<SemVal>) -> SemVal {
  let param = Param { ty: take(&mut vals, 0).into_type(), name: take(&mut vals, 1).into_str() };
  SemVal::Params(vec![param])
}

// --- blocks ---
// `BlockItemList` accumulates directly into a `Block`, so the block rule just
// forwards the finished value.

pub fn build_block(mut vals: Vec<SemVal>) -> SemVal {
  take(&mut vals, 1)
}

pub fn build_block_empty(_: Vec<SemVal>) -> SemVal {
  SemVal::Block(Box::default())
}

pub fn build_block_item_list_item(mut vals: Vec<SemVal>) -> SemVal {
  let mut block = Block::default();
  block.items.push(take(&mut vals, 0).into_item());
  SemVal::Block(Box::new(block))
}

pub fn build_block_item_list_append(mut vals: Vec<SemVal>) -> SemVal {
  let mut block = take(&mut vals, 0).into_block();
  block.items.push(take(&mut vals, 1).into_item());
  SemVal::Block(block)
}

pub fn build_block_item_decl(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Item(BlockItem::Decl(take(&mut vals, 0).into_decl()))
}

pub fn build_block_item_stmt(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Item(BlockItem::Stmt(take(&mut vals, 0).into_stmt()))
}

// --- statements ---

pub fn build_stmt_assign(mut vals: Vec<SemVal>) -> SemVal {
  let target = take(&mut vals, 0).into_str();
  let expr = take(&mut vals, 2).into_expr();
  SemVal::Stmt(Box::new(Stmt::Assign(target, expr)))
}

pub fn build_stmt_exp(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Stmt(Box::new(Stmt::Expr(take(&mut vals, 0).into_expr())))
}

pub fn build_stmt_empty(_: Vec<SemVal>) -> SemVal {
  SemVal::Stmt(Box::new(Stmt::Empty))
}

pub fn build_stmt_block(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Stmt(Box::new(Stmt::Block(take(&mut vals, 0).into_block())))
}

pub fn build_stmt_if(mut vals: Vec<SemVal>) -> SemVal {
  let cond = take(&mut vals, 2).into_expr();
  let then_branch = take(&mut vals, 4).into_stmt();
  SemVal::Stmt(Box::new(Stmt::If(cond, then_branch, None)))
}

pub fn build_stmt_if_else(mut vals: Vec<SemVal>) -> SemVal {
  let cond = take(&mut vals, 2).into_expr();
  let then_branch = take(&mut vals, 4).into_stmt();
  let else_branch = take(&mut vals, 6).into_stmt();
  SemVal::Stmt(Box::new(Stmt::If(cond, then_branch, Some(else_branch))))
}

pub fn build_stmt_return(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Stmt(Box::new(Stmt::Return(Some(take(&mut vals, 1).into_expr()))))
}

pub fn build_stmt_return_void(_: Vec<SemVal>) -> SemVal {
  SemVal::Stmt(Box::new(Stmt::Return(None)))
}

// --- expressions ---

pub fn build_exp_int(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Expr(Box::new(Expr::IntLit(take(&mut vals, 0).into_int())))
}

pub fn build_exp_float(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Expr(Box::new(Expr::FloatLit(take(&mut vals, 0).into_float())))
}

pub fn build_lval_ident(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Str(take(&mut vals, 0).into_str())
}

pub fn build_exp_lval(mut vals: Vec<SemVal>) -> SemVal {
  SemVal::Expr(Box::new(Expr::Ident(take(&mut vals, 0).into_str())))
}

pub fn build_exp_paren(mut vals: Vec<SemVal>) -> SemVal {
  take(&mut vals, 1)
}

pub fn build_func_rparams_item(mut vals: Vec<SemVal>) -> SemVal {
  let wrapper = VarInit { name: String::new(), value: Some(take(&mut vals, 0).into_expr()) };
  SemVal::Inits(vec![wrapper])
}

pub fn build_func_rparams_append(mut vals: Vec<SemVal>) -> SemVal {
  let mut list = take(&mut vals, 0).into_inits();
  list.extend(take(&mut vals, 2).into_inits());
  SemVal::Inits(list)
}

pub fn build_exp_call(mut vals: Vec<SemVal>) -> SemVal {
  let callee = take(&mut vals, 0).into_str();
  let args = match take(&mut vals, 2) {
    SemVal::Inits(wrappers) => wrappers
      .into_iter()
      .filter_map(|w| w.value)
      .map(|e| *e)
      .collect(),
    _ => vec![],
  };
  SemVal::Expr(Box::new(Expr::Call(callee, args)))
}

pub fn build_unary_op_positive(_: Vec<SemVal>) -> SemVal {
  SemVal::UnaryOp(UnaryOp::Positive)
}

pub fn build_unary_op_negative(_: Vec<SemVal>) -> SemVal {
  SemVal::UnaryOp(UnaryOp::Negative)
}

pub fn build_unary_op_not(_: Vec<SemVal>) -> SemVal {
  SemVal::UnaryOp(UnaryOp::LogicalNot)
}

pub fn build_unary_exp(mut vals: Vec<SemVal>) -> SemVal {
  let op = take(&mut vals, 0).into_unary_op();
  let operand = take(&mut vals, 1).into_expr();
  SemVal::Expr(Box::new(Expr::Unary(op, operand)))
}

fn make_binary(op: BasicOp, mut vals: Vec<SemVal>) -> SemVal {
  let lhs = take(&mut vals, 0).into_expr();
  let rhs = take(&mut vals, 2).into_expr();
  SemVal::Expr(Box::new(Expr::Binary(op, lhs, rhs)))
}

pub fn build_binary_add(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Add, vals)
}

pub fn build_binary_sub(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Sub, vals)
}

pub fn build_binary_mul(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Mul, vals)
}

pub fn build_binary_div(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Div, vals)
}

pub fn build_binary_mod(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Mod, vals)
}

pub fn build_binary_lt(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Lt, vals)
}

pub fn build_binary_gt(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Gt, vals)
}

pub fn build_binary_le(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Le, vals)
}

pub fn build_binary_ge(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Ge, vals)
}

pub fn build_binary_eq(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Eq, vals)
}

pub fn build_binary_neq(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Neq, vals)
}

pub fn build_binary_and(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::And, vals)
}

pub fn build_binary_or(vals: Vec<SemVal>) -> SemVal {
  make_binary(BasicOp::Or, vals)
}
