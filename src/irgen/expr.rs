//! Expression lowering. Everything computes in i32; comparison results are
//! 0/1 and the conversions between the two views are `as_bool` (`!= 0`) and
//! `as_int` (identity on an already 0/1 value). Short-circuit `&&`/`||`
//! lower to a diamond whose merge block carries the result as a block
//! argument, the φ-node of this IR.

use koopa::ir::builder::{LocalInstBuilder, ValueBuilder};
use koopa::ir::{BinaryOp, Value, ValueKind};

use super::error::CompileError;
use super::GenerateContext;
use crate::ast::{BasicOp, BasicType, Expr, UnaryOp};
use crate::Result;

pub fn generate(expr: &Expr, context: &mut GenerateContext) -> Result<Value> {
  match expr {
    Expr::IntLit(value) => {
      let result = context.dfg()?.new_value().integer(*value);
      Ok(result)
    }
    Expr::FloatLit(_) => Err(CompileError::Unsupported("float lowering"))?,
    Expr::Ident(name) => {
      let Some(binding) = context.lookup(name) else {
        return Err(CompileError::UndeclaredSymbol(name.clone()))?;
      };
      let load = context.dfg()?.new_value().load(binding.addr);
      context.add_inst(load)?;
      Ok(load)
    }
    Expr::Unary(op, operand) => {
      let value = generate(operand, context)?;
      match op {
        UnaryOp::Positive => as_int(value, context),
        UnaryOp::Negative => {
          let value = as_int(value, context)?;
          let zero = context.dfg()?.new_value().integer(0);
          let result = context.dfg()?.new_value().binary(BinaryOp::Sub, zero, value);
          context.add_inst(result)?;
          Ok(result)
        }
        UnaryOp::LogicalNot => {
          let value = as_bool(value, context)?;
          let zero = context.dfg()?.new_value().integer(0);
          let result = context.dfg()?.new_value().binary(BinaryOp::Eq, value, zero);
          context.add_inst(result)?;
          Ok(result)
        }
      }
    }
    Expr::Binary(BasicOp::And, lhs, rhs) => short_circuit(context, lhs, rhs, true),
    Expr::Binary(BasicOp::Or, lhs, rhs) => short_circuit(context, lhs, rhs, false),
    Expr::Binary(op, lhs, rhs) => {
      let lhs = generate(lhs, context)?;
      let lhs = as_int(lhs, context)?;
      let rhs = generate(rhs, context)?;
      let rhs = as_int(rhs, context)?;
      let op = match op {
        BasicOp::Add => BinaryOp::Add,
        BasicOp::Sub => BinaryOp::Sub,
        BasicOp::Mul => BinaryOp::Mul,
        BasicOp::Div => BinaryOp::Div,
        BasicOp::Mod => BinaryOp::Mod,
        BasicOp::Lt => BinaryOp::Lt,
        BasicOp::Gt => BinaryOp::Gt,
        BasicOp::Le => BinaryOp::Le,
        BasicOp::Ge => BinaryOp::Ge,
        BasicOp::Eq => BinaryOp::Eq,
        BasicOp::Neq => BinaryOp::NotEq,
        BasicOp::And | BasicOp::Or => unreachable!("short-circuit ops handled above"),
      };
      let result = context.dfg()?.new_value().binary(op, lhs, rhs);
      context.add_inst(result)?;
      Ok(result)
    }
    Expr::Call(callee, args) => {
      let Some(info) = context.find_function(callee).cloned() else {
        return Err(CompileError::UndeclaredSymbol(callee.clone()))?;
      };
      if info.param_types.len() != args.len() {
        return Err(CompileError::ArgumentMismatch(
          callee.clone(),
          info.param_types.len(),
          args.len(),
        ))?;
      }

      let mut values = Vec::with_capacity(args.len());
      for (arg, &ty) in args.iter().zip(&info.param_types) {
        let value = generate(arg, context)?;
        values.push(cast(value, ty, context)?);
      }
      let call = context.dfg()?.new_value().call(info.function, values);
      context.add_inst(call)?;
      Ok(call)
    }
  }
}

/// `cond ? rhs : false` for `&&`, `cond ? true : rhs` for `||`. The merge
/// block receives the boolean result as its single block argument, with one
/// incoming value from the origin block and one from wherever the right-hand
/// side finished.
fn short_circuit(
  context: &mut GenerateContext,
  lhs: &Expr,
  rhs: &Expr,
  is_and: bool,
) -> Result<Value> {
  let lhs = generate(lhs, context)?;
  let lhs = as_bool(lhs, context)?;

  let (rhs_name, merge_name) = if is_and { ("and_rhs", "and_merge") } else { ("or_rhs", "or_merge") };
  let rhs_bb = context.add_bb(rhs_name)?;
  let (merge_bb, result) = context.add_bb_with_arg(merge_name)?;

  let branch = if is_and {
    let zero = context.dfg()?.new_value().integer(0);
    context.dfg()?.new_value().branch_with_args(lhs, rhs_bb, merge_bb, vec![], vec![zero])
  } else {
    let one = context.dfg()?.new_value().integer(1);
    context.dfg()?.new_value().branch_with_args(lhs, merge_bb, rhs_bb, vec![one], vec![])
  };
  context.switch_bb(branch, Some(rhs_bb))?;

  let rhs = generate(rhs, context)?;
  let rhs = as_bool(rhs, context)?;
  let jump = context.dfg()?.new_value().jump_with_args(merge_bb, vec![rhs]);
  context.switch_bb(jump, Some(merge_bb))?;

  Ok(result)
}

/// Whether a value is already a 0/1 boolean: comparison results and the
/// merge-block arguments produced by short-circuit lowering.
fn is_bool(value: Value, context: &mut GenerateContext) -> Result<bool> {
  let dfg = context.dfg()?;
  if dfg.values().get(&value).is_none() {
    return Ok(false);
  }
  Ok(match dfg.value(value).kind() {
    ValueKind::Binary(binary) => matches!(
      binary.op(),
      BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
    ),
    ValueKind::BlockArgRef(_) => true,
    _ => false,
  })
}

/// int → bool via `!= 0`; a value that is already boolean passes through.
pub fn as_bool(value: Value, context: &mut GenerateContext) -> Result<Value> {
  reject_unit(value, context, "a condition")?;
  if is_bool(value, context)? {
    return Ok(value);
  }
  let zero = context.dfg()?.new_value().integer(0);
  let result = context.dfg()?.new_value().binary(BinaryOp::NotEq, value, zero);
  context.add_inst(result)?;
  Ok(result)
}

/// bool → int is a zero-extension, which in this IR is the identity: both
/// views live in i32.
pub fn as_int(value: Value, context: &mut GenerateContext) -> Result<Value> {
  reject_unit(value, context, "an integer operand")?;
  Ok(value)
}

pub fn cast(value: Value, target: BasicType, context: &mut GenerateContext) -> Result<Value> {
  match target {
    BasicType::Int => as_int(value, context),
    BasicType::Void => Err(CompileError::VoidValue("a cast target"))?,
    BasicType::Float => Err(CompileError::Unsupported("float lowering"))?,
  }
}

fn reject_unit(value: Value, context: &mut GenerateContext, what: &'static str) -> Result<()> {
  let dfg = context.dfg()?;
  if dfg.values().get(&value).is_some() && dfg.value(value).ty().is_unit() {
    return Err(CompileError::VoidValue(what))?;
  }
  Ok(())
}
