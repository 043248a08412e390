//! Statement and block lowering.

use koopa::ir::builder::{LocalInstBuilder, ValueBuilder};

use super::error::CompileError;
use super::{expr, Binding, GenerateContext};
use crate::ast::{BasicType, Block, BlockItem, Stmt, VarDecl};
use crate::Result;

pub fn generate(item: &BlockItem, context: &mut GenerateContext) -> Result<()> {
  match item {
    BlockItem::Stmt(stmt) => generate_stmt(stmt, context),
    BlockItem::Decl(decl) => generate_local_decl(decl, context),
  }
}

/// Opens a fresh scope for the block, lowers each item, and closes it.
pub fn generate_block(block: &Block, context: &mut GenerateContext) -> Result<()> {
  context.push_scope();
  for item in &block.items {
    generate(item, context)?;
  }
  context.pop_scope();
  Ok(())
}

fn generate_stmt(stmt: &Stmt, context: &mut GenerateContext) -> Result<()> {
  match stmt {
    Stmt::Empty => {}
    Stmt::Expr(exp) => {
      expr::generate(exp, context)?;
    }
    Stmt::Assign(target, exp) => {
      let Some(binding) = context.lookup(target) else {
        return Err(CompileError::UndeclaredSymbol(target.clone()))?;
      };
      if binding.is_const {
        return Err(CompileError::AssignToConst(target.clone()))?;
      }
      let value = expr::generate(exp, context)?;
      let value = expr::cast(value, binding.ty, context)?;
      let store = context.dfg()?.new_value().store(value, binding.addr);
      context.add_inst(store)?;
    }
    Stmt::Return(exp) => {
      let Some(ret_type) = context.ret_type else {
        return Err(CompileError::Other("return outside of a function".into()))?;
      };
      let ret = match ret_type {
        BasicType::Void => context.dfg()?.new_value().ret(None),
        _ => {
          let value = match exp {
            Some(exp) => {
              let value = expr::generate(exp, context)?;
              expr::cast(value, ret_type, context)?
            }
            None => context.dfg()?.new_value().integer(0),
          };
          context.dfg()?.new_value().ret(Some(value))
        }
      };
      context.switch_bb(ret, None)?;
    }
    Stmt::Block(block) => generate_block(block, context)?,
    Stmt::If(cond, then_branch, else_branch) => {
      let cond = expr::generate(cond, context)?;
      let cond = expr::as_bool(cond, context)?;

      let then_bb = context.add_bb("if_then")?;
      let end_bb = context.add_bb("if_end")?;
      match else_branch {
        None => {
          let branch = context.dfg()?.new_value().branch(cond, then_bb, end_bb);
          context.switch_bb(branch, Some(then_bb))?;
          generate_stmt(then_branch, context)?;
        }
        Some(else_branch) => {
          let else_bb = context.add_bb("if_else")?;
          let branch = context.dfg()?.new_value().branch(cond, then_bb, else_bb);
          context.switch_bb(branch, Some(then_bb))?;
          generate_stmt(then_branch, context)?;

          let jump = context.dfg()?.new_value().jump(end_bb);
          context.switch_bb(jump, Some(else_bb))?;
          generate_stmt(else_branch, context)?;
        }
      }
      let jump = context.dfg()?.new_value().jump(end_bb);
      context.switch_bb(jump, Some(end_bb))?;
    }
  }
  Ok(())
}

/// Local declarations allocate a slot per declarator; initializers are
/// evaluated and stored after conversion to the declared type. Const-ness
/// only matters to later assignment checks.
fn generate_local_decl(decl: &VarDecl, context: &mut GenerateContext) -> Result<()> {
  let ir_type = context.to_ir_type(decl.ty)?;
  for init in &decl.items {
    let alloc = context.dfg()?.new_value().alloc(ir_type.clone());
    context.add_inst(alloc)?;
    context.dfg()?.set_value_name(alloc, Some(format!("@{}", init.name)));
    context.bind(
      &init.name,
      Binding { addr: alloc, ty: decl.ty, is_const: decl.is_const, is_global: false },
    );
    if let Some(value) = &init.value {
      let value = expr::generate(value, context)?;
      let value = expr::cast(value, decl.ty, context)?;
      let store = context.dfg()?.new_value().store(value, alloc);
      context.add_inst(store)?;
    }
  }
  Ok(())
}
