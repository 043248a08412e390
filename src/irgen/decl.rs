//! Top-level lowering: global variables with folded initializers, then
//! function bodies.

use koopa::ir::builder::{GlobalInstBuilder, LocalInstBuilder, ValueBuilder};

use super::error::CompileError;
use super::eval::Eval;
use super::{stmt, Binding, GenerateContext};
use crate::ast::{BasicType, FuncDef, VarDecl};
use crate::Result;

/// Globals are declared before any function body is lowered. Initializers
/// must fold to integers; a missing initializer zero-fills.
pub fn generate_globals(context: &mut GenerateContext, globals: &[VarDecl]) -> Result<()> {
  for decl in globals {
    let ir_type = context.to_ir_type(decl.ty)?;
    for init in &decl.items {
      let init_value = match &init.value {
        Some(value) => {
          let Some(folded) = value.eval() else {
            return Err(CompileError::NonConstInitializer(init.name.clone()))?;
          };
          context.program.new_value().integer(folded)
        }
        None => context.program.new_value().zero_init(ir_type.clone()),
      };
      let global = context.program.new_value().global_alloc(init_value);
      context.program.set_value_name(global, Some(format!("@{}", init.name)));
      context.bind(
        &init.name,
        Binding { addr: global, ty: decl.ty, is_const: decl.is_const, is_global: true },
      );
    }
  }
  Ok(())
}

/// Lowers one function body: entry block, parameter spill slots, the body
/// block, and an implicit zero/void return when the tail block is still
/// open.
pub fn generate_function(context: &mut GenerateContext, def: &FuncDef) -> Result<()> {
  let info = context.declare_function(def)?;
  context.func = Some(info.function);
  context.ret_type = Some(def.ty);
  context.push_scope();

  let entry = context.add_bb("entry")?;
  context.bb = Some(entry);

  // store incoming arguments into addressable slots
  for (i, param) in def.params.iter().enumerate() {
    let arg = context.program.func(info.function).params()[i];
    let ty = context.to_ir_type(param.ty)?;
    let alloc = context.dfg()?.new_value().alloc(ty);
    context.add_inst(alloc)?;
    context.dfg()?.set_value_name(alloc, Some(format!("%{}", param.name)));
    let store = context.dfg()?.new_value().store(arg, alloc);
    context.add_inst(store)?;
    context.bind(
      &param.name,
      Binding { addr: alloc, ty: param.ty, is_const: false, is_global: false },
    );
  }

  stmt::generate_block(&def.body, context)?;

  // a body that falls off the end still produces a terminated function
  if context.bb.is_some() {
    let ret = match def.ty {
      BasicType::Void => context.dfg()?.new_value().ret(None),
      _ => {
        let zero = context.dfg()?.new_value().integer(0);
        context.dfg()?.new_value().ret(Some(zero))
      }
    };
    context.switch_bb(ret, None)?;
  }

  context.pop_scope();
  context.func = None;
  context.ret_type = None;
  Ok(())
}
