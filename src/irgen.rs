use koopa::ir::builder::BasicBlockBuilder;
use koopa::ir::dfg::DataFlowGraph;
use koopa::ir::{BasicBlock, Function, FunctionData, Program, Type, Value};

use rustc_hash::FxHashMap;

use crate::ast::{self, BasicType};
use crate::Result;

pub mod decl;
pub mod error;
pub mod eval;
pub mod expr;
pub mod stmt;

use self::error::CompileError;

/// Lowers a parsed program to a Koopa IR module.
pub fn generate_program(program: &ast::Program) -> Result<Program> {
  let mut ir = Program::new();
  let mut context = GenerateContext::new(&mut ir);

  decl::generate_globals(&mut context, &program.globals)?;
  for func in &program.functions {
    context.declare_function(func)?;
  }
  for func in &program.functions {
    decl::generate_function(&mut context, func)?;
  }

  Ok(ir)
}

/// A resolved name: where it lives, what it is, and whether stores are legal.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
  pub addr: Value,
  pub ty: BasicType,
  pub is_const: bool,
  pub is_global: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
  pub function: Function,
  pub return_type: BasicType,
  pub param_types: Vec<BasicType>,
}

/// State threaded through the whole lowering pass: the scope stack, the
/// global function table, and the current insertion point. `bb == None`
/// means the current block already ended with a terminator; instructions
/// emitted in that state are unreachable and dropped.
pub struct GenerateContext<'a> {
  pub program: &'a mut Program,
  scopes: Vec<FxHashMap<String, Binding>>,
  functions: FxHashMap<String, FunctionInfo>,
  pub func: Option<Function>,
  pub bb: Option<BasicBlock>,
  pub ret_type: Option<BasicType>,
  next_bb: i32,
}

impl<'a> GenerateContext<'a> {
  pub fn new(program: &'a mut Program) -> Self {
    GenerateContext {
      program,
      scopes: vec![FxHashMap::default()],
      functions: FxHashMap::default(),
      func: None,
      bb: None,
      ret_type: None,
      next_bb: 0,
    }
  }

  pub fn push_scope(&mut self) {
    self.scopes.push(FxHashMap::default());
  }

  pub fn pop_scope(&mut self) {
    self.scopes.pop();
  }

  /// Shadowing is per-scope: binding over an existing name in the same scope
  /// replaces it, outer bindings stay intact.
  pub fn bind(&mut self, name: &str, binding: Binding) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.insert(name.to_string(), binding);
    }
  }

  /// Innermost-first lookup.
  pub fn lookup(&self, name: &str) -> Option<Binding> {
    for scope in self.scopes.iter().rev() {
      if let Some(binding) = scope.get(name) {
        return Some(*binding);
      }
    }
    None
  }

  pub fn to_ir_type(&self, ty: BasicType) -> Result<Type> {
    match ty {
      BasicType::Int => Ok(Type::get_i32()),
      BasicType::Void => Ok(Type::get_unit()),
      BasicType::Float => Err(CompileError::Unsupported("float lowering"))?,
    }
  }

  /// Registers a function, creating the IR declaration on first sight.
  /// Declaring the same name again returns the existing record.
  pub fn declare_function(&mut self, def: &ast::FuncDef) -> Result<FunctionInfo> {
    if let Some(info) = self.functions.get(&def.name) {
      return Ok(info.clone());
    }

    let mut ir_params = Vec::with_capacity(def.params.len());
    let mut param_types = Vec::with_capacity(def.params.len());
    for param in &def.params {
      ir_params.push((Some(format!("@{}", param.name)), self.to_ir_type(param.ty)?));
      param_types.push(param.ty);
    }
    let ret_ty = self.to_ir_type(def.ty)?;

    let function = self.program.new_func(FunctionData::with_param_names(
      format!("@{}", def.name),
      ir_params,
      ret_ty,
    ));

    let info = FunctionInfo { function, return_type: def.ty, param_types };
    self.functions.insert(def.name.clone(), info.clone());
    Ok(info)
  }

  pub fn find_function(&self, name: &str) -> Option<&FunctionInfo> {
    self.functions.get(name)
  }

  fn cur_func(&self) -> Result<Function> {
    self.func.ok_or_else(|| CompileError::Other("no active function".into()).into())
  }

  pub fn dfg(&mut self) -> Result<&mut DataFlowGraph> {
    let func = self.cur_func()?;
    Ok(self.program.func_mut(func).dfg_mut())
  }

  /// Creates a block, appends it to the function layout, and returns it.
  pub fn add_bb(&mut self, base: &str) -> Result<BasicBlock> {
    let name = format!("%{}_{}", base, self.next_bb);
    self.next_bb += 1;
    let func = self.cur_func()?;
    let data = self.program.func_mut(func);
    let bb = data.dfg_mut().new_bb().basic_block(Some(name));
    data
      .layout_mut()
      .bbs_mut()
      .push_key_back(bb)
      .map_err(|k| CompileError::Other(format!("block {:?} already placed", k)))?;
    Ok(bb)
  }

  /// Merge block with one i32 parameter: the φ that joins the incoming
  /// branch values. Returns the block and the parameter value.
  pub fn add_bb_with_arg(&mut self, base: &str) -> Result<(BasicBlock, Value)> {
    let name = format!("%{}_{}", base, self.next_bb);
    self.next_bb += 1;
    let func = self.cur_func()?;
    let data = self.program.func_mut(func);
    let bb = data.dfg_mut().new_bb().basic_block_with_params(Some(name), vec![Type::get_i32()]);
    data
      .layout_mut()
      .bbs_mut()
      .push_key_back(bb)
      .map_err(|k| CompileError::Other(format!("block {:?} already placed", k)))?;
    let arg = data.dfg().bb(bb).params()[0];
    Ok((bb, arg))
  }

  /// Appends an instruction to the current block. With no insertion point
  /// the instruction is unreachable and silently dropped.
  pub fn add_inst(&mut self, value: Value) -> Result<()> {
    let Some(bb) = self.bb else {
      return Ok(());
    };
    let func = self.cur_func()?;
    self
      .program
      .func_mut(func)
      .layout_mut()
      .bb_mut(bb)
      .insts_mut()
      .push_key_back(value)
      .map_err(|k| CompileError::Other(format!("instruction {:?} already placed", k)))?;
    Ok(())
  }

  /// Ends the current block with `final_inst` and moves the insertion point.
  /// Emission discipline keeps exactly one terminator per block: every path
  /// that ends a block goes through here.
  pub fn switch_bb(&mut self, final_inst: Value, new_bb: Option<BasicBlock>) -> Result<()> {
    self.add_inst(final_inst)?;
    self.bb = new_bb;
    Ok(())
  }
}
