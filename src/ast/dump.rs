//! Indented AST dump for inspection and tests.

use std::io::{self, Write};

use super::{BasicOp, BasicType, Block, BlockItem, Expr, FuncDef, Param, Program, Stmt, UnaryOp, VarDecl, VarInit};

impl BasicType {
  pub fn as_str(self) -> &'static str {
    match self {
      BasicType::Int => "int",
      BasicType::Void => "void",
      BasicType::Float => "float",
    }
  }
}

impl UnaryOp {
  pub fn as_str(self) -> &'static str {
    match self {
      UnaryOp::Positive => "+",
      UnaryOp::Negative => "-",
      UnaryOp::LogicalNot => "!",
    }
  }
}

impl BasicOp {
  pub fn as_str(self) -> &'static str {
    match self {
      BasicOp::Add => "+",
      BasicOp::Sub => "-",
      BasicOp::Mul => "*",
      BasicOp::Div => "/",
      BasicOp::Mod => "%",
      BasicOp::Lt => "<",
      BasicOp::Gt => ">",
      BasicOp::Le => "<=",
      BasicOp::Ge => ">=",
      BasicOp::Eq => "==",
      BasicOp::Neq => "!=",
      BasicOp::And => "&&",
      BasicOp::Or => "||",
    }
  }
}

fn indent(out: &mut dyn Write, depth: usize) -> io::Result<()> {
  for _ in 0..depth {
    write!(out, "  ")?;
  }
  Ok(())
}

fn print_var_init(init: &VarInit, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  indent(out, depth)?;
  match &init.value {
    Some(value) => {
      writeln!(out, "{} =", init.name)?;
      print_expr(value, out, depth + 1)
    }
    None => writeln!(out, "{} <uninitialized>", init.name),
  }
}

fn print_decl(decl: &VarDecl, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  indent(out, depth)?;
  let kind = if decl.is_const { "ConstDecl" } else { "VarDecl" };
  writeln!(out, "{} {}", kind, decl.ty.as_str())?;
  for item in &decl.items {
    print_var_init(item, out, depth + 1)?;
  }
  Ok(())
}

fn print_expr(expr: &Expr, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  indent(out, depth)?;
  match expr {
    Expr::IntLit(value) => writeln!(out, "LiteralInt {}", value),
    Expr::FloatLit(value) => writeln!(out, "LiteralFloat {}", value),
    Expr::Ident(name) => writeln!(out, "Identifier {}", name),
    Expr::Unary(op, operand) => {
      writeln!(out, "Unary {}", op.as_str())?;
      print_expr(operand, out, depth + 1)
    }
    Expr::Binary(op, lhs, rhs) => {
      writeln!(out, "Binary {}", op.as_str())?;
      print_expr(lhs, out, depth + 1)?;
      print_expr(rhs, out, depth + 1)
    }
    Expr::Call(callee, args) => {
      writeln!(out, "Call {}", callee)?;
      if args.is_empty() {
        indent(out, depth + 1)?;
        writeln!(out, "<no args>")
      } else {
        for arg in args {
          print_expr(arg, out, depth + 1)?;
        }
        Ok(())
      }
    }
  }
}

fn print_block(block: &Block, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  indent(out, depth)?;
  writeln!(out, "Block")?;
  for item in &block.items {
    indent(out, depth + 1)?;
    match item {
      BlockItem::Decl(decl) => {
        writeln!(out, "Decl")?;
        print_decl(decl, out, depth + 2)?;
      }
      BlockItem::Stmt(stmt) => {
        writeln!(out, "Stmt")?;
        print_stmt(stmt, out, depth + 2)?;
      }
    }
  }
  Ok(())
}

fn print_stmt(stmt: &Stmt, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  if let Stmt::Block(block) = stmt {
    return print_block(block, out, depth);
  }
  indent(out, depth)?;
  match stmt {
    Stmt::Empty => writeln!(out, "EmptyStmt"),
    Stmt::Expr(expr) => {
      writeln!(out, "ExprStmt")?;
      print_expr(expr, out, depth + 1)
    }
    Stmt::Assign(target, expr) => {
      writeln!(out, "Assign {}", target)?;
      print_expr(expr, out, depth + 1)
    }
    Stmt::Return(value) => {
      writeln!(out, "Return")?;
      match value {
        Some(value) => print_expr(value, out, depth + 1),
        None => {
          indent(out, depth + 1)?;
          writeln!(out, "<void>")
        }
      }
    }
    Stmt::If(cond, then_branch, else_branch) => {
      writeln!(out, "If")?;
      indent(out, depth + 1)?;
      writeln!(out, "Cond")?;
      print_expr(cond, out, depth + 2)?;
      indent(out, depth + 1)?;
      writeln!(out, "Then")?;
      print_stmt(then_branch, out, depth + 2)?;
      if let Some(else_branch) = else_branch {
        indent(out, depth + 1)?;
        writeln!(out, "Else")?;
        print_stmt(else_branch, out, depth + 2)?;
      }
      Ok(())
    }
    Stmt::Block(_) => unreachable!("blocks are handled above"),
  }
}

fn print_params(params: &[Param], out: &mut dyn Write, depth: usize) -> io::Result<()> {
  if params.is_empty() {
    indent(out, depth)?;
    return writeln!(out, "<none>");
  }
  for param in params {
    indent(out, depth)?;
    writeln!(out, "{} {}", param.ty.as_str(), param.name)?;
  }
  Ok(())
}

fn print_func(func: &FuncDef, out: &mut dyn Write, depth: usize) -> io::Result<()> {
  indent(out, depth)?;
  writeln!(out, "Func {} {}", func.ty.as_str(), func.name)?;
  indent(out, depth + 1)?;
  writeln!(out, "Params")?;
  print_params(&func.params, out, depth + 2)?;
  indent(out, depth + 1)?;
  writeln!(out, "Body")?;
  print_block(&func.body, out, depth + 2)
}

pub fn print_ast(program: &Program, out: &mut dyn Write) -> io::Result<()> {
  writeln!(out, "Program")?;
  for decl in &program.globals {
    indent(out, 1)?;
    writeln!(out, "GlobalDecl")?;
    print_decl(decl, out, 2)?;
  }
  for func in &program.functions {
    indent(out, 1)?;
    writeln!(out, "Function")?;
    print_func(func, out, 2)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dump_shows_tree_structure() {
    let program = Program {
      globals: vec![VarDecl {
        is_const: true,
        ty: BasicType::Int,
        items: vec![VarInit { name: "K".into(), value: Some(Box::new(Expr::IntLit(5))) }],
      }],
      functions: vec![FuncDef {
        ty: BasicType::Int,
        name: "main".into(),
        params: vec![],
        body: Box::new(Block {
          items: vec![BlockItem::Stmt(Box::new(Stmt::Return(Some(Box::new(Expr::Binary(
            BasicOp::Add,
            Box::new(Expr::Ident("K".into())),
            Box::new(Expr::IntLit(1)),
          ))))))],
        }),
      }],
    };

    let mut sink = Vec::new();
    print_ast(&program, &mut sink).unwrap();
    let text = String::from_utf8(sink).unwrap();
    assert!(text.starts_with("Program\n"));
    assert!(text.contains("ConstDecl int"));
    assert!(text.contains("Func int main"));
    assert!(text.contains("Binary +"));
    assert!(text.contains("Identifier K"));
  }
}
