//! Code generation for GLSL statements.

use alloc::{format, string::String, vec::Vec};

use crate::{
    codegen::GlslWriter,
    control::codegen::{generate_for, generate_if, generate_while},
    expr::codegen::generate_expr,
    ir::GlslStmt,
};

/// Emit a statement list at the writer's current indentation.
pub fn generate_block(w: &mut GlslWriter, stmts: &[GlslStmt]) {
    for stmt in stmts {
        generate_statement(w, stmt);
    }
}

/// Emit one statement.
pub fn generate_statement(w: &mut GlslWriter, stmt: &GlslStmt) {
    match stmt {
        GlslStmt::Declare { ty, name, init } => match init {
            Some(init) => w.line(&format!("{} = {};", ty.declare(name), generate_expr(init))),
            None => w.line(&format!("{};", ty.declare(name))),
        },
        GlslStmt::Assign { target, value } => w.line(&format!(
            "{} = {};",
            generate_expr(target),
            generate_expr(value)
        )),
        GlslStmt::Expr(expr) => w.line(&format!("{};", generate_expr(expr))),
        GlslStmt::Call { name, args } => {
            let args: Vec<String> = args.iter().map(generate_expr).collect();
            w.line(&format!("{}({});", name, args.join(", ")));
        }
        GlslStmt::If {
            cond,
            then,
            otherwise,
        } => generate_if(w, cond, then, otherwise),
        GlslStmt::For { .. } => generate_for(w, stmt),
        GlslStmt::While { cond, body } => generate_while(w, cond, body),
        GlslStmt::Break => w.line("break;"),
        GlslStmt::Continue => w.line("continue;"),
        GlslStmt::Return(None) => w.line("return;"),
        GlslStmt::Return(Some(value)) => w.line(&format!("return {};", generate_expr(value))),
        GlslStmt::Discard => w.line("discard;"),
    }
}
