//! Code generation for GLSL control flow constructs.

use alloc::format;

use crate::{
    codegen::GlslWriter,
    expr::codegen::{generate_condition, generate_expr},
    ir::{ForStep, GlslStmt, TypedExpr},
    stmt::codegen::generate_block,
};

/// Emit an `if` chain; a lone `if` in the else branch becomes `else if`.
pub fn generate_if(w: &mut GlslWriter, cond: &TypedExpr, then: &[GlslStmt], otherwise: &[GlslStmt]) {
    w.line(&format!("if {} {{", generate_condition(cond)));
    w.indent();
    generate_block(w, then);
    w.dedent();

    let mut rest = otherwise;
    loop {
        match rest {
            [] => break,
            [GlslStmt::If {
                cond,
                then,
                otherwise,
            }] => {
                w.line(&format!("}} else if {} {{", generate_condition(cond)));
                w.indent();
                generate_block(w, then);
                w.dedent();
                rest = otherwise;
            }
            _ => {
                w.line("} else {");
                w.indent();
                generate_block(w, rest);
                w.dedent();
                break;
            }
        }
    }
    w.line("}");
}

/// Emit a counted `for` loop.
pub fn generate_for(w: &mut GlslWriter, stmt: &GlslStmt) {
    let GlslStmt::For {
        var,
        var_ty,
        start,
        cmp,
        stop,
        step,
        body,
    } = stmt
    else {
        return;
    };
    let step = match step {
        ForStep::Increment => format!("{}++", var),
        ForStep::Add(k) => format!("{} += {}", var, generate_expr(k)),
        ForStep::Sub(k) => format!("{} -= {}", var, generate_expr(k)),
    };
    w.line(&format!(
        "for ({} = {}; {} {} {}; {}) {{",
        var_ty.declare(var),
        generate_expr(start),
        var,
        cmp,
        generate_expr(stop),
        step
    ));
    w.indent();
    generate_block(w, body);
    w.dedent();
    w.line("}");
}

pub fn generate_while(w: &mut GlslWriter, cond: &TypedExpr, body: &[GlslStmt]) {
    w.line(&format!("while {} {{", generate_condition(cond)));
    w.indent();
    generate_block(w, body);
    w.dedent();
    w.line("}");
}
