//! Code generation for file-scope declarations.

use alloc::format;

use crate::{codegen::GlslWriter, expr::codegen::generate_expr, ir::GlobalDecl, ir::Member};

fn generate_members(w: &mut GlslWriter, members: &[Member]) {
    w.indent();
    for member in members {
        match member.qualifier {
            Some(qualifier) => w.line(&format!("{} {};", qualifier, member.ty.declare(&member.name))),
            None => w.line(&format!("{};", member.ty.declare(&member.name))),
        }
    }
    w.dedent();
}

/// Emit one file-scope declaration.
pub fn generate_global(w: &mut GlslWriter, decl: &GlobalDecl) {
    match decl {
        GlobalDecl::Layout(line) => w.line(line),
        GlobalDecl::Struct { name, members } => {
            w.line(&format!("struct {} {{", name));
            generate_members(w, members);
            w.line("};");
        }
        GlobalDecl::Constant { ty, name, value } => w.line(&format!(
            "const {} = {};",
            ty.declare(name),
            generate_expr(value)
        )),
        GlobalDecl::Variable {
            location,
            direction,
            ty,
            name,
        } => match location {
            Some(location) => w.line(&format!(
                "layout(location={}) {} {};",
                location,
                direction,
                ty.declare(name)
            )),
            None => w.line(&format!("{} {};", direction, ty.declare(name))),
        },
        GlobalDecl::Block {
            direction,
            block,
            members,
            instance,
            arrayed,
        } => {
            w.line(&format!("{} {} {{", direction, block));
            generate_members(w, members);
            let suffix = if *arrayed { "[]" } else { "" };
            w.line(&format!("}} {}{};", instance, suffix));
        }
        GlobalDecl::Uniform { format, ty, name } => match format {
            Some(format) => w.line(&format!(
                "layout({}) uniform {};",
                format,
                ty.declare(name)
            )),
            None => w.line(&format!("uniform {};", ty.declare(name))),
        },
        GlobalDecl::Shared { ty, name } => w.line(&format!("shared {};", ty.declare(name))),
    }
}
