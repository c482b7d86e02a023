//! Target emitters.
//!
//! The instruction encoding of the output is not the pipeline's concern:
//! an [`Emitter`] turns a lowered module into file contents and the backend
//! decides where the file goes.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use eyre::WrapErr;
use kiln_ir::{Constant, Expr, IrDeclaration, IrDeclarationKind, IrModule, Stmt};

/// Turns a lowered module into a target file.
pub trait Emitter: Send + Sync {
    fn name(&self) -> &str;

    /// Extension of emitted files, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, module: &IrModule) -> eyre::Result<String>;

    /// Render `module` and write it to `{output_dir}/{module}.{extension}`.
    fn emit(&self, module: &IrModule, output_dir: &Path) -> eyre::Result<PathBuf> {
        let content = self.render(module)?;
        fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("failed to create {}", output_dir.display()))?;
        let path = output_dir.join(format!("{}.{}", module.name, self.extension()));
        fs::write(&path, content).wrap_err_with(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(emitter = self.name(), path = %path.display(), "emitted module");
        Ok(path)
    }
}

/// Emits a textual listing of each lowered declaration. Stands in for a
/// bytecode writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingEmitter;

impl Emitter for ListingEmitter {
    fn name(&self) -> &str {
        "listing"
    }

    fn extension(&self) -> &str {
        "kbc"
    }

    fn render(&self, module: &IrModule) -> eyre::Result<String> {
        let mut out = String::new();
        writeln!(out, "module {}", module.name)?;
        for decl in module.declarations() {
            render_declaration(&mut out, decl)?;
        }
        Ok(out)
    }
}

/// Serializes the module as JSON, the module-file format other compilations
/// link against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleFileEmitter;

impl Emitter for ModuleFileEmitter {
    fn name(&self) -> &str {
        "module-file"
    }

    fn extension(&self) -> &str {
        "klib"
    }

    fn render(&self, module: &IrModule) -> eyre::Result<String> {
        Ok(serde_json::to_string_pretty(module)?)
    }
}

fn render_declaration(out: &mut String, decl: &IrDeclaration) -> std::fmt::Result {
    let expect = if decl.expect { "expect " } else { "" };
    match &decl.kind {
        IrDeclarationKind::Function(function) => {
            let params: Vec<String> = function
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect();
            writeln!(
                out,
                "{}fun {}({}): {}",
                expect,
                decl.fq_name,
                params.join(", "),
                function.return_type
            )?;
            for stmt in &function.body {
                match stmt {
                    Stmt::Let { name, value } => writeln!(out, "    let {} = {}", name, render_expr(value))?,
                    Stmt::Eval { value } => writeln!(out, "    {}", render_expr(value))?,
                    Stmt::Return { value } => writeln!(out, "    return {}", render_expr(value))?,
                }
            }
        }
        IrDeclarationKind::Property(property) => match &property.initializer {
            Some(init) => writeln!(
                out,
                "{}val {}: {} = {}",
                expect,
                decl.fq_name,
                property.ty,
                render_expr(init)
            )?,
            None => writeln!(out, "{}val {}: {}", expect, decl.fq_name, property.ty)?,
        },
    }
    Ok(())
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Const { value } => match value {
            Constant::Bool(b) => b.to_string(),
            Constant::Int(i) => i.to_string(),
            Constant::Str(s) => format!("{:?}", s),
        },
        Expr::Local { name } => name.clone(),
        Expr::Binary { op, lhs, rhs } => {
            let op = match op {
                kiln_ir::BinaryOp::Add => "+",
                kiln_ir::BinaryOp::Sub => "-",
                kiln_ir::BinaryOp::Mul => "*",
                kiln_ir::BinaryOp::Div => "/",
                kiln_ir::BinaryOp::Eq => "==",
            };
            format!("({} {} {})", render_expr(lhs), op, render_expr(rhs))
        }
        Expr::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(render_expr).collect();
            format!("{}({})", callee, args.join(", "))
        }
        Expr::CallableReference { target } => format!("::{}", target),
        Expr::FunctionReference { target, arity } => format!("::{}/{}", target, arity),
        Expr::Cast { ty, expr } => format!("({} as {})", render_expr(expr), ty),
    }
}
