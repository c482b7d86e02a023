use std::collections::HashMap;

use kiln_core::Diagnostic;
use kiln_ir::{Expr, IrDeclarationKind, IrModule};
use kiln_phaser::{Condition, LoweringPhase, PhaseContext, PhaseResult};

/// Turns callable references into function references with an explicit
/// arity. Property references become zero-arity getter references.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallableReferenceUpgrade;

impl CallableReferenceUpgrade {
    pub const NAME: &'static str = "callable-reference-upgrade";

    /// Holds once no unbound callable reference is left.
    pub fn no_callable_references() -> Condition<IrModule> {
        Condition::new("no-callable-references", |module: &IrModule| {
            let mut remaining = None;
            for decl in module.declarations() {
                visit_exprs(&decl.kind, &mut |expr| {
                    if let Expr::CallableReference { target } = expr
                        && remaining.is_none()
                    {
                        remaining = Some(format!("`{}` still references `{}` unbound", decl.fq_name, target));
                    }
                });
            }
            remaining.map_or(Ok(()), Err)
        })
    }
}

fn visit_exprs<'a>(kind: &'a IrDeclarationKind, f: &mut impl FnMut(&'a Expr)) {
    match kind {
        IrDeclarationKind::Function(function) => {
            for stmt in &function.body {
                stmt.expr().walk(f);
            }
        }
        IrDeclarationKind::Property(property) => {
            if let Some(init) = &property.initializer {
                init.walk(f);
            }
        }
    }
}

impl<C: PhaseContext> LoweringPhase<C, IrModule> for CallableReferenceUpgrade {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lower(&self, ctx: &mut C, module: &mut IrModule) -> PhaseResult<()> {
        let arities: HashMap<String, usize> = module
            .declarations()
            .map(|decl| {
                let arity = match &decl.kind {
                    IrDeclarationKind::Function(function) => function.params.len(),
                    IrDeclarationKind::Property(_) => 0,
                };
                (decl.fq_name.to_string(), arity)
            })
            .collect();

        let mut missing = Vec::new();
        module.rewrite_exprs(|expr| match expr {
            Expr::CallableReference { target } => match arities.get(&target) {
                Some(&arity) => Expr::FunctionReference { target, arity },
                None => {
                    missing.push(target.clone());
                    Expr::CallableReference { target }
                }
            },
            other => other,
        });

        for target in missing {
            ctx.diagnostics().report(
                Diagnostic::error(Self::NAME, format!("callable reference to unknown declaration `{}`", target))
                    .named("UNRESOLVED_CALLABLE_REFERENCE"),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kiln_ir::{FqName, IrDeclaration, IrFile, IrFunction, IrParam, Stmt, TypeRef};

    use super::*;
    use crate::lowering::tests::TestContext;

    fn function(fq: &str, params: usize, body: Vec<Stmt>) -> IrDeclaration {
        IrDeclaration {
            fq_name: FqName::new(fq),
            expect: false,
            line: None,
            kind: IrDeclarationKind::Function(IrFunction {
                params: (0..params)
                    .map(|i| IrParam {
                        name: format!("p{}", i),
                        ty: TypeRef::new("Int"),
                    })
                    .collect(),
                return_type: TypeRef::new("Int"),
                body,
            }),
        }
    }

    fn module(body: Vec<Stmt>) -> IrModule {
        IrModule {
            name: "main".into(),
            files: vec![IrFile {
                path: "app.kn".into(),
                package: "app".into(),
                declarations: vec![function("app.add", 2, Vec::new()), function("app.main", 0, body)],
            }],
        }
    }

    #[test]
    fn test_upgrades_references() {
        let mut module = module(vec![Stmt::Eval {
            value: Expr::CallableReference {
                target: "app.add".into(),
            },
        }]);
        let mut ctx = TestContext::default();

        CallableReferenceUpgrade.lower(&mut ctx, &mut module).expect("lowers");

        let main = module.function("app.main").expect("main exists");
        assert_eq!(
            main.body[0].expr(),
            &Expr::FunctionReference {
                target: "app.add".into(),
                arity: 2
            }
        );
        assert!(ctx.diagnostics.is_empty());
        assert!(CallableReferenceUpgrade::no_callable_references().check(&module).is_ok());
    }

    #[test]
    fn test_unknown_target_is_reported() {
        let mut module = module(vec![Stmt::Eval {
            value: Expr::CallableReference {
                target: "app.gone".into(),
            },
        }]);
        let mut ctx = TestContext::default();

        CallableReferenceUpgrade.lower(&mut ctx, &mut module).expect("lowers");

        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert!(CallableReferenceUpgrade::no_callable_references().check(&module).is_err());
    }
}
