use kiln_core::Diagnostic;
use kiln_ir::{BinaryOp, Constant, Expr, IrModule};
use kiln_phaser::{LoweringPhase, PhaseContext, PhaseResult};

/// Folds binary operations over constants.
///
/// Overflowing arithmetic is left alone; a constant division by zero is
/// left alone and reported as a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstFolding;

impl ConstFolding {
    pub const NAME: &'static str = "const-folding";
}

impl<C: PhaseContext> LoweringPhase<C, IrModule> for ConstFolding {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lower(&self, ctx: &mut C, module: &mut IrModule) -> PhaseResult<()> {
        let mut folded = 0usize;
        let mut divisions_by_zero = 0usize;
        module.rewrite_exprs(|expr| match expr {
            Expr::Binary { op, lhs, rhs } => {
                let value = match (lhs.as_ref(), rhs.as_ref()) {
                    (Expr::Const { value: l }, Expr::Const { value: r }) => {
                        if op == BinaryOp::Div && *r == Constant::Int(0) {
                            divisions_by_zero += 1;
                        }
                        op.fold(l, r)
                    }
                    _ => None,
                };
                match value {
                    Some(value) => {
                        folded += 1;
                        Expr::Const { value }
                    }
                    None => Expr::Binary { op, lhs, rhs },
                }
            }
            other => other,
        });

        for _ in 0..divisions_by_zero {
            ctx.diagnostics()
                .report(Diagnostic::warning(Self::NAME, "division by zero").named("DIVISION_BY_ZERO"));
        }
        if ctx.in_verbose_phase() {
            tracing::debug!(module = %module.name, folded, "folded constant expressions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kiln_ir::{FqName, IrDeclaration, IrDeclarationKind, IrFile, IrProperty, TypeRef};

    use super::*;
    use crate::lowering::tests::TestContext;

    fn module(init: Expr) -> IrModule {
        IrModule {
            name: "main".into(),
            files: vec![IrFile {
                path: "app.kn".into(),
                package: "app".into(),
                declarations: vec![IrDeclaration {
                    fq_name: FqName::new("app.value"),
                    expect: false,
                    line: None,
                    kind: IrDeclarationKind::Property(IrProperty {
                        ty: TypeRef::new("Int"),
                        initializer: Some(init),
                    }),
                }],
            }],
        }
    }

    fn initializer(module: &IrModule) -> &Expr {
        match &module.declaration("app.value").expect("declared").kind {
            IrDeclarationKind::Property(p) => p.initializer.as_ref().expect("initialized"),
            IrDeclarationKind::Function(_) => unreachable!(),
        }
    }

    #[test]
    fn test_folds_nested_arithmetic() {
        // (1 + 2) * 4
        let mut module = module(Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2)),
            Expr::int(4),
        ));

        ConstFolding
            .lower(&mut TestContext::default(), &mut module)
            .expect("lowers");

        assert_eq!(initializer(&module), &Expr::int(12));
    }

    #[test]
    fn test_keeps_non_constant_operands() {
        let expr = Expr::binary(BinaryOp::Add, Expr::call("app.f", vec![]), Expr::int(1));
        let mut module = module(expr.clone());

        ConstFolding
            .lower(&mut TestContext::default(), &mut module)
            .expect("lowers");

        assert_eq!(initializer(&module), &expr);
    }

    #[test]
    fn test_division_by_zero_warns() {
        let expr = Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0));
        let mut module = module(expr.clone());
        let mut ctx = TestContext::default();

        ConstFolding.lower(&mut ctx, &mut module).expect("lowers");

        assert_eq!(initializer(&module), &expr);
        assert_eq!(ctx.diagnostics.warning_count(), 1);
        assert!(!ctx.diagnostics.has_errors());
    }
}
