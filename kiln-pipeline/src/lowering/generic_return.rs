use kiln_ir::{Expr, IrDeclarationKind, IrModule};
use kiln_phaser::{Condition, LoweringPhase, PhaseContext, PhaseResult};

/// Erases generic return types at call sites.
///
/// A call to a function returning a type parameter yields an erased value;
/// where the call site expects a concrete type the call is wrapped in a
/// cast to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericReturnErasure;

impl GenericReturnErasure {
    pub const NAME: &'static str = "generic-return-erasure";

    /// Holds once no call carries a generic return type.
    pub fn no_generic_returns() -> Condition<IrModule> {
        Condition::new("no-generic-returns", |module: &IrModule| {
            for decl in module.declarations() {
                let exprs: Vec<&Expr> = match &decl.kind {
                    IrDeclarationKind::Function(function) => function.body.iter().map(|s| s.expr()).collect(),
                    IrDeclarationKind::Property(property) => property.initializer.iter().collect(),
                };
                let mut generic = false;
                for expr in exprs {
                    expr.walk(&mut |e| {
                        if let Expr::Call {
                            generic_return: Some(_),
                            ..
                        } = e
                        {
                            generic = true;
                        }
                    });
                }
                if generic {
                    return Err(format!("`{}` still calls with a generic return type", decl.fq_name));
                }
            }
            Ok(())
        })
    }
}

impl<C: PhaseContext> LoweringPhase<C, IrModule> for GenericReturnErasure {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lower(&self, ctx: &mut C, module: &mut IrModule) -> PhaseResult<()> {
        let mut casts = 0usize;
        module.rewrite_exprs(|expr| match expr {
            Expr::Call {
                callee,
                args,
                generic_return: Some(_),
                ty,
            } => {
                let call = Expr::Call {
                    callee,
                    args,
                    generic_return: None,
                    ty: ty.clone(),
                };
                match ty {
                    Some(ty) if !ty.is_type_parameter() => {
                        casts += 1;
                        Expr::Cast {
                            ty,
                            expr: Box::new(call),
                        }
                    }
                    _ => call,
                }
            }
            other => other,
        });
        if ctx.in_verbose_phase() {
            tracing::debug!(module = %module.name, casts, "erased generic returns");
        }
        Ok(())
    }
}
