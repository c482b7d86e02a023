use kiln_ir::IrModule;
use kiln_phaser::{Condition, LoweringPhase, PhaseContext, PhaseResult};

/// Drops platform `expect` declarations; only their actual counterparts
/// reach the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectDeclarationsRemoval;

impl ExpectDeclarationsRemoval {
    pub const NAME: &'static str = "expect-declarations-removal";

    /// Holds once no `expect` declaration is left.
    pub fn no_expect_declarations() -> Condition<IrModule> {
        Condition::new("no-expect-declarations", |module: &IrModule| {
            match module.declarations().find(|decl| decl.expect) {
                Some(decl) => Err(format!("`{}` is still an expect declaration", decl.fq_name)),
                None => Ok(()),
            }
        })
    }
}

impl<C: PhaseContext> LoweringPhase<C, IrModule> for ExpectDeclarationsRemoval {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lower(&self, ctx: &mut C, module: &mut IrModule) -> PhaseResult<()> {
        let verbose = ctx.in_verbose_phase();
        for file in &mut module.files {
            file.declarations.retain(|decl| {
                if decl.expect && verbose {
                    tracing::debug!(declaration = %decl.fq_name, "removing expect declaration");
                }
                !decl.expect
            });
        }
        Ok(())
    }
}
