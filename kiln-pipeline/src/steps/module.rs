use std::sync::Arc;

use kiln_config::Target;
use kiln_phaser::{Interrupt, NamedPhase, PhaseContext, PhaseEngine, PhaseResult, PostAction, PreAction};

use crate::{
    CheckDiagnostics, Emitter, Fir2IrArtifact, FinishMilestone, Milestone, ModuleArtifact,
    ModuleFileEmitter, PipelineContext, StartMilestone, lowering::lowering_tree,
};

/// Runs the pre-serialization lowerings and writes the module file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleStep;

impl ModuleStep {
    pub const NAME: &'static str = "serialize-module";
}

impl NamedPhase<PipelineContext, Fir2IrArtifact, ModuleArtifact> for ModuleStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<Fir2IrArtifact, PipelineContext>>> {
        vec![Box::new(StartMilestone(Milestone::Generation))]
    }

    fn post_actions(&self) -> Vec<Box<dyn PostAction<Fir2IrArtifact, ModuleArtifact, PipelineContext>>> {
        vec![
            Box::new(FinishMilestone(Milestone::Generation)),
            Box::new(CheckDiagnostics),
        ]
    }

    fn phase_body(&self, ctx: &mut PipelineContext, input: &Fir2IrArtifact) -> PhaseResult<ModuleArtifact> {
        let tree = lowering_tree::<PipelineContext>(Target::Module).map_err(Interrupt::fatal)?;
        let mut engine = PhaseEngine::new(Arc::clone(&input.phases));
        let module = input
            .take_module()
            .ok_or_else(|| Interrupt::fatal("translated module was already consumed"))?;
        let module = engine.run_phases(&tree, ctx, module)?;
        if ctx.diagnostics().has_errors() {
            return Err(Interrupt::step_failed());
        }

        let path = ModuleFileEmitter.emit(&module, &input.configuration.output_dir)?;
        tracing::info!(module = %module.name, path = %path.display(), "wrote module file");
        Ok(ModuleArtifact {
            configuration: Arc::clone(&input.configuration),
            path,
            module,
        })
    }
}

#[cfg(test)]
mod tests {
    use kiln_config::{CompilerArguments, CompilerConfiguration};
    use kiln_core::{CancellationStatus, CollectingMessageCollector, Disposable};
    use kiln_ir::{Expr, FqName, IrDeclaration, IrDeclarationKind, IrFile, IrFunction, IrModule, Stmt, TypeRef};
    use kiln_phaser::PhaseConfigurationService;

    use super::*;
    use crate::{PipelineStep, StepStatus};

    #[test]
    fn test_writes_lowered_module_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let configuration = CompilerConfiguration::resolve(&CompilerArguments {
            output_dir: Some(dir.path().to_path_buf()),
            target: Target::Module,
            ..Default::default()
        })
        .expect("valid arguments");
        let function = |fq: &str, expect: bool, body: Vec<Stmt>| IrDeclaration {
            fq_name: FqName::new(fq),
            expect,
            line: None,
            kind: IrDeclarationKind::Function(IrFunction {
                params: Vec::new(),
                return_type: TypeRef::new("Int"),
                body,
            }),
        };
        let input = Fir2IrArtifact::new(
            Arc::new(configuration),
            Arc::new(PhaseConfigurationService::default()),
            IrModule {
                name: "main".into(),
                files: vec![IrFile {
                    path: "app.kn".into(),
                    package: "app".into(),
                    declarations: vec![
                        function("app.platform", true, Vec::new()),
                        function(
                            "app.main",
                            false,
                            vec![Stmt::Return {
                                value: Expr::CallableReference {
                                    target: "app.main".into(),
                                },
                            }],
                        ),
                    ],
                }],
            },
        );
        let mut ctx = PipelineContext::new(
            Arc::new(CollectingMessageCollector::new()),
            CancellationStatus::new(),
            Arc::new(Disposable::new("test")),
        );

        let StepStatus::Continue(artifact) = ModuleStep.execute(&mut ctx, &input).expect("not fatal") else {
            panic!("serialization should succeed");
        };

        assert_eq!(artifact.path, dir.path().join("main.klib"));
        let written: IrModule =
            serde_json::from_str(&std::fs::read_to_string(&artifact.path).expect("module file")).expect("valid json");
        assert_eq!(written, artifact.module);
        assert!(written.declaration("app.platform").is_none());
        assert_eq!(
            written.function("app.main").expect("main").body,
            vec![Stmt::Return {
                value: Expr::FunctionReference {
                    target: "app.main".into(),
                    arity: 0,
                },
            }]
        );
        assert!(ctx.performance.milestone(Milestone::Generation).is_some());
    }
}
