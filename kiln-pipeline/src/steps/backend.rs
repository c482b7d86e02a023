use std::{path::Path, sync::Arc, time::Duration};

use kiln_config::Target;
use kiln_core::{CancellationStatus, DiagnosticsCollector, MessageCollector};
use kiln_ir::IrModule;
use kiln_phaser::{Interrupt, NamedPhase, PhaseContext, PhaseEngine, PhaseResult, PostAction, PreAction};
use rayon::prelude::*;

use crate::{
    BinaryArtifact, CheckDiagnostics, EmittedModule, Emitter, Fir2IrArtifact, FinishMilestone,
    ListingEmitter, Milestone, PipelineContext, StartMilestone, lowering::lowering_tree,
};

/// Lowers and emits every module of the chunk.
///
/// Each module gets its own phase engine and runs on a worker of a pool
/// sized by `backend_threads`. Workers share the run's diagnostics, message
/// collector and cancellation flag; everything else is per module.
#[derive(Clone)]
pub struct BackendStep {
    emitter: Arc<dyn Emitter>,
}

impl BackendStep {
    pub const NAME: &'static str = "backend";

    pub fn new() -> Self {
        Self {
            emitter: Arc::new(ListingEmitter),
        }
    }

    pub fn with_emitter(emitter: Arc<dyn Emitter>) -> Self {
        Self { emitter }
    }
}

impl Default for BackendStep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendStep")
            .field("emitter", &self.emitter.name())
            .finish()
    }
}

/// Phase context of one backend worker.
struct WorkerContext<'a> {
    diagnostics: &'a DiagnosticsCollector,
    messages: &'a dyn MessageCollector,
    cancellation: &'a CancellationStatus,
    in_verbose_phase: bool,
    phase_times: Vec<(String, Duration)>,
}

impl PhaseContext for WorkerContext<'_> {
    fn diagnostics(&self) -> &DiagnosticsCollector {
        self.diagnostics
    }

    fn messages(&self) -> &dyn MessageCollector {
        self.messages
    }

    fn cancellation(&self) -> &CancellationStatus {
        self.cancellation
    }

    fn in_verbose_phase(&self) -> bool {
        self.in_verbose_phase
    }

    fn set_in_verbose_phase(&mut self, verbose: bool) {
        self.in_verbose_phase = verbose;
    }

    fn record_phase_time(&mut self, phase: &str, elapsed: Duration) {
        self.phase_times.push((phase.to_string(), elapsed));
    }
}

struct ModuleOutput {
    emitted: EmittedModule,
    phase_times: Vec<(String, Duration)>,
}

impl BackendStep {
    /// The modules to lower. A single-module chunk takes the translated
    /// module out and lowers it in place; otherwise each module gets a copy
    /// holding only the files it owns.
    fn split(input: &Fir2IrArtifact) -> PhaseResult<Vec<IrModule>> {
        let chunk = &input.configuration.module_chunk;
        if chunk.is_single() {
            let mut module = input
                .take_module()
                .ok_or_else(|| Interrupt::fatal("translated module was already consumed"))?;
            if let Some(spec) = chunk.modules().first() {
                module.name.clone_from(&spec.name);
            }
            return Ok(vec![module]);
        }
        input
            .with_module(|module| {
                chunk
                    .modules()
                    .iter()
                    .map(|spec| module.copy_with_files(&spec.name, |path| spec.owns(Path::new(path))))
                    .collect()
            })
            .ok_or_else(|| Interrupt::fatal("translated module was already consumed"))
    }

    fn lower_module(
        &self,
        input: &Fir2IrArtifact,
        mut worker: WorkerContext<'_>,
        module: IrModule,
        nested_dumps: bool,
    ) -> PhaseResult<ModuleOutput> {
        worker.cancellation.check_canceled()?;
        let _span = tracing::debug_span!("backend", module = %module.name).entered();

        let mut engine = PhaseEngine::new(Arc::clone(&input.phases));
        if nested_dumps {
            engine = engine.with_dump_subdirectory(&module.name);
        }
        let tree = lowering_tree(Target::Bytecode).map_err(Interrupt::fatal)?;
        let lowered = engine.run_phases(&tree, &mut worker, module)?;
        if worker.diagnostics.has_errors() {
            return Err(Interrupt::step_failed());
        }

        worker.cancellation.check_canceled()?;
        let path = self.emitter.emit(&lowered, &input.configuration.output_dir)?;
        Ok(ModuleOutput {
            emitted: EmittedModule {
                name: lowered.name.clone(),
                path,
                declarations: lowered.declaration_count(),
            },
            phase_times: worker.phase_times,
        })
    }
}

impl NamedPhase<PipelineContext, Fir2IrArtifact, BinaryArtifact> for BackendStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<Fir2IrArtifact, PipelineContext>>> {
        vec![Box::new(StartMilestone(Milestone::Generation))]
    }

    fn post_actions(&self) -> Vec<Box<dyn PostAction<Fir2IrArtifact, BinaryArtifact, PipelineContext>>> {
        vec![
            Box::new(FinishMilestone(Milestone::Generation)),
            Box::new(CheckDiagnostics),
        ]
    }

    fn phase_body(&self, ctx: &mut PipelineContext, input: &Fir2IrArtifact) -> PhaseResult<BinaryArtifact> {
        let modules = Self::split(input)?;
        let nested_dumps = modules.len() > 1;
        let threads = input.configuration.backend_threads.clamp(1, modules.len().max(1));
        tracing::debug!(modules = modules.len(), threads, emitter = self.emitter.name(), "starting backend");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("kiln-backend-{}", index))
            .build()
            .map_err(|err| Interrupt::Fatal(err.into()))?;

        let diagnostics = ctx.shared_diagnostics();
        let messages = ctx.shared_messages();
        let cancellation = ctx.cancellation().clone();
        let results: Vec<PhaseResult<ModuleOutput>> = pool.install(|| {
            modules
                .into_par_iter()
                .map(|module| {
                    let worker = WorkerContext {
                        diagnostics: &diagnostics,
                        messages: messages.as_ref(),
                        cancellation: &cancellation,
                        in_verbose_phase: false,
                        phase_times: Vec::new(),
                    };
                    self.lower_module(input, worker, module, nested_dumps)
                })
                .collect()
        });

        let mut emitted = Vec::with_capacity(results.len());
        for result in results {
            let output = result?;
            for (phase, elapsed) in output.phase_times {
                ctx.record_phase_time(&phase, elapsed);
            }
            emitted.push(output.emitted);
        }

        Ok(BinaryArtifact {
            configuration: Arc::clone(&input.configuration),
            modules: emitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use kiln_config::{CompilerArguments, CompilerConfiguration, ModuleArguments};
    use kiln_core::{CollectingMessageCollector, Disposable, ExitCode};
    use kiln_ir::{Expr, FqName, IrDeclaration, IrDeclarationKind, IrFile, IrProperty, TypeRef};
    use kiln_phaser::{PhaseConfig, PhaseConfigurationService, PhaseSet};

    use super::*;
    use crate::{PipelineStep, StepStatus};

    fn property(fq: &str, value: i64) -> IrDeclaration {
        IrDeclaration {
            fq_name: FqName::new(fq),
            expect: false,
            line: None,
            kind: IrDeclarationKind::Property(IrProperty {
                ty: TypeRef::new("Int"),
                initializer: Some(Expr::int(value)),
            }),
        }
    }

    fn translated(arguments: CompilerArguments, phases: PhaseConfig) -> Fir2IrArtifact {
        Fir2IrArtifact::new(
            Arc::new(CompilerConfiguration::resolve(&arguments).expect("valid arguments")),
            Arc::new(PhaseConfigurationService::new(phases)),
            IrModule {
                name: "main".into(),
                files: vec![
                    IrFile {
                        path: "core.kn".into(),
                        package: "core".into(),
                        declarations: vec![property("core.one", 1)],
                    },
                    IrFile {
                        path: "app.kn".into(),
                        package: "app".into(),
                        declarations: vec![property("app.two", 2), property("app.three", 3)],
                    },
                ],
            },
        )
    }

    fn context() -> PipelineContext {
        PipelineContext::new(
            Arc::new(CollectingMessageCollector::new()),
            CancellationStatus::new(),
            Arc::new(Disposable::new("test")),
        )
    }

    #[test]
    fn test_single_module_keeps_every_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = translated(
            CompilerArguments {
                output_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            PhaseConfig::default(),
        );
        let mut ctx = context();

        let StepStatus::Continue(artifact) = BackendStep::new().execute(&mut ctx, &input).expect("not fatal") else {
            panic!("backend should succeed");
        };

        assert_eq!(
            artifact.modules,
            vec![EmittedModule {
                name: "main".into(),
                path: dir.path().join("main.kbc"),
                declarations: 3,
            }]
        );
        let listing = std::fs::read_to_string(dir.path().join("main.kbc")).expect("listing");
        assert!(listing.starts_with("module main\n"));
    }

    #[test]
    fn test_single_module_is_moved_not_copied() {
        let input = translated(CompilerArguments::default(), PhaseConfig::default());
        let files = input.with_module(|module| module.files.as_ptr()).expect("module present");

        let modules = BackendStep::split(&input).expect("split");

        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].files.as_ptr(), files);
        assert!(input.with_module(|_| ()).is_none());
        assert!(matches!(BackendStep::split(&input), Err(Interrupt::Fatal(_))));
    }

    #[test]
    fn test_chunk_split_leaves_translated_module_in_place() {
        let input = translated(
            CompilerArguments {
                sources: vec!["core.kn".into(), "app.kn".into()],
                modules: vec![
                    ModuleArguments {
                        name: "core".into(),
                        sources: vec!["core.kn".into()],
                    },
                    ModuleArguments {
                        name: "app".into(),
                        sources: vec!["app.kn".into()],
                    },
                ],
                ..Default::default()
            },
            PhaseConfig::default(),
        );

        let modules = BackendStep::split(&input).expect("split");

        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "app"]);
        assert_eq!(input.with_module(IrModule::declaration_count), Some(3));
    }

    #[test]
    fn test_chunk_splits_by_owned_files_in_order() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dumps = dir.path().join("dumps");
        let input = translated(
            CompilerArguments {
                sources: vec!["core.kn".into(), "app.kn".into()],
                output_dir: Some(dir.path().to_path_buf()),
                modules: vec![
                    ModuleArguments {
                        name: "core".into(),
                        sources: vec!["core.kn".into()],
                    },
                    ModuleArguments {
                        name: "app".into(),
                        sources: vec!["app.kn".into()],
                    },
                ],
                backend_threads: Some(2),
                ..Default::default()
            },
            PhaseConfig {
                dump_after: PhaseSet::of(["const-folding"]),
                dump_directory: Some(dumps.clone()),
                profile: true,
                ..Default::default()
            },
        );
        let mut ctx = context();

        let StepStatus::Continue(artifact) = BackendStep::new().execute(&mut ctx, &input).expect("not fatal") else {
            panic!("backend should succeed");
        };

        let names: Vec<_> = artifact.modules.iter().map(|m| (m.name.as_str(), m.declarations)).collect();
        assert_eq!(names, vec![("core", 1), ("app", 2)]);
        assert!(dir.path().join("core.kbc").exists());
        assert!(dir.path().join("app.kbc").exists());
        assert!(dumps.join("core").join("006_const-folding.after.json").exists());
        assert!(dumps.join("app").join("006_const-folding.after.json").exists());
        assert!(ctx.performance.phase("const-folding").is_some());
    }

    #[test]
    fn test_canceled_before_lowering() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = translated(
            CompilerArguments {
                output_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            PhaseConfig::default(),
        );
        let mut ctx = context();
        ctx.cancellation().cancel("shutdown");

        let status = BackendStep::new().execute(&mut ctx, &input).expect("not fatal");

        assert!(matches!(status, StepStatus::Canceled(_)));
        assert!(!dir.path().join("main.kbc").exists());
    }

    #[test]
    fn test_lowering_errors_fail_the_step() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let translated = translated(
            CompilerArguments {
                output_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            PhaseConfig::default(),
        );
        let mut module = translated.take_module().expect("module present");
        module.files[0].declarations[0] = IrDeclaration {
            kind: IrDeclarationKind::Property(IrProperty {
                ty: TypeRef::new("Int"),
                initializer: Some(Expr::CallableReference {
                    target: "core.nowhere".into(),
                }),
            }),
            ..property("core.one", 1)
        };
        let input = Fir2IrArtifact::new(translated.configuration, translated.phases, module);
        let mut ctx = context();

        let status = BackendStep::new().execute(&mut ctx, &input).expect("not fatal");

        assert_eq!(status.exit_code(), Some(ExitCode::CompilationError));
        assert!(!dir.path().join("main.kbc").exists());
    }
}
