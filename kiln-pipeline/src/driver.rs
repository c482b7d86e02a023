//! The top-level driver: one compilation, from raw arguments to exit code.

use std::{
    fmt,
    ops::ControlFlow,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
};

use kiln_config::{CompilerArguments, Target};
use kiln_core::{
    CancellationStatus, CompilationCanceled, Disposable, ExitCode, GroupingMessageCollector,
    MessageCollector, OutOfMemory, Severity, find_cause, has_cause,
};
use kiln_phaser::PhaseContext;

use crate::{
    AnalysisHandler, ArgumentsArtifact, BackendStep, ConfigurationStep, Emitter, FrontendStep,
    ModuleStep, PipelineContext, PipelineStep, StepStatus, TranslateStep,
};

/// Where a run is. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Configuring,
    FrontendAnalyzing,
    LoweringToIr,
    Emitting,
    /// Completed, successfully or with compilation errors.
    Done,
    /// Internal or out-of-memory error.
    Failed,
    Canceled,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DriverState::Done | DriverState::Failed | DriverState::Canceled)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriverState::Init => "init",
            DriverState::Configuring => "configuring",
            DriverState::FrontendAnalyzing => "frontend-analyzing",
            DriverState::LoweringToIr => "lowering-to-ir",
            DriverState::Emitting => "emitting",
            DriverState::Done => "done",
            DriverState::Failed => "failed",
            DriverState::Canceled => "canceled",
        })
    }
}

/// Services a run borrows from whoever hosts it.
#[derive(Debug, Clone, Default)]
pub struct Services {
    /// Polled at safe points; a host cancels through its own clone.
    pub cancellation: CancellationStatus,
    /// Scope for transient environment objects. The driver creates one when
    /// none is given, and disposes it when the run ends either way.
    pub root_disposable: Option<Arc<Disposable>>,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub exit_code: ExitCode,
    pub final_state: DriverState,
    /// Steps that handed an artifact to the next one, in order.
    pub completed_steps: Vec<String>,
}

/// Runs compilations.
///
/// The driver holds no per-run state; a daemon keeps one and calls
/// [`execute`](Self::execute) for every compilation.
#[derive(Debug, Clone, Default)]
pub struct Driver {
    frontend: FrontendStep,
    backend: BackendStep,
    check_only: bool,
}

struct Progress {
    state: DriverState,
    completed_steps: Vec<String>,
}

impl Progress {
    fn advance(&mut self, state: DriverState) {
        tracing::debug!(from = %self.state, to = %state, "driver state");
        self.state = state;
    }

    fn finish(&mut self, state: DriverState, exit_code: ExitCode) {
        self.state = state;
        tracing::info!(state = %state, exit_code = exit_code.code(), "compilation finished");
    }

    /// Unwrap a step's status; anything but `Continue` ends the run.
    fn proceed<T>(
        &mut self,
        ctx: &PipelineContext,
        step: &str,
        status: StepStatus<T>,
    ) -> ControlFlow<ExitCode, T> {
        match status {
            StepStatus::Continue(artifact) => {
                self.completed_steps.push(step.to_string());
                ControlFlow::Continue(artifact)
            }
            StepStatus::Stop(code) => {
                let state = match code {
                    ExitCode::Ok | ExitCode::CompilationError => DriverState::Done,
                    ExitCode::InternalError | ExitCode::OomError => DriverState::Failed,
                };
                self.finish(state, code);
                ControlFlow::Break(code)
            }
            StepStatus::Canceled(canceled) => ControlFlow::Break(self.canceled(ctx, &canceled)),
        }
    }

    fn canceled(&mut self, ctx: &PipelineContext, canceled: &CompilationCanceled) -> ExitCode {
        ctx.messages().report(Severity::Info, &canceled.to_string(), None);
        self.finish(DriverState::Canceled, ExitCode::Ok);
        ExitCode::Ok
    }
}

/// Releases a run's resources when dropped, on every exit path.
struct RunScope {
    ctx: PipelineContext,
    report_perf: bool,
    dump_perf: Option<PathBuf>,
}

impl RunScope {
    fn close(&self) {
        self.ctx.report_diagnostics();
        let messages = self.ctx.messages();
        if self.report_perf {
            self.ctx.performance.report(messages);
        }
        if let Some(path) = &self.dump_perf
            && let Err(err) = self.ctx.performance.dump(path)
        {
            tracing::warn!(path = %path.display(), "failed to write performance report: {:#}", err);
            messages.report(
                Severity::Warning,
                &format!("failed to write performance report: {:#}", err),
                None,
            );
        }
        messages.flush();
        self.ctx.root_disposable().dispose();
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        self.close();
    }
}

macro_rules! step {
    ($progress:expr, $ctx:expr, $name:expr, $status:expr) => {{
        let status = $status;
        match $progress.proceed($ctx, $name, status) {
            ControlFlow::Continue(artifact) => artifact,
            ControlFlow::Break(code) => return Ok(code),
        }
    }};
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` once the frontend resolved the program.
    pub fn with_analysis_handler(mut self, handler: Arc<dyn AnalysisHandler>) -> Self {
        self.frontend = FrontendStep::new().with_handler(handler);
        self
    }

    /// Emit bytecode-target modules with `emitter`.
    pub fn with_emitter(mut self, emitter: Arc<dyn Emitter>) -> Self {
        self.backend = BackendStep::with_emitter(emitter);
        self
    }

    /// Stop after IR translation; nothing is lowered or written.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    pub fn execute(
        &self,
        arguments: CompilerArguments,
        services: &Services,
        messages: Arc<dyn MessageCollector>,
    ) -> ExitCode {
        self.execute_with_summary(arguments, services, messages).exit_code
    }

    pub fn execute_with_summary(
        &self,
        arguments: CompilerArguments,
        services: &Services,
        messages: Arc<dyn MessageCollector>,
    ) -> RunSummary {
        let messages: Arc<dyn MessageCollector> = Arc::new(GroupingMessageCollector::new(
            messages,
            arguments.all_warnings_as_errors,
        ));
        let root_disposable = services
            .root_disposable
            .clone()
            .unwrap_or_else(|| Arc::new(Disposable::new("compilation")));
        let ctx = PipelineContext::new(messages, services.cancellation.clone(), root_disposable)
            .render_internal_diagnostic_names(arguments.render_internal_diagnostic_names)
            .check_only(self.check_only);
        let mut scope = RunScope {
            ctx,
            report_perf: arguments.report_perf,
            dump_perf: arguments.dump_perf.clone(),
        };
        let mut progress = Progress {
            state: DriverState::Init,
            completed_steps: Vec::new(),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&mut scope.ctx, &mut progress, arguments)
        }));
        let exit_code = match outcome {
            Ok(Ok(exit_code)) => self.settle(&scope.ctx, &mut progress, exit_code),
            Ok(Err(report)) => self.failure(&scope.ctx, &mut progress, report),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %message, "compiler panicked");
                scope.ctx.messages().report(
                    Severity::Exception,
                    &format!("internal compiler error: {}", message),
                    None,
                );
                progress.finish(DriverState::Failed, ExitCode::InternalError);
                ExitCode::InternalError
            }
        };
        drop(scope);

        RunSummary {
            exit_code,
            final_state: progress.state,
            completed_steps: progress.completed_steps,
        }
    }

    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut Progress,
        arguments: CompilerArguments,
    ) -> eyre::Result<ExitCode> {
        progress.advance(DriverState::Configuring);
        let input = ArgumentsArtifact { arguments };
        let configured = step!(progress, ctx, ConfigurationStep::NAME, ConfigurationStep.execute(ctx, &input)?);

        progress.advance(DriverState::FrontendAnalyzing);
        let analyzed = step!(progress, ctx, FrontendStep::NAME, self.frontend.execute(ctx, &configured)?);
        if let Some(code) = error_gate(ctx, progress) {
            return Ok(code);
        }

        progress.advance(DriverState::LoweringToIr);
        let translated = step!(progress, ctx, TranslateStep::NAME, TranslateStep.execute(ctx, &analyzed)?);
        if let Some(code) = error_gate(ctx, progress) {
            return Ok(code);
        }
        if ctx.is_check_only() {
            progress.finish(DriverState::Done, ExitCode::Ok);
            return Ok(ExitCode::Ok);
        }

        progress.advance(DriverState::Emitting);
        match translated.configuration.target {
            Target::Bytecode => {
                let binary = step!(progress, ctx, BackendStep::NAME, self.backend.execute(ctx, &translated)?);
                tracing::info!(modules = binary.modules.len(), "backend finished");
            }
            Target::Module => {
                let module = step!(progress, ctx, ModuleStep::NAME, ModuleStep.execute(ctx, &translated)?);
                tracing::info!(path = %module.path.display(), "module serialized");
            }
        }
        progress.finish(DriverState::Done, ExitCode::Ok);
        Ok(ExitCode::Ok)
    }

    /// A run that ended normally. Warnings escalated by the message
    /// collector still fail it.
    fn settle(&self, ctx: &PipelineContext, progress: &mut Progress, exit_code: ExitCode) -> ExitCode {
        ctx.report_diagnostics();
        if exit_code.is_ok() && progress.state != DriverState::Canceled && ctx.messages().has_errors() {
            progress.finish(DriverState::Done, ExitCode::CompilationError);
            return ExitCode::CompilationError;
        }
        exit_code
    }

    fn failure(&self, ctx: &PipelineContext, progress: &mut Progress, report: eyre::Report) -> ExitCode {
        if let Some(canceled) = find_cause::<CompilationCanceled>(&report) {
            return progress.canceled(ctx, canceled);
        }
        if has_cause::<OutOfMemory>(&report) {
            tracing::error!("out of memory: {:#}", report);
            ctx.messages()
                .report(Severity::Exception, &format!("out of memory: {:#}", report), None);
            progress.finish(DriverState::Failed, ExitCode::OomError);
            return ExitCode::OomError;
        }
        tracing::error!("compilation failed: {:?}", report);
        ctx.messages()
            .report(Severity::Exception, &format!("{:#}", report), None);
        progress.finish(DriverState::Failed, ExitCode::InternalError);
        ExitCode::InternalError
    }
}

/// Stop with a compilation error once the diagnostics hold one.
fn error_gate(ctx: &PipelineContext, progress: &mut Progress) -> Option<ExitCode> {
    if ctx.diagnostics().has_errors() {
        progress.finish(DriverState::Done, ExitCode::CompilationError);
        return Some(ExitCode::CompilationError);
    }
    None
}
