use std::{fs, ops::ControlFlow, path::Path, sync::Arc};

use kiln_core::{Diagnostic, DiagnosticsCollector, SourceLocation};
use kiln_ir::{ResolvedDeclaration, ResolvedFile, ResolvedProgram};
use kiln_phaser::{Interrupt, NamedPhase, PhaseContext, PhaseResult, PostAction, PreAction};
use serde::Deserialize;

use crate::{
    CheckDiagnostics, ConfigurationArtifact, FinishMilestone, FrontendArtifact, Milestone,
    PipelineContext, StartMilestone,
};

/// Hook run once the frontend resolved the whole program.
///
/// Tools that only need the resolved program (IDE indexers, API dumpers)
/// break out here; the run then ends successfully without translating.
pub trait AnalysisHandler: Send + Sync {
    fn analysis_completed(
        &self,
        program: &ResolvedProgram,
        diagnostics: &DiagnosticsCollector,
    ) -> ControlFlow<()>;
}

/// A source file as the external resolver writes it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceDocument {
    #[serde(default)]
    package: String,
    #[serde(default)]
    declarations: Vec<ResolvedDeclaration>,
}

/// Loads the resolved source files.
///
/// Unreadable or malformed files are reported as diagnostics; the step
/// fails once every file was looked at, so all of them are reported.
#[derive(Clone, Default)]
pub struct FrontendStep {
    handler: Option<Arc<dyn AnalysisHandler>>,
}

impl FrontendStep {
    pub const NAME: &'static str = "frontend";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: Arc<dyn AnalysisHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl std::fmt::Debug for FrontendStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendStep")
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl NamedPhase<PipelineContext, ConfigurationArtifact, FrontendArtifact> for FrontendStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<ConfigurationArtifact, PipelineContext>>> {
        vec![Box::new(StartMilestone(Milestone::Analysis))]
    }

    fn post_actions(
        &self,
    ) -> Vec<Box<dyn PostAction<ConfigurationArtifact, FrontendArtifact, PipelineContext>>> {
        vec![
            Box::new(FinishMilestone(Milestone::Analysis)),
            Box::new(CheckDiagnostics),
        ]
    }

    fn phase_body(
        &self,
        ctx: &mut PipelineContext,
        input: &ConfigurationArtifact,
    ) -> PhaseResult<FrontendArtifact> {
        let configuration = &input.configuration;
        if configuration.sources.is_empty() {
            if configuration.version {
                return Err(Interrupt::Finished);
            }
            if !configuration.allow_no_source_files {
                ctx.diagnostics()
                    .report(Diagnostic::error(Self::NAME, "no source files").named("NO_SOURCE_FILES"));
                return Err(Interrupt::step_failed());
            }
        }

        let mut program = ResolvedProgram::default();
        for source in &configuration.sources {
            ctx.cancellation().check_canceled()?;
            match load_source(source) {
                Ok(file) => program.files.push(file),
                Err(diagnostic) => ctx.diagnostics().report(*diagnostic),
            }
        }
        ctx.performance.add_source_files(program.files.len());
        tracing::debug!(files = program.files.len(), "frontend loaded sources");

        if let Some(handler) = &self.handler
            && handler.analysis_completed(&program, ctx.diagnostics()).is_break()
        {
            tracing::info!("analysis handler stopped the pipeline");
            return Err(Interrupt::Finished);
        }

        Ok(FrontendArtifact {
            configuration: Arc::clone(configuration),
            phases: Arc::clone(&input.phases),
            program,
        })
    }
}

fn load_source(path: &Path) -> Result<ResolvedFile, Box<Diagnostic>> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|err| {
        Box::new(
            Diagnostic::error(FrontendStep::NAME, format!("cannot read source file: {}", err))
                .at(SourceLocation::file(&display))
                .named("SOURCE_NOT_READABLE"),
        )
    })?;
    let document: SourceDocument = serde_json::from_str(&text).map_err(|err| {
        Box::new(
            Diagnostic::error(FrontendStep::NAME, format!("malformed source file: {}", err))
                .at(SourceLocation::at(&display, err.line() as u32, err.column() as u32))
                .named("SYNTAX_ERROR"),
        )
    })?;
    Ok(ResolvedFile {
        path: display,
        package: document.package,
        declarations: document.declarations,
    })
}
