use std::sync::Arc;

use kiln_config::CompilerConfiguration;
use kiln_core::{Diagnostic, Severity};
use kiln_phaser::{
    Interrupt, NamedPhase, PhaseConfig, PhaseConfigurationService, PhaseContext, PhaseEngine,
    PhaseResult, PostAction, PreAction,
};

use crate::{
    ArgumentsArtifact, CheckDiagnostics, ConfigurationArtifact, FinishMilestone, Milestone,
    PipelineContext, StartMilestone,
    lowering::{lowering_phase_names, lowering_tree},
};

/// Resolves raw arguments into the compiler configuration and the phase
/// configuration of the lowerings.
///
/// Phase names in the disable, verbose, dump and validate lists that are not
/// part of the target's lowering tree are reported as errors. With
/// `list_phases` the step prints the lowering tree and stops the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationStep;

impl ConfigurationStep {
    pub const NAME: &'static str = "configuration";
}

impl NamedPhase<PipelineContext, ArgumentsArtifact, ConfigurationArtifact> for ConfigurationStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<ArgumentsArtifact, PipelineContext>>> {
        vec![Box::new(StartMilestone(Milestone::Initialization))]
    }

    fn post_actions(
        &self,
    ) -> Vec<Box<dyn PostAction<ArgumentsArtifact, ConfigurationArtifact, PipelineContext>>> {
        vec![
            Box::new(FinishMilestone(Milestone::Initialization)),
            Box::new(CheckDiagnostics),
        ]
    }

    fn phase_body(
        &self,
        ctx: &mut PipelineContext,
        input: &ArgumentsArtifact,
    ) -> PhaseResult<ConfigurationArtifact> {
        let configuration = match CompilerConfiguration::resolve(&input.arguments) {
            Ok(configuration) => configuration,
            Err(err) => {
                ctx.diagnostics()
                    .report(Diagnostic::error(Self::NAME, err.to_string()).named("INVALID_ARGUMENTS"));
                return Err(Interrupt::step_failed());
            }
        };

        let known = lowering_phase_names(configuration.target).map_err(Interrupt::fatal)?;
        let diagnostics = ctx.diagnostics();
        let phase_config = PhaseConfig::create(
            known.iter().map(String::as_str),
            &configuration.phases,
            &mut |message| {
                diagnostics.report(Diagnostic::error(Self::NAME, message).named("UNKNOWN_PHASE"));
            },
        );
        let phases = Arc::new(PhaseConfigurationService::new(phase_config));

        if configuration.list_phases {
            if ctx.diagnostics().has_errors() {
                return Err(Interrupt::step_failed());
            }
            let tree = lowering_tree::<PipelineContext>(configuration.target).map_err(Interrupt::fatal)?;
            let listing = PhaseEngine::new(Arc::clone(&phases)).list(&tree);
            ctx.messages()
                .report(Severity::Info, listing.trim_end(), None);
            return Err(Interrupt::Finished);
        }

        Ok(ConfigurationArtifact {
            configuration: Arc::new(configuration),
            phases,
        })
    }
}

#[cfg(test)]
mod tests {
    use kiln_config::{CompilerArguments, PhaseList, PhaseOptions};
    use kiln_core::{CancellationStatus, CollectingMessageCollector, Disposable, ExitCode};

    use super::*;
    use crate::{PipelineStep, StepStatus};

    fn run(arguments: CompilerArguments) -> (StepStatus<ConfigurationArtifact>, Arc<CollectingMessageCollector>, PipelineContext) {
        let sink = Arc::new(CollectingMessageCollector::new());
        let mut ctx = PipelineContext::new(sink.clone(), CancellationStatus::new(), Arc::new(Disposable::new("test")));
        let status = ConfigurationStep
            .execute(&mut ctx, &ArgumentsArtifact { arguments })
            .expect("not fatal");
        (status, sink, ctx)
    }

    #[test]
    fn test_resolves_phase_configuration() {
        let (status, _, _) = run(CompilerArguments {
            sources: vec!["a.json".into()],
            phases: PhaseOptions {
                disable: PhaseList::command_line(["Const-Folding"]),
                ..Default::default()
            },
            ..Default::default()
        });

        let StepStatus::Continue(artifact) = status else {
            panic!("configuration should succeed");
        };
        assert!(!artifact.phases.is_enabled("const-folding"));
        assert!(artifact.phases.is_enabled("generic-return-erasure"));
    }

    #[test]
    fn test_unknown_phase_is_a_compilation_error() {
        let (status, _, ctx) = run(CompilerArguments {
            phases: PhaseOptions {
                verbose: PhaseList::command_line(["inlining"]),
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(status.exit_code(), Some(ExitCode::CompilationError));
        let diagnostics = ctx.diagnostics().diagnostics();
        assert_eq!(diagnostics[0].internal_name.as_deref(), Some("UNKNOWN_PHASE"));
        assert!(diagnostics[0].message.contains("inlining"));
    }

    #[test]
    fn test_list_phases_stops_with_ok() {
        let (status, sink, _) = run(CompilerArguments {
            list_phases: true,
            phases: PhaseOptions {
                disable: PhaseList::manifest(["const-folding"]),
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(status.exit_code(), Some(ExitCode::Ok));
        let listing = &sink.messages_with(Severity::Info)[0].text;
        assert!(listing.starts_with("lowerings\n"));
        assert!(listing.contains("        const-folding (Disabled)"));
    }
}
