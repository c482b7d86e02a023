//! The phase engine: sequences phases and fires the instrumentation around
//! them.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use kiln_core::Diagnostic;

use crate::{
    ActionState, BeforeOrAfter, Condition, Interrupt, NamedPhase, PhaseConfigurationService,
    PhaseContext, PhaseId, PhaseKind, PhaseResult, PhaseState, PhaseTree, PhaserState, StateDumper,
};

/// Executes phases against one [`PhaseConfigurationService`].
///
/// The engine decides whether a phase runs and whether dumps, validation,
/// conditions and profiling fire around it. What a phase does is up to the
/// phase. Interrupts raised by a phase or an action are never caught here.
#[derive(Debug)]
pub struct PhaseEngine {
    service: Arc<PhaseConfigurationService>,
    state: PhaserState,
    dumper: StateDumper,
}

impl PhaseEngine {
    pub fn new(service: Arc<PhaseConfigurationService>) -> Self {
        let dumper = StateDumper::new(
            service.dump_directory().map(Path::to_path_buf),
            service.dump_only_fq_name().map(str::to_string),
        );
        Self {
            service,
            state: PhaserState::new(),
            dumper,
        }
    }

    /// Write this engine's dumps under a subdirectory of the configured dump
    /// directory. Engines running side by side use this to keep their
    /// sequence-numbered files apart.
    pub fn with_dump_subdirectory(mut self, subdirectory: &str) -> Self {
        self.dumper = self.dumper.nested(subdirectory);
        self
    }

    pub fn service(&self) -> &PhaseConfigurationService {
        &self.service
    }

    pub fn state(&self) -> &PhaserState {
        &self.state
    }

    /// Check conditions for every phase from now on, whatever the
    /// configuration says.
    pub fn engage_sticky_conditions(&mut self) {
        self.state.engage_sticky();
    }

    /// Run a lowering tree over `input`, returning the final state.
    ///
    /// Disabled phases keep their slot in the sequence but leave the state
    /// untouched; a disabled compound skips its whole subtree.
    pub fn run_phases<C, S>(&mut self, tree: &PhaseTree<C, S>, ctx: &mut C, mut input: S) -> PhaseResult<S>
    where
        C: PhaseContext,
        S: PhaseState,
    {
        let mut sticky = Vec::new();
        self.run_node(tree, tree.root(), ctx, &mut input, &mut sticky)?;
        Ok(input)
    }

    fn run_node<C, S>(
        &mut self,
        tree: &PhaseTree<C, S>,
        id: PhaseId,
        ctx: &mut C,
        state: &mut S,
        sticky: &mut Vec<Condition<S>>,
    ) -> PhaseResult<()>
    where
        C: PhaseContext,
        S: PhaseState,
    {
        ctx.cancellation().check_canceled()?;

        let node = tree.node(id);
        let name = node.name();
        if !self.service.is_enabled(name) {
            tracing::debug!(phase = name, "phase disabled, state passes through");
            return Ok(());
        }

        let _span = tracing::debug_span!("phase", phase = name).entered();
        let previous_verbose = ctx.in_verbose_phase();
        ctx.set_in_verbose_phase(self.service.is_verbose(name));
        let result = self.run_enabled_node(tree, id, ctx, state, sticky);
        ctx.set_in_verbose_phase(previous_verbose);
        result?;

        self.state.already_done.push(name.to_string());
        Ok(())
    }

    fn run_enabled_node<C, S>(
        &mut self,
        tree: &PhaseTree<C, S>,
        id: PhaseId,
        ctx: &mut C,
        state: &mut S,
        sticky: &mut Vec<Condition<S>>,
    ) -> PhaseResult<()>
    where
        C: PhaseContext,
        S: PhaseState,
    {
        let node = tree.node(id);
        let name = node.name();
        let action_state = self.enter(name);
        let check_conditions = action_state.check_conditions;

        for action in node.pre_actions() {
            action.invoke(&action_state, state, ctx)?;
        }

        if check_conditions {
            for condition in sticky.iter() {
                check_condition(ctx, name, "sticky postcondition", condition, state)?;
            }
            for condition in &node.conditions().pre {
                check_condition(ctx, name, "precondition", condition, state)?;
            }
        }

        self.before_body(ctx, name, action_state.sequence, state)?;

        let started = Instant::now();
        match node.kind() {
            PhaseKind::Leaf(phase) => phase.lower(ctx, state)?,
            PhaseKind::Compound(children) => {
                self.state.depth += 1;
                let mut result = Ok(());
                for child in children {
                    result = self.run_node(tree, *child, ctx, state, sticky);
                    if result.is_err() {
                        break;
                    }
                }
                self.state.depth -= 1;
                result?;
            }
        }
        self.profile(ctx, name, started.elapsed());

        if self.service.should_validate_after(name) {
            self.validate(ctx, name, BeforeOrAfter::After, state)?;
        }

        if check_conditions {
            for condition in &node.conditions().post {
                check_condition(ctx, name, "postcondition", condition, state)?;
            }
        }
        let sticky_post = &node.conditions().sticky_post;
        if self.service.check_sticky_conditions() && !sticky_post.is_empty() {
            if check_conditions {
                for condition in sticky_post {
                    check_condition(ctx, name, "sticky postcondition", condition, state)?;
                }
            }
            sticky.extend(sticky_post.iter().cloned());
            self.state.engage_sticky();
        }

        for action in node.post_actions() {
            action.invoke(&action_state, state, state, ctx)?;
        }

        if self.service.should_dump_after(name) {
            self.dumper
                .dump(ctx, name, action_state.sequence, BeforeOrAfter::After, state)?;
        }

        Ok(())
    }

    /// Run a single typed phase.
    ///
    /// A disabled phase yields [`NamedPhase::output_if_not_enabled`].
    pub fn run_phase<C, I, O, P>(&mut self, phase: &P, ctx: &mut C, input: &I) -> PhaseResult<O>
    where
        C: PhaseContext,
        I: PhaseState,
        O: PhaseState,
        P: NamedPhase<C, I, O> + ?Sized,
    {
        ctx.cancellation().check_canceled()?;

        let name = phase.name();
        if !self.service.is_enabled(name) {
            tracing::debug!(phase = name, "phase disabled");
            return phase.output_if_not_enabled(ctx, input);
        }

        let _span = tracing::debug_span!("phase", phase = name).entered();
        let previous_verbose = ctx.in_verbose_phase();
        ctx.set_in_verbose_phase(self.service.is_verbose(name));
        let result = self.run_enabled_phase(phase, ctx, input);
        ctx.set_in_verbose_phase(previous_verbose);
        let output = result?;

        self.state.already_done.push(name.to_string());
        Ok(output)
    }

    fn run_enabled_phase<C, I, O, P>(&mut self, phase: &P, ctx: &mut C, input: &I) -> PhaseResult<O>
    where
        C: PhaseContext,
        I: PhaseState,
        O: PhaseState,
        P: NamedPhase<C, I, O> + ?Sized,
    {
        let name = phase.name();
        let action_state = self.enter(name);

        for action in phase.pre_actions() {
            action.invoke(&action_state, input, ctx)?;
        }

        self.before_body(ctx, name, action_state.sequence, input)?;

        let started = Instant::now();
        let output = phase.phase_body(ctx, input)?;
        self.profile(ctx, name, started.elapsed());

        if self.service.should_validate_after(name) {
            self.validate(ctx, name, BeforeOrAfter::After, &output)?;
        }

        for action in phase.post_actions() {
            action.invoke(&action_state, input, &output, ctx)?;
        }

        if self.service.should_dump_after(name) {
            self.dumper
                .dump(ctx, name, action_state.sequence, BeforeOrAfter::After, &output)?;
        }

        Ok(output)
    }

    /// The phase tree, one phase per line, indented four spaces per level and
    /// annotated with `(Disabled)` and `(Verbose)`.
    pub fn list<C, S>(&self, tree: &PhaseTree<C, S>) -> String {
        let mut out = String::new();
        for (depth, id) in tree.named_subphases() {
            let name = tree.node(id).name();
            out.push_str(&"    ".repeat(depth));
            out.push_str(name);
            if !self.service.is_enabled(name) {
                out.push_str(" (Disabled)");
            }
            if self.service.is_verbose(name) {
                out.push_str(" (Verbose)");
            }
            out.push('\n');
        }
        out
    }

    fn enter(&mut self, name: &str) -> ActionState {
        self.state.phase_count += 1;
        tracing::debug!(phase = name, sequence = self.state.phase_count, "entering phase");
        ActionState {
            phase: name.to_string(),
            depth: self.state.depth,
            sequence: self.state.phase_count,
            check_conditions: self.state.check_conditions(self.service.check_conditions()),
        }
    }

    fn before_body<C, S>(&self, ctx: &mut C, name: &str, sequence: usize, state: &S) -> PhaseResult<()>
    where
        C: PhaseContext,
        S: PhaseState + ?Sized,
    {
        if self.service.should_dump_before(name) {
            self.dumper.dump(ctx, name, sequence, BeforeOrAfter::Before, state)?;
        }
        if self.service.should_validate_before(name) {
            self.validate(ctx, name, BeforeOrAfter::Before, state)?;
        }
        Ok(())
    }

    fn profile<C: PhaseContext>(&self, ctx: &mut C, name: &str, elapsed: Duration) {
        if self.service.needs_profiling() {
            tracing::info!(phase = name, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "phase timing");
            ctx.record_phase_time(name, elapsed);
        }
    }

    /// Report structural problems as diagnostics. Once sticky checking is
    /// engaged a problem also aborts the step.
    fn validate<C, S>(&self, ctx: &C, name: &str, when: BeforeOrAfter, state: &S) -> PhaseResult<()>
    where
        C: PhaseContext,
        S: PhaseState + ?Sized,
    {
        let problems = state.validate_state();
        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            tracing::warn!(phase = name, %when, problem = problem.as_str(), "validation failed");
            ctx.diagnostics().report(
                Diagnostic::error(name, format!("validation {} '{}' failed: {}", when, name, problem))
                    .named("IR_VALIDATION_FAILED"),
            );
        }
        if self.state.sticky_engaged {
            return Err(Interrupt::compiler_error());
        }
        Ok(())
    }
}

fn check_condition<C, S>(ctx: &C, phase: &str, kind: &str, condition: &Condition<S>, state: &S) -> PhaseResult<()>
where
    C: PhaseContext,
{
    let Err(message) = condition.check(state) else {
        return Ok(());
    };
    let text = format!("{} '{}' of phase '{}' failed: {}", kind, condition.name(), phase, message);
    ctx.diagnostics()
        .report(Diagnostic::error(phase, text).named("PHASE_CONDITION_FAILED"));
    Err(Interrupt::compiler_error())
}
