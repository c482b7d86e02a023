use std::{collections::HashMap, sync::Arc};

use kiln_core::{Diagnostic, DiagnosticsCollector, SourceLocation};
use kiln_ir::{
    Expr, FqName, IrDeclaration, IrDeclarationKind, IrFile, IrFunction, IrModule, IrParam,
    IrProperty, ResolvedDeclaration, ResolvedFile, ResolvedKind, ResolvedProgram, TypeRef,
};
use kiln_phaser::{NamedPhase, PhaseContext, PhaseResult, PostAction, PreAction};

use crate::{
    CheckDiagnostics, Fir2IrArtifact, FinishMilestone, FrontendArtifact, Milestone,
    PipelineContext, StartMilestone,
};

/// Translates the resolved program into one IR module.
///
/// Names used in expressions are qualified against the whole program: a
/// simple name is looked up in the file's own package first, then in the
/// root package. References that resolve to nothing are reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateStep;

impl TranslateStep {
    pub const NAME: &'static str = "fir2ir";
}

/// What the translator knows about a declaration it can resolve to.
enum Symbol {
    Function { return_type: TypeRef },
    Property,
}

struct SymbolTable {
    symbols: HashMap<FqName, Symbol>,
}

impl SymbolTable {
    fn build(program: &ResolvedProgram, diagnostics: &DiagnosticsCollector) -> Self {
        let mut symbols = HashMap::new();
        let mut expected: HashMap<FqName, bool> = HashMap::new();
        for (fq_name, file, decl) in program.declarations() {
            let symbol = match &decl.kind {
                ResolvedKind::Function { return_type, .. } => Symbol::Function {
                    return_type: return_type.clone(),
                },
                ResolvedKind::Property { .. } => Symbol::Property,
            };
            // An expect declaration and its actual share a name; the actual wins.
            match expected.get(&fq_name).copied() {
                None => {}
                Some(previous_expect) if previous_expect != decl.expect => {
                    if previous_expect {
                        expected.insert(fq_name.clone(), false);
                        symbols.insert(fq_name, symbol);
                    }
                    continue;
                }
                Some(_) => {
                    diagnostics.report(
                        Diagnostic::error(
                            TranslateStep::NAME,
                            format!("conflicting declarations of `{}`", fq_name),
                        )
                        .at(location(file, decl))
                        .named("REDECLARATION"),
                    );
                    continue;
                }
            }
            expected.insert(fq_name.clone(), decl.expect);
            symbols.insert(fq_name, symbol);
        }
        Self { symbols }
    }

    fn resolve(&self, package: &str, name: &str) -> Option<(FqName, &Symbol)> {
        let candidates = [FqName::qualify(package, name), FqName::new(name)];
        candidates
            .into_iter()
            .find_map(|fq| self.symbols.get(&fq).map(|symbol| (fq, symbol)))
    }
}

fn location(file: &ResolvedFile, decl: &ResolvedDeclaration) -> SourceLocation {
    match decl.line {
        Some(line) => SourceLocation::at(&file.path, line, 1),
        None => SourceLocation::file(&file.path),
    }
}

impl NamedPhase<PipelineContext, FrontendArtifact, Fir2IrArtifact> for TranslateStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<FrontendArtifact, PipelineContext>>> {
        vec![Box::new(StartMilestone(Milestone::IrTranslation))]
    }

    fn post_actions(&self) -> Vec<Box<dyn PostAction<FrontendArtifact, Fir2IrArtifact, PipelineContext>>> {
        vec![
            Box::new(FinishMilestone(Milestone::IrTranslation)),
            Box::new(CheckDiagnostics),
        ]
    }

    fn phase_body(&self, ctx: &mut PipelineContext, input: &FrontendArtifact) -> PhaseResult<Fir2IrArtifact> {
        let diagnostics = ctx.diagnostics();
        let symbols = SymbolTable::build(&input.program, diagnostics);

        let mut module = IrModule::new(input.configuration.module_name.clone());
        for file in &input.program.files {
            ctx.cancellation().check_canceled()?;
            let declarations = file
                .declarations
                .iter()
                .map(|decl| translate_declaration(&symbols, file, decl, diagnostics))
                .collect();
            module.files.push(IrFile {
                path: file.path.clone(),
                package: file.package.clone(),
                declarations,
            });
        }
        tracing::debug!(
            module = %module.name,
            declarations = module.declaration_count(),
            "translated program"
        );

        Ok(Fir2IrArtifact::new(
            Arc::clone(&input.configuration),
            Arc::clone(&input.phases),
            module,
        ))
    }
}

fn translate_declaration(
    symbols: &SymbolTable,
    file: &ResolvedFile,
    decl: &ResolvedDeclaration,
    diagnostics: &DiagnosticsCollector,
) -> IrDeclaration {
    let mut unresolved = Vec::new();
    let mut resolve = |expr: Expr| resolve_expr(symbols, &file.package, expr, &mut unresolved);

    let kind = match &decl.kind {
        ResolvedKind::Function {
            params,
            return_type,
            body,
        } => IrDeclarationKind::Function(IrFunction {
            params: params
                .iter()
                .map(|p| IrParam {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                })
                .collect(),
            return_type: return_type.clone(),
            body: body
                .iter()
                .cloned()
                .map(|mut stmt| {
                    stmt.rewrite_expr(&mut resolve);
                    stmt
                })
                .collect(),
        }),
        ResolvedKind::Property { ty, initializer } => IrDeclarationKind::Property(IrProperty {
            ty: ty.clone(),
            initializer: initializer.clone().map(|init| init.rewrite(&mut resolve)),
        }),
    };

    for name in unresolved {
        diagnostics.report(
            Diagnostic::error(TranslateStep::NAME, format!("unresolved reference: {}", name))
                .at(location(file, decl))
                .named("UNRESOLVED_REFERENCE"),
        );
    }

    IrDeclaration {
        fq_name: FqName::qualify(&file.package, &decl.name),
        expect: decl.expect,
        line: decl.line,
        kind,
    }
}

fn resolve_expr(symbols: &SymbolTable, package: &str, expr: Expr, unresolved: &mut Vec<String>) -> Expr {
    match expr {
        Expr::Call {
            callee,
            args,
            generic_return,
            ty,
        } => match symbols.resolve(package, &callee) {
            Some((fq, symbol)) => {
                let generic_return = match symbol {
                    Symbol::Function { return_type } if return_type.is_type_parameter() => {
                        generic_return.or_else(|| Some(return_type.clone()))
                    }
                    _ => generic_return,
                };
                Expr::Call {
                    callee: fq.to_string(),
                    args,
                    generic_return,
                    ty,
                }
            }
            None => {
                unresolved.push(callee.clone());
                Expr::Call {
                    callee,
                    args,
                    generic_return,
                    ty,
                }
            }
        },
        Expr::CallableReference { target } => match symbols.resolve(package, &target) {
            Some((fq, _)) => Expr::CallableReference { target: fq.to_string() },
            None => {
                unresolved.push(target.clone());
                Expr::CallableReference { target }
            }
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use kiln_config::{CompilerArguments, CompilerConfiguration};
    use kiln_core::{CancellationStatus, CollectingMessageCollector, Disposable, ExitCode};
    use kiln_ir::Stmt;
    use kiln_phaser::PhaseConfigurationService;

    use super::*;
    use crate::{PipelineStep, StepStatus};

    fn context() -> PipelineContext {
        PipelineContext::new(
            Arc::new(CollectingMessageCollector::new()),
            CancellationStatus::new(),
            Arc::new(Disposable::new("test")),
        )
    }

    fn frontend(json: &str) -> FrontendArtifact {
        FrontendArtifact {
            configuration: Arc::new(
                CompilerConfiguration::resolve(&CompilerArguments::default()).expect("valid arguments"),
            ),
            phases: Arc::new(PhaseConfigurationService::default()),
            program: serde_json::from_str(json).expect("valid program"),
        }
    }

    #[test]
    fn test_qualifies_names() {
        let input = frontend(
            r#"{"files": [
                {"path": "lib.kn", "declarations": [
                    {"name": "first", "kind": "function", "return_type": "T",
                     "params": [{"name": "xs", "type": "List<T>"}]}
                ]},
                {"path": "app.kn", "package": "app", "declarations": [
                    {"name": "seed", "kind": "property", "type": "Int",
                     "initializer": {"expr": "const", "value": 1}},
                    {"name": "main", "kind": "function", "return_type": "Int", "body": [
                        {"stmt": "eval", "value": {"expr": "callable_reference", "target": "main"}},
                        {"stmt": "return", "value": {"expr": "call", "callee": "first",
                            "args": [{"expr": "call", "callee": "seed"}], "ty": "Int"}}
                    ]}
                ]}
            ]}"#,
        );
        let mut ctx = context();

        let StepStatus::Continue(artifact) = TranslateStep.execute(&mut ctx, &input).expect("not fatal") else {
            panic!("translation should succeed");
        };

        let module = artifact.take_module().expect("module present");
        let main = module.function("app.main").expect("main translated");
        assert_eq!(
            main.body[0],
            Stmt::Eval {
                value: Expr::CallableReference {
                    target: "app.main".into()
                }
            }
        );
        assert_eq!(
            main.body[1],
            Stmt::Return {
                value: Expr::Call {
                    callee: "first".into(),
                    args: vec![Expr::call("app.seed", vec![])],
                    generic_return: Some(TypeRef::new("T")),
                    ty: Some(TypeRef::new("Int")),
                }
            }
        );
        assert_eq!(module.name, "main");
        assert!(ctx.performance.milestone(Milestone::IrTranslation).is_some());
    }

    #[test]
    fn test_unresolved_reference() {
        let input = frontend(
            r#"{"files": [{"path": "app.kn", "package": "app", "declarations": [
                {"name": "main", "kind": "function", "return_type": "Int", "line": 4, "body": [
                    {"stmt": "return", "value": {"expr": "call", "callee": "missing"}}
                ]}
            ]}]}"#,
        );
        let mut ctx = context();

        let status = TranslateStep.execute(&mut ctx, &input).expect("not fatal");

        assert_eq!(status.exit_code(), Some(ExitCode::CompilationError));
        let diagnostics = ctx.diagnostics().diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].render_message(true), "[UNRESOLVED_REFERENCE] unresolved reference: missing");
        assert_eq!(diagnostics[0].location, Some(SourceLocation::at("app.kn", 4, 1)));
    }

    #[test]
    fn test_redeclaration() {
        let input = frontend(
            r#"{"files": [{"path": "app.kn", "package": "app", "declarations": [
                {"name": "x", "kind": "property", "type": "Int"},
                {"name": "x", "kind": "property", "type": "Int"}
            ]}]}"#,
        );
        let mut ctx = context();

        let status = TranslateStep.execute(&mut ctx, &input).expect("not fatal");

        assert_eq!(status.exit_code(), Some(ExitCode::CompilationError));
        assert_eq!(
            ctx.diagnostics().diagnostics()[0].internal_name.as_deref(),
            Some("REDECLARATION")
        );
    }

    #[test]
    fn test_expect_and_actual_share_a_name() {
        let input = frontend(
            r#"{"files": [
                {"path": "common.kn", "package": "app", "declarations": [
                    {"name": "platform", "kind": "function", "return_type": "String", "expect": true}
                ]},
                {"path": "jvm.kn", "package": "app", "declarations": [
                    {"name": "platform", "kind": "function", "return_type": "String"}
                ]}
            ]}"#,
        );
        let mut ctx = context();

        let status = TranslateStep.execute(&mut ctx, &input).expect("not fatal");

        assert!(status.is_continue());
        assert!(ctx.diagnostics().is_empty());
    }
}
