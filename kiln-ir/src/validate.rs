//! Structural checks over an [`IrModule`].
//!
//! Phases run these before and after their body when IR validation is
//! requested for them. A non-empty result means some phase left the module
//! in a shape later phases cannot rely on.

use std::collections::{HashMap, HashSet};

use crate::{Expr, IrDeclarationKind, IrModule, Stmt};

/// Check the module's structural invariants, returning one message per
/// violation.
pub fn validate_module(module: &IrModule) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let arities: HashMap<&str, usize> = module
        .declarations()
        .filter_map(|decl| match &decl.kind {
            IrDeclarationKind::Function(function) => Some((decl.fq_name.as_str(), function.params.len())),
            IrDeclarationKind::Property(_) => None,
        })
        .collect();

    for decl in module.declarations() {
        let name = decl.fq_name.as_str();
        if name.is_empty() || name.split('.').any(str::is_empty) {
            problems.push(format!("declaration has a malformed name `{}`", name));
        }
        if !seen.insert(name) {
            problems.push(format!("duplicate declaration `{}`", name));
        }

        match &decl.kind {
            IrDeclarationKind::Function(function) => {
                if decl.expect && !function.body.is_empty() {
                    problems.push(format!("expect declaration `{}` has a body", name));
                }
                let mut bound: HashSet<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
                for stmt in &function.body {
                    check_expr(name, stmt.expr(), &bound, &arities, &mut problems);
                    if let Stmt::Let { name: local, .. } = stmt {
                        bound.insert(local);
                    }
                }
            }
            IrDeclarationKind::Property(property) => {
                if let Some(init) = &property.initializer {
                    check_expr(name, init, &HashSet::new(), &arities, &mut problems);
                }
            }
        }
    }

    problems
}

fn check_expr(
    owner: &str,
    expr: &Expr,
    bound: &HashSet<&str>,
    arities: &HashMap<&str, usize>,
    problems: &mut Vec<String>,
) {
    expr.walk(&mut |e| match e {
        Expr::Local { name } if !bound.contains(name.as_str()) => {
            problems.push(format!("`{}` reads unbound local `{}`", owner, name));
        }
        Expr::FunctionReference { target, arity } => {
            if let Some(expected) = arities.get(target.as_str())
                && expected != arity
            {
                problems.push(format!(
                    "`{}` references `{}` with arity {} but it takes {}",
                    owner, target, arity, expected
                ));
            }
        }
        _ => {}
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FqName, IrDeclaration, IrFile, IrFunction, IrParam, TypeRef};

    fn module(declarations: Vec<IrDeclaration>) -> IrModule {
        IrModule {
            name: "main".into(),
            files: vec![IrFile {
                path: "main.kn".into(),
                package: "app".into(),
                declarations,
            }],
        }
    }

    fn function(fq: &str, params: &[&str], body: Vec<Stmt>) -> IrDeclaration {
        IrDeclaration {
            fq_name: FqName::new(fq),
            expect: false,
            line: None,
            kind: IrDeclarationKind::Function(IrFunction {
                params: params
                    .iter()
                    .map(|p| IrParam {
                        name: p.to_string(),
                        ty: TypeRef::new("Int"),
                    })
                    .collect(),
                return_type: TypeRef::new("Int"),
                body,
            }),
        }
    }

    #[test]
    fn test_valid_module() {
        let m = module(vec![function(
            "app.f",
            &["x"],
            vec![
                Stmt::Let {
                    name: "y".into(),
                    value: Expr::local("x"),
                },
                Stmt::Return {
                    value: Expr::local("y"),
                },
            ],
        )]);
        assert!(validate_module(&m).is_empty());
    }

    #[test]
    fn test_reports_duplicates_and_unbound_locals() {
        let m = module(vec![
            function("app.f", &[], vec![Stmt::Return { value: Expr::local("z") }]),
            function("app.f", &[], Vec::new()),
        ]);
        let problems = validate_module(&m);
        assert_eq!(
            problems,
            vec![
                "`app.f` reads unbound local `z`".to_string(),
                "duplicate declaration `app.f`".to_string(),
            ]
        );
    }

    #[test]
    fn test_reports_arity_mismatch() {
        let m = module(vec![
            function("app.f", &["a", "b"], Vec::new()),
            function(
                "app.g",
                &[],
                vec![Stmt::Eval {
                    value: Expr::FunctionReference {
                        target: "app.f".into(),
                        arity: 1,
                    },
                }],
            ),
        ]);
        assert_eq!(validate_module(&m).len(), 1);
    }
}
