//! The intermediate representation rewritten by lowering phases.

use serde::{Deserialize, Serialize};

use crate::{Expr, FqName, Stmt, TypeRef};

/// A compilation unit of the IR: a named set of files.
///
/// The whole program is translated into one module; the backend may split it
/// into per-module copies when a module chunk names several modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrModule {
    /// Module name, used for output artifacts.
    pub name: String,

    /// Files in translation order.
    #[serde(default)]
    pub files: Vec<IrFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrFile {
    /// Path of the source file this was translated from.
    pub path: String,

    #[serde(default)]
    pub package: String,

    #[serde(default)]
    pub declarations: Vec<IrDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrDeclaration {
    pub fq_name: FqName,

    /// Platform `expect` declarations are removed before code generation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expect: bool,

    /// 1-based source line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(flatten)]
    pub kind: IrDeclarationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IrDeclarationKind {
    Function(IrFunction),
    Property(IrProperty),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrFunction {
    #[serde(default)]
    pub params: Vec<IrParam>,
    pub return_type: TypeRef,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrProperty {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Expr>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// All declarations across files, in order.
    pub fn declarations(&self) -> impl Iterator<Item = &IrDeclaration> {
        self.files.iter().flat_map(|file| file.declarations.iter())
    }

    pub fn declaration(&self, fq_name: &str) -> Option<&IrDeclaration> {
        self.declarations().find(|decl| decl.fq_name.as_str() == fq_name)
    }

    /// Look up a function declaration by name.
    pub fn function(&self, fq_name: &str) -> Option<&IrFunction> {
        match &self.declaration(fq_name)?.kind {
            IrDeclarationKind::Function(function) => Some(function),
            IrDeclarationKind::Property(_) => None,
        }
    }

    pub fn declaration_count(&self) -> usize {
        self.files.iter().map(|file| file.declarations.len()).sum()
    }

    /// Apply `f` to every expression in the module, bottom-up.
    pub fn rewrite_exprs(&mut self, mut f: impl FnMut(Expr) -> Expr) {
        for decl in self.files.iter_mut().flat_map(|file| file.declarations.iter_mut()) {
            match &mut decl.kind {
                IrDeclarationKind::Function(function) => {
                    for stmt in &mut function.body {
                        stmt.rewrite_expr(&mut f);
                    }
                }
                IrDeclarationKind::Property(property) => {
                    if let Some(init) = property.initializer.take() {
                        property.initializer = Some(init.rewrite(&mut f));
                    }
                }
            }
        }
    }

    /// A copy holding only the files whose path satisfies `keep`, renamed to `name`.
    pub fn copy_with_files(&self, name: impl Into<String>, keep: impl Fn(&str) -> bool) -> IrModule {
        IrModule {
            name: name.into(),
            files: self
                .files
                .iter()
                .filter(|file| keep(&file.path))
                .cloned()
                .collect(),
        }
    }

    /// A copy restricted to declarations matching the qualified-name filter.
    /// Files left without declarations are dropped.
    pub fn filtered(&self, fq_filter: &str) -> IrModule {
        let files = self
            .files
            .iter()
            .filter_map(|file| {
                let declarations: Vec<_> = file
                    .declarations
                    .iter()
                    .filter(|decl| decl.fq_name.matches_filter(fq_filter))
                    .cloned()
                    .collect();
                (!declarations.is_empty()).then(|| IrFile {
                    path: file.path.clone(),
                    package: file.package.clone(),
                    declarations,
                })
            })
            .collect();
        IrModule {
            name: self.name.clone(),
            files,
        }
    }

    /// Render the module as pretty JSON, optionally restricted to a
    /// qualified-name filter.
    pub fn dump(&self, fq_filter: Option<&str>) -> serde_json::Result<String> {
        match fq_filter {
            Some(filter) => serde_json::to_string_pretty(&self.filtered(filter)),
            None => serde_json::to_string_pretty(self),
        }
    }
}
