//! The resolved program tree produced by the frontend.
//!
//! Source files reach the pipeline already parsed and resolved, as JSON
//! documents. Names inside expressions are still as written: the translate
//! step qualifies them against the whole program.

use serde::{Deserialize, Serialize};

use crate::{Expr, FqName, Stmt, TypeRef};

/// A whole resolved program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProgram {
    /// Source files in input order.
    #[serde(default)]
    pub files: Vec<ResolvedFile>,
}

impl ResolvedProgram {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Every declaration with its fully-qualified name, in file order.
    pub fn declarations(&self) -> impl Iterator<Item = (FqName, &ResolvedFile, &ResolvedDeclaration)> {
        self.files.iter().flat_map(|file| {
            file.declarations
                .iter()
                .map(move |decl| (FqName::qualify(&file.package, &decl.name), file, decl))
        })
    }
}

/// One resolved source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    /// Path of the source file, as given on the command line.
    pub path: String,

    /// Package the file declares; empty for the root package.
    #[serde(default)]
    pub package: String,

    /// Top-level declarations.
    #[serde(default)]
    pub declarations: Vec<ResolvedDeclaration>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDeclaration {
    /// Simple name.
    pub name: String,

    /// Whether this is a platform `expect` declaration without a body.
    #[serde(default)]
    pub expect: bool,

    /// 1-based source line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(flatten)]
    pub kind: ResolvedKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedKind {
    Function {
        #[serde(default)]
        params: Vec<ResolvedParam>,
        return_type: TypeRef,
        #[serde(default)]
        body: Vec<Stmt>,
    },
    Property {
        #[serde(rename = "type")]
        ty: TypeRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initializer: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}
