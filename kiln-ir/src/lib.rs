//! Program representations for the kiln compiler pipeline.
//!
//! This crate provides the two whole-program representations the pipeline
//! hands from step to step:
//!
//! - [`ResolvedProgram`] - the resolved, typed tree produced by the frontend
//! - [`IrModule`] - the intermediate representation the lowering phases rewrite
//!
//! # Architecture
//!
//! ```text
//! frontend → ResolvedProgram → translate → IrModule → lowerings → IrModule → backend
//! ```
//!
//! Both representations share the expression language in [`expr`] and
//! serialize to JSON, which is also the format of phase state dumps.

pub mod expr;
mod module;
mod name;
mod tree;
mod validate;

pub use expr::{BinaryOp, Constant, Expr, Stmt, TypeRef};
pub use module::{IrDeclaration, IrDeclarationKind, IrFile, IrFunction, IrModule, IrParam, IrProperty};
pub use name::FqName;
pub use tree::{ResolvedDeclaration, ResolvedFile, ResolvedKind, ResolvedParam, ResolvedProgram};
pub use validate::validate_module;
