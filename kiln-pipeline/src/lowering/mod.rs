//! Lowering passes and the phase trees that order them.
//!
//! ```text
//! lowerings                          (bytecode target)
//! ├── file-lowerings
//! │   └── expect-declarations-removal
//! └── body-lowerings
//!     ├── callable-reference-upgrade
//!     ├── const-folding
//!     └── generic-return-erasure
//!
//! pre-serialization-lowerings        (module target)
//! ├── expect-declarations-removal
//! └── callable-reference-upgrade
//! ```

mod callable_reference;
mod const_folding;
mod expect;
mod generic_return;

pub use callable_reference::CallableReferenceUpgrade;
pub use const_folding::ConstFolding;
pub use expect::ExpectDeclarationsRemoval;
pub use generic_return::GenericReturnErasure;
use kiln_config::Target;
use kiln_ir::IrModule;
use kiln_phaser::{PhaseContext, PhaseTree, PhaseTreeBuilder, PhaseTreeError};

use crate::PipelineContext;

pub const LOWERINGS: &str = "lowerings";
pub const FILE_LOWERINGS: &str = "file-lowerings";
pub const BODY_LOWERINGS: &str = "body-lowerings";
pub const PRE_SERIALIZATION_LOWERINGS: &str = "pre-serialization-lowerings";

/// The lowering tree run before emitting `target`.
pub fn lowering_tree<C: PhaseContext>(target: Target) -> Result<PhaseTree<C, IrModule>, PhaseTreeError> {
    match target {
        Target::Bytecode => backend_lowerings(),
        Target::Module => pre_serialization_lowerings(),
    }
}

/// Names of every phase in the lowering tree of `target`, root first.
pub fn lowering_phase_names(target: Target) -> Result<Vec<String>, PhaseTreeError> {
    let tree = lowering_tree::<PipelineContext>(target)?;
    Ok(tree.phase_names().into_iter().map(str::to_string).collect())
}

fn backend_lowerings<C: PhaseContext>() -> Result<PhaseTree<C, IrModule>, PhaseTreeError> {
    let mut builder = PhaseTreeBuilder::new();

    let expect = builder.leaf(ExpectDeclarationsRemoval);
    builder.sticky_postcondition(expect, ExpectDeclarationsRemoval::no_expect_declarations());
    let file_lowerings = builder.compound(FILE_LOWERINGS, [expect]);

    let references = builder.leaf(CallableReferenceUpgrade);
    builder.postcondition(references, CallableReferenceUpgrade::no_callable_references());
    let folding = builder.leaf(ConstFolding);
    let erasure = builder.leaf(GenericReturnErasure);
    builder.postcondition(erasure, GenericReturnErasure::no_generic_returns());
    let body_lowerings = builder.compound(BODY_LOWERINGS, [references, folding, erasure]);

    let root = builder.compound(LOWERINGS, [file_lowerings, body_lowerings]);
    builder.build(root)
}

fn pre_serialization_lowerings<C: PhaseContext>() -> Result<PhaseTree<C, IrModule>, PhaseTreeError> {
    let mut builder = PhaseTreeBuilder::new();

    let expect = builder.leaf(ExpectDeclarationsRemoval);
    builder.sticky_postcondition(expect, ExpectDeclarationsRemoval::no_expect_declarations());
    let references = builder.leaf(CallableReferenceUpgrade);
    builder.postcondition(references, CallableReferenceUpgrade::no_callable_references());

    let root = builder.compound(PRE_SERIALIZATION_LOWERINGS, [expect, references]);
    builder.build(root)
}
