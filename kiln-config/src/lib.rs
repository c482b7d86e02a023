//! Compiler arguments and configuration for kiln.
//!
//! A compilation is described by [`CompilerArguments`], read from a
//! `kiln.toml` project file and overridden by command-line flags. The
//! configuration step resolves them into an immutable
//! [`CompilerConfiguration`] that every later step reads.
//!
//! ```toml
//! sources = ["build/resolved/main.json"]
//! module-name = "app"
//! backend-threads = 4
//!
//! [phases]
//! disable = ["const-folding"]
//! dump-after = ["ALL"]
//! dump-directory = "build/dumps"
//! ```

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod arguments;
mod configuration;
mod error;

use std::{collections::HashMap, path::Path};

pub use arguments::{CompilerArguments, ListOrigin, ModuleArguments, PhaseList, PhaseOptions, Target};
pub use configuration::{
    CompilerConfiguration, DEFAULT_MODULE_NAME, DEFAULT_OUTPUT_DIR, ModuleChunk, ModuleSpec,
};
pub use error::{Error, Result, SourceContext};

/// Default project file name.
pub const PROJECT_FILE: &str = "kiln.toml";

/// Parse a kiln.toml file. Relative paths inside it are resolved against the
/// file's directory.
pub fn parse_file(path: impl AsRef<Path>) -> Result<CompilerArguments> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Box::new(Error::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })?;
    let filename = path.display().to_string();
    let arguments = parse_str_with_filename(&content, &filename)?;
    Ok(match path.parent() {
        Some(base) if !base.as_os_str().is_empty() => rebase(arguments, base),
        _ => arguments,
    })
}

/// Parse a kiln.toml from a string (uses "kiln.toml" as the filename)
pub fn parse_str(content: &str) -> Result<CompilerArguments> {
    parse_str_with_filename(content, PROJECT_FILE)
}

/// Parse a kiln.toml from a string with a custom filename for error reporting
pub fn parse_str_with_filename(content: &str, filename: &str) -> Result<CompilerArguments> {
    let ctx = SourceContext::new(content, filename);
    let arguments: CompilerArguments = toml::from_str(content).map_err(|e| ctx.parse_error(e))?;
    validate(&arguments, &ctx)?;
    Ok(arguments)
}

fn validate(arguments: &CompilerArguments, ctx: &SourceContext) -> Result<()> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, module) in arguments.modules.iter().enumerate() {
        if module.name.trim().is_empty() {
            return Err(ctx.validation_error("module name must not be empty", ctx.find_string_span("")));
        }
        if first_seen.insert(module.name.as_str(), index).is_some() {
            let spans = ctx.find_string_spans(&module.name);
            if let [first, second, ..] = spans.as_slice() {
                return Err(Box::new(Error::DuplicateModule {
                    src: ctx.named_source(),
                    first_span: *first,
                    second_span: *second,
                    name: module.name.clone(),
                }));
            }
            return Err(ctx.validation_error(format!("duplicate module '{}'", module.name), None));
        }
    }

    let phases = &arguments.phases;
    let lists = [
        &phases.disable,
        &phases.verbose,
        &phases.dump_before,
        &phases.dump_after,
        &phases.dump,
        &phases.validate_before,
        &phases.validate_after,
        &phases.validate,
    ];
    if lists.iter().flat_map(|list| &list.names).any(|name| name.trim().is_empty()) {
        return Err(ctx.validation_error("phase names must not be empty", ctx.find_string_span("")));
    }

    if arguments.backend_threads.is_some_and(|n| n > 1024) {
        return Err(ctx.validation_error(
            "backend-threads must be at most 1024 (use 0 for one thread per core)",
            None,
        ));
    }
    Ok(())
}

fn rebase(mut arguments: CompilerArguments, base: &Path) -> CompilerArguments {
    let join = |path: &mut std::path::PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };
    arguments.sources.iter_mut().for_each(join);
    for module in &mut arguments.modules {
        module.sources.iter_mut().for_each(join);
    }
    if let Some(dir) = arguments.output_dir.as_mut() {
        join(dir);
    }
    if let Some(dir) = arguments.phases.dump_directory.as_mut() {
        join(dir);
    }
    if let Some(file) = arguments.dump_perf.as_mut() {
        join(file);
    }
    arguments
}
