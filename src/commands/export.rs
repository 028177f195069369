//! Export command handler - Build the index and persist it

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::builder::IndexBuilder;
use crate::cli::ExportArgs;
use crate::commands::{render, CommandContext};
use crate::error::Result;
use crate::persist::IndexFile;

/// Outcome of writing an index file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub file: PathBuf,
    pub count: usize,
}

/// Run the export command
pub fn run_export(args: &ExportArgs, ctx: &CommandContext) -> Result<String> {
    let builder = ctx.open_builder(args.db.as_deref())?;
    let target = args
        .output
        .as_deref()
        .unwrap_or(&ctx.settings.index.path);

    let report = export_index(&builder, target, &ctx.cancel)?;
    render(ctx, &report, |r| {
        format!("Wrote {} index items to {}\n", r.count, r.file.display())
    })
}

/// Build a fresh document and write it to `target`
pub fn export_index(
    builder: &IndexBuilder,
    target: &Path,
    cancel: &CancellationToken,
) -> Result<ExportReport> {
    let doc = builder.build(cancel)?;
    let file = IndexFile::new(target);
    file.write(&doc)?;
    Ok(ExportReport {
        file: file.path().to_path_buf(),
        count: doc.len(),
    })
}
