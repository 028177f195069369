//! Build command handler - Build the index and print the document

use crate::cli::{BuildArgs, DocumentFormat, OutputFormat};
use crate::commands::CommandContext;
use crate::error::{IndexError, Result};
use crate::persist;
use crate::schema::IndexDocument;

/// Run the build command
pub fn run_build(args: &BuildArgs, ctx: &CommandContext) -> Result<String> {
    let builder = ctx.open_builder(args.db.as_deref())?;
    let doc = builder.build(&ctx.cancel)?;

    if ctx.verbose {
        for (kind, count) in doc.count_by_kind() {
            eprintln!("{}: {}", kind, count);
        }
    }

    let format = match ctx.format {
        OutputFormat::Json => DocumentFormat::Json,
        OutputFormat::Text => args.output,
    };
    render_document(&doc, format)
}

pub(crate) fn render_document(doc: &IndexDocument, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Yaml => persist::to_yaml(doc),
        DocumentFormat::Json => serde_json::to_string_pretty(doc)
            .map(|json| format!("{}\n", json))
            .map_err(|e| IndexError::malformed(format!("JSON serialization failed: {}", e))),
    }
}
