//! Resolve command handler - Look up one entity's sequential id

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::cache::IndexCache;
use crate::cli::ResolveArgs;
use crate::commands::{render, CommandContext};
use crate::error::{IndexError, Result};
use crate::kind::normalize_kind;
use crate::persist::IndexFile;

/// Successful lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub kind: String,
    pub external_id: Uuid,
    pub id: u64,
    pub version: u64,
}

/// Run the resolve command
pub fn run_resolve(args: &ResolveArgs, ctx: &CommandContext) -> Result<String> {
    if normalize_kind(&args.kind).is_empty() {
        return Err(IndexError::invalid_argument("kind required"));
    }
    let external_id = parse_external_id(&args.external_id)?;

    let cache = match &args.from_file {
        Some(path) => {
            let path = if path.as_os_str().is_empty() {
                ctx.settings.index.path.clone()
            } else {
                path.clone()
            };
            file_cache(path, ctx)?
        }
        None => {
            let cache = IndexCache::new(Arc::new(ctx.open_builder(args.db.as_deref())?));
            cache.refresh(&ctx.cancel)?;
            cache
        }
    };

    let (found, version) = cache.lookup(&args.kind, external_id)?;
    let id = found.ok_or_else(|| IndexError::NotFound {
        kind: args.kind.trim().to_string(),
        external_id,
    })?;
    let report = ResolveReport {
        kind: args.kind.trim().to_string(),
        external_id,
        id,
        version,
    };
    render(ctx, &report, |r| format!("{}\n", r.id))
}

fn file_cache(path: PathBuf, ctx: &CommandContext) -> Result<IndexCache> {
    let cache = IndexCache::new(Arc::new(IndexFile::new(&path)));
    cache.refresh_from_file(&path, &ctx.cancel)?;
    Ok(cache)
}

pub(crate) fn parse_external_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|e| {
        IndexError::invalid_argument(format!("invalid external id '{}': {}", raw.trim(), e))
    })
}
