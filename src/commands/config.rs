//! Config command handler - Show or edit tf-index.toml

use crate::cli::{ConfigArgs, ConfigOperation};
use crate::commands::{render, CommandContext};
use crate::config::Settings;
use crate::error::{IndexError, Result};

/// Run the config command
pub fn run_config(args: &ConfigArgs, ctx: &CommandContext) -> Result<String> {
    match &args.operation {
        ConfigOperation::Show => render(ctx, &ctx.settings, |s| s.display().unwrap_or_default()),
        ConfigOperation::Get { key } => {
            let value = ctx.settings.get(key).ok_or_else(|| IndexError::Config {
                message: format!("Unknown configuration key: {}", key),
            })?;
            render(ctx, &serde_json::json!({ "key": key, "value": value }), |_| {
                format!("{}\n", value)
            })
        }
        ConfigOperation::Set { key, value } => {
            // Edit the file as written, without environment overrides
            let mut settings = Settings::load_from(&ctx.config_path)?;
            settings.set(key, value)?;
            settings.save_to(&ctx.config_path)?;
            Ok(format!("Set {} = {}\n", key, value))
        }
        ConfigOperation::Reset => {
            Settings::default().save_to(&ctx.config_path)?;
            Ok("Configuration reset to defaults\n".to_string())
        }
    }
}
