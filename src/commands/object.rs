//! Single-shot commands: render, get, apply, delete, describe

use super::{CommandContext, DefinitionSource};
use crate::k8s::kubectl::FailurePolicy;
use crate::k8s::object::KubeObject;
use crate::utils::prompt;
use anyhow::{Context, Result};

/// Print the rendered template, or the parsed definition as JSON
pub fn render(source: &DefinitionSource, json: bool) -> Result<()> {
    if json {
        let definition = source.load()?;
        println!("{}", serde_json::to_string_pretty(&definition)?);
    } else {
        print!("{}", source.render()?);
    }
    Ok(())
}

/// Print the live object as JSON
pub fn get(ctx: &CommandContext, source: &DefinitionSource) -> Result<()> {
    let object = KubeObject::new(source.load()?, &ctx.kubectl)?;
    let live = object
        .get()
        .with_context(|| format!("Failed to get {}", object))?;
    println!("{}", serde_json::to_string_pretty(&live)?);
    Ok(())
}

pub fn apply(ctx: &CommandContext, source: &DefinitionSource, policy: FailurePolicy) -> Result<()> {
    let object = KubeObject::new(source.load()?, &ctx.kubectl)?;
    object
        .apply(policy)
        .with_context(|| format!("Failed to apply {}", object))?;
    crate::log_info!("{} applied", object);
    Ok(())
}

pub fn delete(
    ctx: &CommandContext,
    source: &DefinitionSource,
    yes: bool,
    policy: FailurePolicy,
) -> Result<()> {
    let object = KubeObject::new(source.load()?, &ctx.kubectl)?;

    let skip_prompt = yes || !ctx.settings.behavior.confirm_destructive;
    if !prompt::confirm_unless(skip_prompt, &format!("Delete {}?", object))? {
        crate::log_warn!("Aborted, {} left in place", object);
        return Ok(());
    }

    object
        .delete(policy)
        .with_context(|| format!("Failed to delete {}", object))?;
    crate::log_info!("{} deleted", object);
    Ok(())
}

pub fn describe(ctx: &CommandContext, source: &DefinitionSource) -> Result<()> {
    let object = KubeObject::new(source.load()?, &ctx.kubectl)?;
    if let Some(text) = object
        .describe(FailurePolicy::Propagate)
        .with_context(|| format!("Failed to describe {}", object))?
    {
        print!("{}", text);
    }
    Ok(())
}
