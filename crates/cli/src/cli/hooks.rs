use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use remove_print_core::hooks::parse_hooks;
use remove_print_core::paths::Paths;
use remove_print_core::{FileHookStore, HookManager, HookSpec, HookStore};

#[derive(Args)]
pub struct SaveArgs {
    /// Hook document (`{"hooks": [...]}`) to install as the user override
    pub file: PathBuf,
}

#[derive(Args)]
pub struct AddArgs {
    /// Node class name, e.g. DPRandomGenerator
    pub node: String,

    /// Method to silence, e.g. get_prompt
    pub method: String,

    /// Store the hook but keep it switched off
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Node class name whose hook should be dropped
    pub node: String,
}

/// The CLI never receives a plugin mapping, so the manager stays detached:
/// saves persist and report an empty `hooked` list.
fn manager(paths: &Paths) -> HookManager {
    HookManager::new(Arc::new(FileHookStore::new(paths)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct HookList<'a> {
    hooks: &'a [HookSpec],
}

pub fn defaults(paths: &Paths) -> Result<()> {
    let hooks = FileHookStore::new(paths).load_default_hooks();
    print_json(&HookList { hooks: &hooks })
}

pub fn active(paths: &Paths) -> Result<()> {
    let hooks = FileHookStore::new(paths).load_active_hooks();
    print_json(&HookList { hooks: &hooks })
}

pub fn save(paths: &Paths, args: SaveArgs) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let hooks = parse_hooks(&content)
        .with_context(|| format!("Invalid hook document {}", args.file.display()))?;

    let response = manager(paths).save_hooks(hooks)?;
    print_json(&response)
}

pub fn add(paths: &Paths, args: AddArgs) -> Result<()> {
    let spec = HookSpec {
        class_name: args.node,
        method_name: args.method,
        enabled: !args.disabled,
    };
    let hooks = with_hook(FileHookStore::new(paths).load_active_hooks(), spec);

    let response = manager(paths).save_hooks(hooks)?;
    print_json(&response)
}

pub fn remove(paths: &Paths, args: RemoveArgs) -> Result<()> {
    let hooks = FileHookStore::new(paths).load_active_hooks();
    let before = hooks.len();
    let hooks = without_node(hooks, &args.node);

    if hooks.len() == before {
        anyhow::bail!("No hook configured for node '{}'", args.node);
    }

    let response = manager(paths).save_hooks(hooks)?;
    print_json(&response)
}

pub fn reset(paths: &Paths) -> Result<()> {
    let response = manager(paths).delete_user_override()?;
    print_json(&response)
}

/// Insert `spec`, replacing any hook for the same node in place
fn with_hook(mut hooks: Vec<HookSpec>, spec: HookSpec) -> Vec<HookSpec> {
    match hooks.iter_mut().find(|h| h.class_name == spec.class_name) {
        Some(existing) => *existing = spec,
        None => hooks.push(spec),
    }
    hooks
}

fn without_node(hooks: Vec<HookSpec>, node: &str) -> Vec<HookSpec> {
    hooks.into_iter().filter(|h| h.class_name != node).collect()
}
