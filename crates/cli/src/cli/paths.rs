use anyhow::Result;
use remove_print_core::paths::Paths;

pub fn run(paths: &Paths) -> Result<()> {
    let user_hooks = paths.user_hooks_file();

    println!("remove-print paths:");
    println!("  User dir:     {}", paths.user_dir.display());
    println!(
        "  User hooks:   {}{}",
        user_hooks.display(),
        if user_hooks.exists() { "" } else { " (not present)" }
    );
    match &paths.default_hooks {
        Some(path) => println!("  Defaults:     {}", path.display()),
        None => println!("  Defaults:     built-in"),
    }

    Ok(())
}
