//! Init command implementation.

use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::ui;
use crate::write::{WriteOp, create_dir_all, write_file};

/// Create the data root, its store directories and a default config
pub fn init_project(config: &Config, force: bool, op: WriteOp) -> anyhow::Result<Vec<Diagnostic>> {
    let config_path = config.config_file();

    if config_path.exists() && !force && !op.is_preview() {
        anyhow::bail!(
            "{} already exists (use -f to overwrite)",
            config_path.display()
        );
    }

    let dirs = [
        config.data_root().to_path_buf(),
        config.paths.wizards_dir(),
        config.paths.runs_dir(),
    ];
    for dir in &dirs {
        create_dir_all(dir, op)?;
        if !op.is_preview() {
            ui::created_path(dir);
        }
    }

    write_file(&config_path, Config::default_toml(), op)?;
    if !op.is_preview() {
        ui::created_path(&config_path);
        ui::success("Initialized wizctl project");
    }
    Ok(vec![])
}
