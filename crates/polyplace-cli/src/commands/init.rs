use std::path::{Path, PathBuf};

use anyhow::bail;

use polyplace_core::PolyplaceConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let output = write_scaffold(path, force)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

fn write_scaffold(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    let output = dir.join("polyplace.toml");
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&output, PolyplaceConfig::scaffold().to_toml_string()?)?;
    Ok(output)
}
