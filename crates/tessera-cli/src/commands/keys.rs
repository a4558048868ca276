//! Key management commands.
//!
//! `tessera keys generate` - Generate a new symmetric key.

use std::fs;
use std::path::PathBuf;
use tessera_token::SymmetricKey;

/// Generate a new symmetric key.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let key = SymmetricKey::generate();

    if let Some(output_path) = output {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&output_path, key.to_base64())?;

        println!("✔ Generated key: {}", output_path.display());
        println!();
        println!("⚠️  Keep this key secret! Never commit it to version control.");
        println!();
        println!("Add it to the ring (primary first):");
        println!("  export TESSERA_KEYS=$(cat {}),$TESSERA_KEYS", output_path.display());
    } else {
        println!("{}", key.to_base64());
    }

    Ok(())
}
