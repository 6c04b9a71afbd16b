use crate::commands::Result;
use outlook_core::builtin_manifest;

/// Prints the built-in manifest, ready to save as tools_manifest.json/.yaml.
pub async fn run(yaml: bool) -> Result<()> {
    let manifest = builtin_manifest();
    if yaml {
        print!("{}", serde_yaml::to_string(&manifest)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    }
    Ok(())
}
