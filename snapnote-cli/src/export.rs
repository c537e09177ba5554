//! `export` command

use crate::context::CliContext;
use crate::display;
use crate::error::{CliError, CliResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub async fn run_export(context: &CliContext, output: Option<PathBuf>) -> CliResult<()> {
    let mut response = context.execute("exportNotes", Map::new()).await?;
    let data: Value = response.take("data")?;
    let filename: String = response.take("filename")?;
    let document = serde_json::to_string_pretty(&data)?;

    match output {
        None => println!("{document}"),
        Some(path) => {
            let target = resolve_target(&path, &filename);
            std::fs::write(&target, document + "\n").map_err(|e| {
                CliError::new(
                    format!("Failed to write export to {}: {}", target.display(), e),
                    crate::exit_codes::EXIT_ERROR,
                )
            })?;
            let count = data.get("count").and_then(Value::as_u64).unwrap_or(0);
            println!(
                "{}",
                display::success(&format!("Exported {} note(s) to {}", count, target.display()))
            );
        }
    }
    Ok(())
}

/// A directory receives the suggested file name, anything else is the file
fn resolve_target(path: &Path, filename: &str) -> PathBuf {
    if path.is_dir() {
        path.join(filename)
    } else {
        path.to_path_buf()
    }
}
