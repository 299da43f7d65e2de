use std::path::Path;

use anyhow::Result;
use monowatch::{GameLayout, save_layout};

pub fn run(output: Option<&Path>) -> Result<()> {
    let layout = GameLayout::template();
    match output {
        Some(path) => {
            save_layout(path, &layout)?;
            eprintln!("Layout template written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&layout)?),
    }
    Ok(())
}
