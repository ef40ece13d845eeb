use std::path::Path;
use std::sync::Arc;

use crate::cli::output::{output_json, print_success, print_table, OutputMode};
use crate::init::AppContext;
use crate::services::{BookImport, ImportService};

pub async fn handle_import(ctx: &AppContext, file: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", file.display(), e))?;
    let import = BookImport::from_yaml(&content)?;

    let service = ImportService::new(Arc::clone(&ctx.db));
    let result = service.execute_import(import).await?;

    match mode {
        OutputMode::Json => output_json(&result),
        OutputMode::Human => {
            print_success(&format!("Imported book {}", result.book_id));
            let rows = [
                ("characters", result.characters),
                ("locations", result.locations),
                ("relationships", result.relationships),
                ("chapters", result.chapters),
                ("scenes", result.scenes),
            ]
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| vec![kind.to_string(), count.to_string()])
            .collect();
            print_table(&["Type", "Created"], rows);
        }
    }
    Ok(())
}
