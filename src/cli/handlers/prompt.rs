use crate::cli::output::{output_json, print_hint, OutputMode};
use crate::init::AppContext;
use crate::services::Command;

/// Print the compiled system prompt, or the assembled context as JSON.
pub async fn handle_prompt(
    ctx: &AppContext,
    book_id: &str,
    chapter_id: Option<&str>,
    command: Option<&str>,
    selected_text: Option<&str>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let book_context = ctx.assembler.build(book_id, chapter_id).await?;

    match mode {
        OutputMode::Json => output_json(&book_context),
        OutputMode::Human => {
            let command = Command::parse(command);
            let prompt = ctx.compiler.compile(&book_context, command, selected_text);
            print_hint(&format!(
                "# {} / {} ({} chars)",
                book_context.title,
                command.as_str(),
                prompt.chars().count()
            ));
            println!("{prompt}");
        }
    }
    Ok(())
}
