//! Line-oriented reviewer: shows each preview and reads a one-letter choice.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use respan_kernel::{Decision, ItemOutcome, LastCommit, ReviewContext, Reviewer};
use respan_types::DocumentId;

const RULE: &str = "----------------------------------------------------------------------";

pub struct PromptReviewer<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> PromptReviewer<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
        }
    }

    /// Next trimmed, lowercased line; `None` at end of input.
    async fn read_choice(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_lowercase()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read input");
                None
            }
        }
    }
}

fn show(ctx: &ReviewContext<'_>) {
    let preview = ctx.preview;
    println!("\n{}", RULE.replace('-', "="));
    println!(
        "DOCUMENT {} of {} ({}) [{}]",
        ctx.position, ctx.total, preview.id, ctx.mode
    );
    if let Some(last) = ctx.undoable {
        println!("[last edited: {}, press U to undo]", last.id);
    }
    println!("\nORIGINAL:\n{RULE}\n{}", preview.original);
    println!(
        "\n{RULE}\nAFTER ('{}' -> '{}'):\n{RULE}\n{}",
        ctx.params.search, ctx.params.replace, preview.replaced
    );
    let mut changes = format!("Changes: {} text replacement(s)", preview.matches);
    if preview.url_changes > 0 {
        changes.push_str(&format!(", {} URL(s)", preview.url_changes));
    }
    println!("\n{RULE}\n{changes}\n{RULE}");
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Reviewer for PromptReviewer<R> {
    async fn review(&mut self, ctx: ReviewContext<'_>) -> Decision {
        show(&ctx);
        let undo = ctx.undoable.is_some();
        loop {
            if undo {
                println!("[A]pprove  [S]kip  [U]ndo last  [V]iew  [Q]uit  [C]ancel");
            } else {
                println!("[A]pprove  [S]kip  [V]iew  [Q]uit  [C]ancel");
            }
            let Some(choice) = self.read_choice().await else {
                return Decision::Quit;
            };
            match choice.as_str() {
                "a" => return Decision::Approve,
                "s" => return Decision::Skip,
                "u" if undo => return Decision::Undo,
                "v" => show(&ctx),
                "q" => return Decision::Quit,
                "c" => return Decision::Cancel,
                other => println!("Invalid choice {other:?}."),
            }
        }
    }

    async fn confirm_final_undo(&mut self, last: &LastCommit) -> bool {
        println!("\n{RULE}\nLast edited document: {}", last.id);
        println!("Undo this last edit? (y/N)");
        matches!(self.read_choice().await.as_deref(), Some("y"))
    }

    fn outcome(&mut self, id: DocumentId, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Applied { changes } => println!("  {id} updated ({changes} change(s))."),
            ItemOutcome::Skipped => println!("  {id} skipped."),
            ItemOutcome::StaleNoOp => {
                println!("  {id}: no replacements in current content (changed since search).")
            }
            ItemOutcome::RemoteUnchanged => println!("  {id} was not modified (content unchanged)."),
            ItemOutcome::Undone { id } => println!("  {id} restored to original."),
            ItemOutcome::Failed(e) => println!("  Error on {id}: {e}"),
        }
    }
}
