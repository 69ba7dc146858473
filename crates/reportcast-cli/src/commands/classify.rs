//! Failure classification command.

use super::{print_classification, Context};
use clap::Args;

/// Classify command arguments.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Raw failure message
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    /// Print the classification as JSON
    #[arg(long)]
    pub json: bool,
}

impl ClassifyArgs {
    pub fn text(&self) -> String {
        self.message.join(" ")
    }
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> anyhow::Result<()> {
    let classification = ctx.classifier()?.classify(&args.text());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        print_classification(&classification);
    }
    Ok(())
}
