//! Report notification command.

use super::{print_classification, Context};
use clap::Args;
use console::style;
use reportcast_core::{Channel, ContactKind, Recipient};
use reportcast_dispatch::{ActivitySource, ReportStore, SendReportRequest};

/// Send command arguments.
#[derive(Args)]
pub struct SendArgs {
    /// Report id
    pub report_id: String,

    /// Channel (sms, lms, kakao, email)
    #[arg(long, default_value = "lms")]
    pub channel: Channel,

    /// Recipient phone number or email; defaults to the student's guardian
    #[arg(long)]
    pub to: Option<String>,

    /// Recipient display name (with --to)
    #[arg(long)]
    pub name: Option<String>,

    /// Actor recorded as the sender
    #[arg(long, default_value = "cli")]
    pub sender: String,

    /// Print the provider response as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the send command.
pub async fn run(args: SendArgs, ctx: &Context) -> anyhow::Result<()> {
    let recipient = match args.to {
        Some(contact) => Recipient::new(args.name.unwrap_or_else(|| "보호자".to_string()), contact),
        None => guardian_for(ctx, &args.report_id, args.channel).await?,
    };

    let orchestrator = ctx.orchestrator().await?;
    let result = orchestrator
        .send_report(SendReportRequest {
            report_id: args.report_id,
            channel: args.channel,
            recipient: recipient.clone(),
            sender_id: args.sender,
        })
        .await;

    match result {
        Ok(response) => {
            let classification = orchestrator.classify(&response);
            if args.json {
                let out = serde_json::json!({
                    "response": response,
                    "classification": classification,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if response.success {
                println!(
                    "{} Sent {} to {} <{}>",
                    style("✓").green(),
                    args.channel,
                    recipient.name,
                    recipient.contact
                );
                if let Some(id) = &response.message_id {
                    println!("  message id: {}", id);
                }
                if let Some(cost) = response.cost {
                    println!("  cost: {}", cost);
                }
            } else if let Some(c) = &classification {
                print_classification(c);
            }

            if !response.success {
                anyhow::bail!(
                    "Send failed: {}",
                    response.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
        Err(e) => {
            if !args.json {
                print_classification(&orchestrator.classify_error(&e));
            }
            Err(e.into())
        }
    }
}

/// Resolve the guardian contact for the report's student.
async fn guardian_for(ctx: &Context, report_id: &str, channel: Channel) -> anyhow::Result<Recipient> {
    let report = ctx
        .reports()
        .await?
        .get(report_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Report not found: {}", report_id))?;
    let student_id = report
        .student_id()
        .ok_or_else(|| anyhow::anyhow!("Report {} has no student; pass --to", report_id))?;

    let student = ctx
        .activity()
        .await?
        .student(report.tenant_id(), student_id)
        .await?
        .filter(|s| !s.is_deleted())
        .ok_or_else(|| anyhow::anyhow!("Student not found: {}", student_id))?;

    student.recipient_for(channel).ok_or_else(|| {
        let kind = match channel.contact_kind() {
            ContactKind::Phone => "phone",
            ContactKind::Email => "email",
        };
        anyhow::anyhow!(
            "No guardian {} for student {}; pass --to",
            kind,
            student.name
        )
    })
}
