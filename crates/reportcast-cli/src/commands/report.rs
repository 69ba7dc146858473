//! Report generation and inspection commands.

use super::Context;
use chrono::NaiveDate;
use clap::Args;
use console::style;
use reportcast_core::{DateRange, Report, ReportType};
use reportcast_dispatch::{GenerateRequest, ReportAggregator, ReportStore};

/// Report command arguments.
#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(clap::Subcommand)]
pub enum ReportCommand {
    /// Aggregate a student's activity into a new report
    Generate {
        /// Tenant (academy) id
        #[arg(long)]
        tenant: String,

        /// Student id
        #[arg(long)]
        student: String,

        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Report type (monthly, weekly, custom)
        #[arg(long = "type", default_value = "monthly")]
        report_type: ReportType,

        /// Actor recorded as the report's author
        #[arg(long, default_value = "cli")]
        by: String,

        /// Teacher comment to include
        #[arg(long)]
        comment: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored reports for a tenant
    List {
        /// Tenant (academy) id
        #[arg(long)]
        tenant: String,
    },

    /// Show one stored report as JSON
    Show {
        /// Report id
        id: String,
    },
}

/// Run the report command.
pub async fn run(args: ReportArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        ReportCommand::Generate {
            tenant,
            student,
            from,
            to,
            report_type,
            by,
            comment,
            json,
        } => {
            let source = ctx.activity().await?;
            let academy = source.academy().cloned();
            let aggregator = ReportAggregator::new(source).with_academy(academy);

            let report = aggregator
                .generate(GenerateRequest {
                    tenant_id: tenant,
                    student_id: student,
                    period: DateRange::new(from, to)?,
                    report_type,
                    generated_by: by,
                    comment,
                })
                .await?;

            let store = ctx.reports().await?;
            store.save(&report).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
        }

        ReportCommand::List { tenant } => {
            let store = ctx.reports().await?;
            let reports = store.list(&tenant).await?;
            if reports.is_empty() {
                println!("No reports for tenant {}", tenant);
                return Ok(());
            }

            println!("  {:<40} {:<10} {:<12} {}", "ID", "TYPE", "STUDENT", "PERIOD");
            println!("  {}", "-".repeat(90));
            for report in &reports {
                println!(
                    "  {:<40} {:<10} {:<12} {}",
                    report.id(),
                    report.report_type(),
                    report.data().student.name,
                    report.data().period
                );
            }
        }

        ReportCommand::Show { id } => {
            let store = ctx.reports().await?;
            match store.get(&id).await? {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => anyhow::bail!("Report not found: {}", id),
            }
        }
    }

    Ok(())
}

fn print_summary(report: &Report) {
    let data = report.data();
    println!("{} Report {}", style("✓").green(), style(report.id()).bold());
    println!("  학생:     {}", data.student.name);
    println!("  기간:     {} ({})", data.period, report.report_type());
    println!("  평균 점수: {}점 (시험 {}회)", data.avg_score, data.exams.len());
    println!(
        "  출석률:   {}% ({}/{}일)",
        data.attendance.rate, data.attendance.present_days, data.attendance.total_days
    );
    println!(
        "  과제:     {}% ({}/{})",
        data.homework.rate, data.homework.completed, data.homework.total
    );
    println!("  상담:     {}건", data.consultations.len());
}
