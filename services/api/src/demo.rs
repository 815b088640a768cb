use crate::infra::{open_store, parse_status, TracingNotificationPublisher};
use clap::Args;
use loan_origination::config::AppConfig;
use loan_origination::error::AppError;
use loan_origination::workflows::origination::{
    write_csv, Actor, ApplicationFilter, ApplicationRecord, ApplicationRepository,
    ApplicationStatus, ApplicationSubmission, BasicInfo, BusinessInfo, DecisionOutcome,
    DecisionSubmission, DocumentCategory, DocumentDescriptor, LoanApplicationService,
    LoanDetails, LoanServiceError, NotificationPublisher, PipelineSummary, RepositoryError, Role,
    Shareholder, SqliteApplicationStore, TransitionCommand, VoteSubmission,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Database to run against. Defaults to a throwaway in-memory database.
    #[arg(long)]
    pub(crate) database_url: Option<String>,
    /// Committee outcome to record at the end of the walkthrough.
    #[arg(long)]
    pub(crate) outcome: Option<DecisionOutcome>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PipelineArgs {
    /// Override the configured database URL
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Destination CSV file
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Only export applications in these statuses (repeatable)
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Vec<ApplicationStatus>,
    /// Only export applications owned by this relationship manager
    #[arg(long)]
    pub(crate) manager: Option<String>,
    /// Stop after this many applications, oldest first
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Override the configured database URL
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

pub(crate) async fn run_pipeline_report(args: PipelineArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = open_store(&config.database, args.database_url.as_deref()).await?;
    let summary = PipelineSummary::from_counts(&store.status_counts().await?);
    render_pipeline(&summary);
    Ok(())
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        output,
        status,
        manager,
        limit,
        database_url,
    } = args;

    let config = AppConfig::load()?;
    let store = open_store(&config.database, database_url.as_deref()).await?;
    let filter = ApplicationFilter {
        statuses: status,
        relationship_manager_id: manager,
        limit,
    };
    let records = store.list(&filter).await?;

    let writer = BufWriter::new(File::create(&output)?);
    let written = write_csv(&records, writer)?;
    println!("Exported {written} application(s) to {}", output.display());
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = match args.database_url.as_deref() {
        Some(url) => SqliteApplicationStore::connect(url, 1).await?,
        None => SqliteApplicationStore::open_in_memory().await?,
    };
    let config = AppConfig::load()?;
    let service = LoanApplicationService::new(
        Arc::new(store),
        Arc::new(TracingNotificationPublisher),
        config.intake,
    );

    let manager = Actor::new("rm-demo", Role::RelationshipManager);
    let analyst = Actor::new("analyst-demo", Role::CreditAnalyst);
    let rival = Actor::new("analyst-rival", Role::CreditAnalyst);
    let supervisor = Actor::new("supervisor-demo", Role::Supervisor);

    println!("=== Loan Origination Demo ===");
    let record = service.submit(&manager, demo_submission()).await?;
    println!(
        "Submitted {} for {} ({} requested over {} months)",
        record.reference,
        record.profile.business_info.business_name,
        record.profile.loan_details.amount,
        record.profile.loan_details.term_months
    );

    println!();
    println!("Two analysts claim the application at the same moment:");
    let claim = |actor: &Actor| {
        let actor = actor.clone();
        let service = &service;
        let id = record.id.clone();
        async move {
            let result = service
                .transition(
                    &actor,
                    &id,
                    step(ApplicationStatus::Pending, ApplicationStatus::UnderReview, None),
                )
                .await;
            (actor, result)
        }
    };
    let (left, right) = tokio::join!(claim(&analyst), claim(&rival));
    let mut assigned = None;
    for (actor, result) in [left, right] {
        match result {
            Ok(_) => {
                println!("  - {} claimed it", actor.id);
                assigned = Some(actor);
            }
            Err(LoanServiceError::Repository(RepositoryError::Conflict { actual, .. })) => {
                println!("  - {} was told the application is already {actual}", actor.id);
            }
            Err(other) => return Err(other.into()),
        }
    }
    let analyst = assigned.unwrap_or(analyst);

    let path = [
        (
            &analyst,
            ApplicationStatus::UnderReview,
            ApplicationStatus::AnalysisCompleted,
            Some("Debt service coverage 1.8x; recommend approval"),
        ),
        (
            &supervisor,
            ApplicationStatus::AnalysisCompleted,
            ApplicationStatus::SupervisorReviewing,
            None,
        ),
        (
            &supervisor,
            ApplicationStatus::SupervisorReviewing,
            ApplicationStatus::Supervised,
            Some("Concur with analyst"),
        ),
        (
            &supervisor,
            ApplicationStatus::Supervised,
            ApplicationStatus::CommitteeReview,
            None,
        ),
    ];
    for (actor, from, to, comment) in path {
        service
            .transition(actor, &record.id, step(from, to, comment))
            .await?;
    }

    let outcome = args.outcome.unwrap_or(DecisionOutcome::Approved);
    for member in ["committee-a", "committee-b", "committee-c"] {
        service
            .vote(
                &Actor::new(member, Role::CommitteeMember),
                &record.id,
                VoteSubmission {
                    vote: outcome,
                    rationale: String::new(),
                },
            )
            .await?;
    }
    let votes = service.votes(&record.id).await?;
    println!();
    println!(
        "Committee votes: {} approved / {} rejected / {} reversed",
        votes.tally.approved, votes.tally.rejected, votes.tally.reversed
    );

    let decision = service
        .decide(
            &Actor::new("committee-a", Role::CommitteeMember),
            &record.id,
            DecisionSubmission {
                outcome,
                rationale: "Unanimous committee vote".to_string(),
            },
        )
        .await?;
    println!("Decision recorded: {} by {}", decision.outcome, decision.decided_by);

    let final_record = service.get(&record.id).await?;
    render_history(&service, &final_record).await?;

    println!();
    render_pipeline(&service.pipeline().await?);
    Ok(())
}

async fn render_history<R, N>(
    service: &LoanApplicationService<R, N>,
    record: &ApplicationRecord,
) -> Result<(), AppError>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    println!();
    println!("Status history for {}:", record.reference);
    for change in service.history(&record.id).await? {
        println!(
            "  - {} -> {} by {} ({}) at {}",
            change.from,
            change.to,
            change.actor_id,
            change.role,
            change.changed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    for comment in &record.comments {
        println!("    note [{}] {}: {}", comment.status, comment.author_id, comment.body);
    }
    Ok(())
}

fn render_pipeline(summary: &PipelineSummary) {
    println!("Pipeline ({} open, {} closed):", summary.open, summary.closed);
    for entry in &summary.statuses {
        println!("  {:<22} {:>5}", entry.status, entry.count);
    }
    println!("  {:<22} {:>5}", "TOTAL", summary.total);
}

fn step(
    expected: ApplicationStatus,
    next: ApplicationStatus,
    comment: Option<&str>,
) -> TransitionCommand {
    TransitionCommand {
        expected_status: expected,
        next_status: next,
        comment: comment.map(str::to_string),
    }
}

fn demo_submission() -> ApplicationSubmission {
    ApplicationSubmission {
        basic_info: BasicInfo {
            customer_name: "Wanjiru Kamau".to_string(),
            national_id: "27100456".to_string(),
            phone: "+254722450011".to_string(),
            email: "wanjiru@kamau-hardware.co.ke".to_string(),
        },
        business_info: BusinessInfo {
            business_name: "Kamau Hardware Ltd".to_string(),
            registration_number: "CPR/2017/88120".to_string(),
            sector: "Retail".to_string(),
            years_in_operation: 8,
            annual_revenue: 26_000_000,
        },
        loan_details: LoanDetails {
            amount: 4_000_000,
            term_months: 36,
            purpose: "Second branch fit-out".to_string(),
            collateral: Some("Commercial vehicle KDA 221X".to_string()),
        },
        shareholders: vec![
            Shareholder {
                name: "Wanjiru Kamau".to_string(),
                ownership_percent: 70.0,
            },
            Shareholder {
                name: "Joseph Kamau".to_string(),
                ownership_percent: 30.0,
            },
        ],
        documents: vec![
            DocumentDescriptor {
                name: "national-id.pdf".to_string(),
                category: DocumentCategory::Identification,
                storage_key: "demo/kamau/national-id.pdf".to_string(),
                content_type: None,
            },
            DocumentDescriptor {
                name: "bank-statement-2025.pdf".to_string(),
                category: DocumentCategory::BankStatement,
                storage_key: "demo/kamau/bank-statement-2025.pdf".to_string(),
                content_type: None,
            },
        ],
    }
}
