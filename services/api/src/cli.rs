use crate::demo::{run_demo, run_export, run_pipeline_report, DemoArgs, ExportArgs, PipelineArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_origination::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Origination",
    about = "Run the loan origination service or inspect its application pipeline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print application counts per workflow status
    Pipeline(PipelineArgs),
    /// Export applications as CSV
    Export(ExportArgs),
    /// Walk one application from intake to a committee decision on a scratch database
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured database URL
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Pipeline(args) => run_pipeline_report(args).await,
        Command::Export(args) => run_export(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["loan-origination"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn export_accepts_repeated_status_filters() {
        let cli = Cli::try_parse_from([
            "loan-origination",
            "export",
            "--output",
            "pipeline.csv",
            "--status",
            "COMMITTE_REVIEW",
            "--status",
            "approved",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.output.to_string_lossy(), "pipeline.csv");
                assert_eq!(args.status.len(), 2);
            }
            other => panic!("expected export command, got {other:?}"),
        }
    }

    #[test]
    fn export_limit_is_optional() {
        let cli = Cli::try_parse_from([
            "loan-origination",
            "export",
            "--output",
            "latest.csv",
            "--limit",
            "25",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Export(args)) => assert_eq!(args.limit, Some(25)),
            other => panic!("expected export command, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["loan-origination", "export", "--output", "all.csv"])
            .expect("parses");
        match cli.command {
            Some(Command::Export(args)) => assert_eq!(args.limit, None),
            other => panic!("expected export command, got {other:?}"),
        }
    }

    #[test]
    fn export_rejects_unknown_status() {
        let result = Cli::try_parse_from([
            "loan-origination",
            "export",
            "--output",
            "out.csv",
            "--status",
            "BANNED",
        ]);
        assert!(result.is_err());
    }
}
