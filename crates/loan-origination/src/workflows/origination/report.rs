use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::ApplicationStatus;
use super::repository::ApplicationRecord;

/// Count of applications sitting in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCountEntry {
    pub status: &'static str,
    pub count: u64,
}

/// Portfolio snapshot used by the pipeline endpoint and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub statuses: Vec<StatusCountEntry>,
    pub open: u64,
    pub closed: u64,
    pub total: u64,
}

impl PipelineSummary {
    /// Every status appears, in workflow order, including empty ones.
    pub fn from_counts(counts: &BTreeMap<ApplicationStatus, u64>) -> Self {
        let statuses: Vec<StatusCountEntry> = ApplicationStatus::ALL
            .into_iter()
            .map(|status| StatusCountEntry {
                status: status.label(),
                count: counts.get(&status).copied().unwrap_or(0),
            })
            .collect();

        let closed: u64 = counts
            .iter()
            .filter(|(status, _)| status.is_terminal())
            .map(|(_, count)| *count)
            .sum();
        let total: u64 = counts.values().sum();

        Self {
            statuses,
            open: total - closed,
            closed,
            total,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApplicationCsvRow<'a> {
    reference: &'a str,
    status: &'static str,
    customer_name: &'a str,
    business_name: &'a str,
    amount: u64,
    term_months: u16,
    relationship_manager_id: &'a str,
    analyst_id: &'a str,
    supervisor_id: &'a str,
    documents: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ApplicationRecord> for ApplicationCsvRow<'a> {
    fn from(record: &'a ApplicationRecord) -> Self {
        Self {
            reference: record.reference.as_str(),
            status: record.status.label(),
            customer_name: &record.profile.basic_info.customer_name,
            business_name: &record.profile.business_info.business_name,
            amount: record.profile.loan_details.amount,
            term_months: record.profile.loan_details.term_months,
            relationship_manager_id: &record.relationship_manager_id,
            analyst_id: record.analyst_id.as_deref().unwrap_or(""),
            supervisor_id: record.supervisor_id.as_deref().unwrap_or(""),
            documents: record.documents.len(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export: {0}")]
    Io(#[from] std::io::Error),
}

/// Write one CSV row per application, with a header. Returns the number of rows.
pub fn write_csv<W: Write>(records: &[ApplicationRecord], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ApplicationCsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}
