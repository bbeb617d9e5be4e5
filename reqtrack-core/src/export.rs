use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::models::{FinanceStatus, Request, RequestStatus};

/// Totals shown on the database overview
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_requests: usize,
    pub pending: usize,
    pub approved: usize,
    pub declined: usize,
    /// Requests whose money has been issued
    pub issued: usize,
    pub total_requested: Decimal,
    pub total_issued: Decimal,
    pub total_liquidated: Decimal,
    pub total_returned: Decimal,
    /// Issued money not yet accounted for by liquidation or return
    pub outstanding: Decimal,
}

impl Summary {
    pub fn from_requests(requests: &[Request]) -> Self {
        let mut summary = Summary {
            total_requests: requests.len(),
            ..Default::default()
        };

        for req in requests {
            match req.status {
                RequestStatus::Pending => summary.pending += 1,
                RequestStatus::Approved => summary.approved += 1,
                RequestStatus::Declined => summary.declined += 1,
            }
            summary.total_requested += req.amount_requested;
            summary.total_liquidated += req.liquidated.unwrap_or_default();
            summary.total_returned += req.returned.unwrap_or_default();

            if req.finance_status == FinanceStatus::Issued {
                summary.issued += 1;
                summary.total_issued += req.amount_requested;
                summary.outstanding += req.outstanding();
            }
        }

        summary
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    summary: Summary,
    requests: &'a [Request],
}

/// Export requests, with their summary, to a JSON file
pub fn export_json(requests: &[Request], output_path: &Path) -> Result<()> {
    let export = JsonExport {
        summary: Summary::from_requests(requests),
        requests,
    };
    let json = serde_json::to_string_pretty(&export)?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write export to {:?}", output_path))?;
    Ok(())
}
