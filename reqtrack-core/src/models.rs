use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Column headers of the data file, in on-disk order
pub const COLUMNS: [&str; 11] = [
    "Reference ID",
    "Request Submission Date",
    "Requester Name",
    "Request Purpose",
    "Amount Requested",
    "Status",
    "Finance Status",
    "Issue Date",
    "Liquidated",
    "Returned",
    "Liquidated Invoices",
];

/// Approval status of a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Approved => write!(f, "Approved"),
            RequestStatus::Declined => write!(f, "Declined"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "declined" => Ok(RequestStatus::Declined),
            _ => Err(StoreError::validation(format!(
                "Invalid status '{}'. Valid values: Pending, Approved, Declined",
                s
            ))),
        }
    }
}

/// Whether the requested money has been handed out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum FinanceStatus {
    #[default]
    Pending,
    Issued,
}

impl fmt::Display for FinanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinanceStatus::Pending => write!(f, "Pending"),
            FinanceStatus::Issued => write!(f, "Issued"),
        }
    }
}

impl FromStr for FinanceStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(FinanceStatus::Pending),
            "issued" => Ok(FinanceStatus::Issued),
            _ => Err(StoreError::validation(format!(
                "Invalid finance status '{}'. Valid values: Pending, Issued",
                s
            ))),
        }
    }
}

/// A single tracked request (one row of the data file)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Sequential identifier, e.g. "REQ-001"
    #[serde(rename = "Reference ID")]
    pub reference_id: String,

    #[serde(rename = "Request Submission Date")]
    pub submission_date: DateTime<Utc>,

    #[serde(rename = "Requester Name")]
    pub requester_name: String,

    #[serde(rename = "Request Purpose")]
    pub purpose: String,

    #[serde(rename = "Amount Requested", with = "rust_decimal::serde::str")]
    pub amount_requested: Decimal,

    #[serde(rename = "Status")]
    pub status: RequestStatus,

    #[serde(rename = "Finance Status")]
    pub finance_status: FinanceStatus,

    /// Date the money was issued
    #[serde(rename = "Issue Date")]
    pub issue_date: Option<NaiveDate>,

    /// Amount spent
    #[serde(rename = "Liquidated", with = "rust_decimal::serde::str_option")]
    pub liquidated: Option<Decimal>,

    /// Amount handed back
    #[serde(rename = "Returned", with = "rust_decimal::serde::str_option")]
    pub returned: Option<Decimal>,

    /// Reference to attached proof (file paths or links)
    #[serde(rename = "Liquidated Invoices")]
    pub liquidated_invoices: String,
}

impl Request {
    /// Creates a pending request from validated submission data
    pub fn new(reference_id: String, submission: NewRequest, submitted_at: DateTime<Utc>) -> Self {
        Self {
            reference_id,
            submission_date: submitted_at,
            requester_name: submission.requester_name.trim().to_string(),
            purpose: submission.purpose.trim().to_string(),
            amount_requested: submission.amount_requested,
            status: RequestStatus::Pending,
            finance_status: FinanceStatus::Pending,
            issue_date: None,
            liquidated: None,
            returned: None,
            liquidated_invoices: String::new(),
        }
    }

    /// Amount neither liquidated nor returned yet
    pub fn outstanding(&self) -> Decimal {
        self.amount_requested
            - self.liquidated.unwrap_or_default()
            - self.returned.unwrap_or_default()
    }

    /// Renders one column as it would appear in the data file
    pub fn field_value(&self, field: RequestField) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }

        match field {
            RequestField::ReferenceId => self.reference_id.clone(),
            RequestField::SubmissionDate => self.submission_date.to_rfc3339(),
            RequestField::RequesterName => self.requester_name.clone(),
            RequestField::Purpose => self.purpose.clone(),
            RequestField::AmountRequested => self.amount_requested.to_string(),
            RequestField::Status => self.status.to_string(),
            RequestField::FinanceStatus => self.finance_status.to_string(),
            RequestField::IssueDate => opt(&self.issue_date),
            RequestField::Liquidated => opt(&self.liquidated),
            RequestField::Returned => opt(&self.returned),
            RequestField::LiquidatedInvoices => self.liquidated_invoices.clone(),
        }
    }

    /// Parses `value` with the column's type and stores it
    ///
    /// Immutable columns are rejected. An empty value clears optional columns.
    pub fn set_field(&mut self, field: RequestField, value: &str) -> StoreResult<()> {
        let value = value.trim();
        match field {
            RequestField::ReferenceId | RequestField::SubmissionDate => {
                return Err(StoreError::validation(format!(
                    "Column '{}' cannot be changed after submission",
                    field.header()
                )));
            }
            RequestField::RequesterName => self.requester_name = require_text(field, value)?,
            RequestField::Purpose => self.purpose = require_text(field, value)?,
            RequestField::AmountRequested => {
                self.amount_requested = parse_positive_amount(value)?;
            }
            RequestField::Status => self.status = value.parse()?,
            RequestField::FinanceStatus => self.finance_status = value.parse()?,
            RequestField::IssueDate => self.issue_date = parse_optional_date(value)?,
            RequestField::Liquidated => self.liquidated = parse_optional_amount(field, value)?,
            RequestField::Returned => self.returned = parse_optional_amount(field, value)?,
            RequestField::LiquidatedInvoices => self.liquidated_invoices = value.to_string(),
        }
        Ok(())
    }
}

/// Data entered on the request form
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub requester_name: String,
    pub purpose: String,
    pub amount_requested: Decimal,
}

impl NewRequest {
    pub fn new(
        requester_name: impl Into<String>,
        purpose: impl Into<String>,
        amount_requested: Decimal,
    ) -> Self {
        Self {
            requester_name: requester_name.into(),
            purpose: purpose.into(),
            amount_requested,
        }
    }

    /// Rejects empty text fields and non-positive amounts
    pub fn validate(&self) -> StoreResult<()> {
        require_text(RequestField::RequesterName, &self.requester_name)?;
        require_text(RequestField::Purpose, &self.purpose)?;
        if self.amount_requested <= Decimal::ZERO {
            return Err(StoreError::validation(format!(
                "Amount requested must be greater than zero (got {})",
                self.amount_requested
            )));
        }
        Ok(())
    }
}

/// The columns of a request, addressable by header or field name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    ReferenceId,
    SubmissionDate,
    RequesterName,
    Purpose,
    AmountRequested,
    Status,
    FinanceStatus,
    IssueDate,
    Liquidated,
    Returned,
    LiquidatedInvoices,
}

impl RequestField {
    pub const ALL: [RequestField; 11] = [
        RequestField::ReferenceId,
        RequestField::SubmissionDate,
        RequestField::RequesterName,
        RequestField::Purpose,
        RequestField::AmountRequested,
        RequestField::Status,
        RequestField::FinanceStatus,
        RequestField::IssueDate,
        RequestField::Liquidated,
        RequestField::Returned,
        RequestField::LiquidatedInvoices,
    ];

    /// Column header in the data file
    pub fn header(&self) -> &'static str {
        COLUMNS[*self as usize]
    }

    /// snake_case field name
    pub fn name(&self) -> &'static str {
        match self {
            RequestField::ReferenceId => "reference_id",
            RequestField::SubmissionDate => "submission_date",
            RequestField::RequesterName => "requester_name",
            RequestField::Purpose => "purpose",
            RequestField::AmountRequested => "amount_requested",
            RequestField::Status => "status",
            RequestField::FinanceStatus => "finance_status",
            RequestField::IssueDate => "issue_date",
            RequestField::Liquidated => "liquidated",
            RequestField::Returned => "returned",
            RequestField::LiquidatedInvoices => "liquidated_invoices",
        }
    }

    pub fn is_immutable(&self) -> bool {
        matches!(self, RequestField::ReferenceId | RequestField::SubmissionDate)
    }

    /// Looks up a column by header ("Issue Date") or field name ("issue_date"),
    /// ignoring case
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL.into_iter().find(|field| {
            field.header().eq_ignore_ascii_case(key) || field.name().eq_ignore_ascii_case(key)
        })
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

fn require_text(field: RequestField, value: &str) -> StoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::validation(format!("{} is required", field.header())));
    }
    Ok(value.to_string())
}

/// Parses a money amount that must be strictly positive
pub fn parse_positive_amount(value: &str) -> StoreResult<Decimal> {
    let amount = parse_amount(RequestField::AmountRequested, value)?;
    if amount <= Decimal::ZERO {
        return Err(StoreError::validation(format!(
            "Amount requested must be greater than zero (got {})",
            amount
        )));
    }
    Ok(amount)
}

fn parse_amount(field: RequestField, value: &str) -> StoreResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| {
        StoreError::validation(format!("{}: '{}' is not a valid amount", field.header(), value))
    })
}

fn parse_optional_amount(field: RequestField, value: &str) -> StoreResult<Option<Decimal>> {
    if value.is_empty() {
        return Ok(None);
    }
    let amount = parse_amount(field, value)?;
    if amount < Decimal::ZERO {
        return Err(StoreError::validation(format!(
            "{} cannot be negative (got {})",
            field.header(),
            amount
        )));
    }
    Ok(Some(amount))
}

/// Parses a YYYY-MM-DD date; an empty string means no date
pub fn parse_optional_date(value: &str) -> StoreResult<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| {
            StoreError::validation(format!("Invalid date '{}'. Expected YYYY-MM-DD", value))
        })
}
