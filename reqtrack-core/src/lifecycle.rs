//! Request lifecycle operations over an in-memory dataset
//!
//! Each function locates a request by reference ID and mutates only the
//! columns it owns. They are run inside `RequestBackend::update_atomically`,
//! which takes care of locking and persisting the result.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::ids;
use crate::models::{FinanceStatus, NewRequest, Request, RequestField, RequestStatus};

/// Criteria for listing requests; `None` matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub finance_status: Option<FinanceStatus>,
    /// Case-insensitive substring of the requester name
    pub requester: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self
                .finance_status
                .map_or(true, |s| request.finance_status == s)
            && self.requester.as_ref().map_or(true, |name| {
                request
                    .requester_name
                    .to_lowercase()
                    .contains(&name.to_lowercase())
            })
    }
}

/// Finds a request by reference ID
pub fn find<'a>(requests: &'a [Request], reference_id: &str) -> StoreResult<&'a Request> {
    let reference_id = reference_id.trim();
    requests
        .iter()
        .find(|r| r.reference_id == reference_id)
        .ok_or_else(|| StoreError::NotFound(reference_id.to_string()))
}

fn find_mut<'a>(requests: &'a mut [Request], reference_id: &str) -> StoreResult<&'a mut Request> {
    let reference_id = reference_id.trim();
    requests
        .iter_mut()
        .find(|r| r.reference_id == reference_id)
        .ok_or_else(|| StoreError::NotFound(reference_id.to_string()))
}

/// Appends a row, refusing a reference ID that is already taken
pub fn push_unique(requests: &mut Vec<Request>, request: Request) -> StoreResult<()> {
    if requests.iter().any(|r| r.reference_id == request.reference_id) {
        return Err(StoreError::validation(format!(
            "Reference ID {} already exists",
            request.reference_id
        )));
    }
    requests.push(request);
    Ok(())
}

/// Validates a submission, assigns the next reference ID and appends the row
pub fn submit(
    requests: &mut Vec<Request>,
    submission: NewRequest,
    submitted_at: DateTime<Utc>,
) -> StoreResult<Request> {
    submission.validate()?;
    let reference_id = ids::next_reference_id(requests)?;
    let request = Request::new(reference_id, submission, submitted_at);
    push_unique(requests, request.clone())?;
    Ok(request)
}

pub fn set_status(
    requests: &mut [Request],
    reference_id: &str,
    status: RequestStatus,
) -> StoreResult<Request> {
    let request = find_mut(requests, reference_id)?;
    request.status = status;
    Ok(request.clone())
}

pub fn set_finance_status(
    requests: &mut [Request],
    reference_id: &str,
    finance_status: FinanceStatus,
    issue_date: Option<NaiveDate>,
) -> StoreResult<Request> {
    let request = find_mut(requests, reference_id)?;
    request.finance_status = finance_status;
    request.issue_date = issue_date;
    Ok(request.clone())
}

pub fn set_liquidation(
    requests: &mut [Request],
    reference_id: &str,
    liquidated: Decimal,
    returned: Decimal,
    invoices: &str,
) -> StoreResult<Request> {
    let request = find_mut(requests, reference_id)?;

    let mut updated = request.clone();
    updated.liquidated = Some(liquidated);
    updated.returned = Some(returned);
    updated.liquidated_invoices = invoices.trim().to_string();
    check_liquidation(&updated)?;

    *request = updated;
    Ok(request.clone())
}

/// Applies a column → value mapping to one request
///
/// Keys may be column headers or field names. Unknown or immutable columns
/// and unparsable values reject the whole edit.
pub fn apply_edit(
    requests: &mut [Request],
    reference_id: &str,
    changes: &BTreeMap<String, String>,
) -> StoreResult<Request> {
    let request = find_mut(requests, reference_id)?;

    if changes.is_empty() {
        return Err(StoreError::validation("No changes given"));
    }

    let unknown: Vec<&str> = changes
        .keys()
        .filter(|k| RequestField::from_key(k).is_none())
        .map(|k| k.as_str())
        .collect();
    if !unknown.is_empty() {
        return Err(StoreError::validation(format!(
            "Unknown column(s): {}",
            unknown.join(", ")
        )));
    }

    let mut updated = request.clone();
    for (key, value) in changes {
        if let Some(field) = RequestField::from_key(key) {
            updated.set_field(field, value)?;
        }
    }
    check_liquidation(&updated)?;

    *request = updated;
    Ok(request.clone())
}

/// Liquidation figures are non-negative and never exceed the requested amount
pub fn check_liquidation(request: &Request) -> StoreResult<()> {
    let liquidated = request.liquidated.unwrap_or_default();
    let returned = request.returned.unwrap_or_default();

    if liquidated < Decimal::ZERO || returned < Decimal::ZERO {
        return Err(StoreError::validation(
            "Liquidated and returned amounts cannot be negative",
        ));
    }
    if liquidated + returned > request.amount_requested {
        return Err(StoreError::validation(format!(
            "Liquidated ({}) plus returned ({}) exceeds the amount requested ({}) for {}",
            liquidated, returned, request.amount_requested, request.reference_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Vec<Request> {
        let mut requests = Vec::new();
        submit(
            &mut requests,
            NewRequest::new("Alice", "Travel", Decimal::new(12050, 2)),
            Utc::now(),
        )
        .unwrap();
        submit(
            &mut requests,
            NewRequest::new("Bob", "Supplies", Decimal::new(30, 0)),
            Utc::now(),
        )
        .unwrap();
        requests
    }

    #[test]
    fn test_submit_assigns_sequential_ids() {
        let requests = dataset();
        assert_eq!(requests[0].reference_id, "REQ-001");
        assert_eq!(requests[1].reference_id, "REQ-002");
        assert_eq!(requests[1].status, RequestStatus::Pending);
    }

    #[test]
    fn test_submit_rejects_invalid_input() {
        let mut requests = dataset();
        let result = submit(
            &mut requests,
            NewRequest::new("Carol", "", Decimal::ONE),
            Utc::now(),
        );
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_set_status_changes_only_status() {
        let mut requests = dataset();
        let before = requests.clone();

        set_status(&mut requests, "REQ-001", RequestStatus::Approved).unwrap();

        assert_eq!(requests[0].status, RequestStatus::Approved);
        let mut expected = before[0].clone();
        expected.status = RequestStatus::Approved;
        assert_eq!(requests[0], expected);
        assert_eq!(requests[1], before[1]);
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let mut requests = dataset();
        let before = requests.clone();
        assert!(matches!(
            set_status(&mut requests, "REQ-404", RequestStatus::Declined),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            set_finance_status(&mut requests, "REQ-404", FinanceStatus::Issued, None),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            set_liquidation(&mut requests, "REQ-404", Decimal::ONE, Decimal::ONE, ""),
            Err(StoreError::NotFound(_))
        ));
        for changes in [
            BTreeMap::from([("Status".to_string(), "Approved".to_string())]),
            BTreeMap::from([("Colour".to_string(), "Blue".to_string())]),
            BTreeMap::new(),
        ] {
            assert!(matches!(
                apply_edit(&mut requests, "REQ-404", &changes),
                Err(StoreError::NotFound(_))
            ));
        }
        assert_eq!(requests, before);
    }

    #[test]
    fn test_liquidation_cannot_exceed_amount() {
        let mut requests = dataset();
        let before = requests.clone();

        let result = set_liquidation(
            &mut requests,
            "REQ-002",
            Decimal::new(25, 0),
            Decimal::new(6, 0),
            "receipt.pdf",
        );
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(requests, before);

        let updated = set_liquidation(
            &mut requests,
            "REQ-002",
            Decimal::new(25, 0),
            Decimal::new(5, 0),
            " receipt.pdf ",
        )
        .unwrap();
        assert_eq!(updated.outstanding(), Decimal::ZERO);
        assert_eq!(updated.liquidated_invoices, "receipt.pdf");
    }

    #[test]
    fn test_edit_applies_known_columns() {
        let mut requests = dataset();
        let changes = BTreeMap::from([
            ("Request Purpose".to_string(), "Conference travel".to_string()),
            ("status".to_string(), "Declined".to_string()),
        ]);

        let updated = apply_edit(&mut requests, "REQ-001", &changes).unwrap();

        assert_eq!(updated.purpose, "Conference travel");
        assert_eq!(updated.status, RequestStatus::Declined);
        assert_eq!(updated.requester_name, "Alice");
    }

    #[test]
    fn test_edit_rejects_unknown_and_immutable_columns() {
        let mut requests = dataset();
        let before = requests.clone();

        let unknown = BTreeMap::from([
            ("Status".to_string(), "Approved".to_string()),
            ("Colour".to_string(), "Blue".to_string()),
        ]);
        assert!(matches!(
            apply_edit(&mut requests, "REQ-001", &unknown),
            Err(StoreError::Validation(_))
        ));

        let immutable = BTreeMap::from([("Reference ID".to_string(), "REQ-100".to_string())]);
        assert!(matches!(
            apply_edit(&mut requests, "REQ-001", &immutable),
            Err(StoreError::Validation(_))
        ));

        let shrink = BTreeMap::from([
            ("Liquidated".to_string(), "20".to_string()),
            ("Amount Requested".to_string(), "10".to_string()),
        ]);
        assert!(apply_edit(&mut requests, "REQ-002", &shrink).is_err());

        assert_eq!(requests, before);
    }

    #[test]
    fn test_filter_matches() {
        let mut requests = dataset();
        set_status(&mut requests, "REQ-002", RequestStatus::Approved).unwrap();

        let approved = RequestFilter {
            status: Some(RequestStatus::Approved),
            ..Default::default()
        };
        let by_name = RequestFilter {
            requester: Some("ali".to_string()),
            ..Default::default()
        };
        assert!(!approved.matches(&requests[0]));
        assert!(approved.matches(&requests[1]));
        assert!(by_name.matches(&requests[0]));
        assert!(!by_name.matches(&requests[1]));
        assert!(RequestFilter::default().matches(&requests[0]));
    }
}
