//! Reference ID generation
//!
//! Reference IDs look like `REQ-001`. The next ID is derived from the highest
//! number already in the dataset, so it must be computed while the dataset is
//! locked for writing.

use crate::error::{StoreError, StoreResult};
use crate::models::Request;

pub const REFERENCE_PREFIX: &str = "REQ-";

/// ID given to the first request of an empty dataset
pub const FIRST_REFERENCE_ID: &str = "REQ-001";

/// Formats a sequence number as a reference ID (three digits minimum)
pub fn format_reference_id(number: u32) -> String {
    format!("{}{:03}", REFERENCE_PREFIX, number)
}

/// Extracts the numeric part of a `REQ-<digits>` identifier
pub fn parse_reference_number(reference_id: &str) -> StoreResult<u32> {
    let digits = reference_id
        .strip_prefix(REFERENCE_PREFIX)
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| StoreError::MalformedIdentifier(reference_id.to_string()))?;

    digits
        .parse::<u32>()
        .map_err(|_| StoreError::MalformedIdentifier(reference_id.to_string()))
}

/// Returns the ID for the next request: highest existing number plus one
///
/// Numbers past 999 keep growing (`REQ-1000`). Any malformed existing ID
/// aborts generation rather than risking a duplicate.
pub fn next_reference_id(requests: &[Request]) -> StoreResult<String> {
    let mut max = None;
    for request in requests {
        let n = parse_reference_number(&request.reference_id)?;
        max = max.max(Some(n));
    }

    match max {
        None => Ok(FIRST_REFERENCE_ID.to_string()),
        Some(n) => {
            let next = n.checked_add(1).ok_or_else(|| {
                StoreError::MalformedIdentifier(format_reference_id(n))
            })?;
            Ok(format_reference_id(next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRequest;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn with_ids(ids: &[&str]) -> Vec<Request> {
        ids.iter()
            .map(|id| {
                Request::new(
                    id.to_string(),
                    NewRequest::new("Alice", "Travel", Decimal::ONE),
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_dataset_starts_at_first_id() {
        assert_eq!(next_reference_id(&[]).unwrap(), "REQ-001");
    }

    #[test]
    fn test_sequential_ids_increment() {
        for k in 1..=12u32 {
            let ids: Vec<String> = (1..=k).map(format_reference_id).collect();
            let refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
            assert_eq!(
                next_reference_id(&with_ids(&refs)).unwrap(),
                format_reference_id(k + 1)
            );
        }
    }

    #[test]
    fn test_uses_maximum_not_last_or_count() {
        let requests = with_ids(&["REQ-007", "REQ-002", "REQ-004"]);
        assert_eq!(next_reference_id(&requests).unwrap(), "REQ-008");
    }

    #[test]
    fn test_widens_past_three_digits() {
        let requests = with_ids(&["REQ-999"]);
        assert_eq!(next_reference_id(&requests).unwrap(), "REQ-1000");
        assert_eq!(parse_reference_number("REQ-1000").unwrap(), 1000);
    }

    #[test]
    fn test_malformed_ids_abort() {
        for bad in ["REQ-", "REQ-12a", "SPEC-001", "req-001", "REQ--1", ""] {
            let requests = with_ids(&["REQ-001", bad]);
            assert!(
                matches!(
                    next_reference_id(&requests),
                    Err(StoreError::MalformedIdentifier(_))
                ),
                "expected {:?} to be rejected",
                bad
            );
        }
    }
}
