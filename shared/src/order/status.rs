//! Order status state machine
//!
//! ```text
//! Received ──▶ Preparing ──▶ Completed
//! ```
//!
//! Transitions are strictly forward, one step at a time. `Completed` is terminal.
//! Validation has no side effects; callers persist the result.

use crate::error::{InvalidStatusError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// 已接单
    #[default]
    Received,
    /// 制作中
    Preparing,
    /// 已完成 (终态)
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::Received, Self::Preparing, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Preparing => "preparing",
            Self::Completed => "completed",
        }
    }

    /// The single status reachable from this one, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Preparing),
            Self::Preparing => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "preparing" => Ok(Self::Preparing),
            "completed" => Ok(Self::Completed),
            _ => Err(InvalidStatusError(s.to_string())),
        }
    }
}

/// Whether `from -> to` is one of the two forward edges
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    from.can_transition_to(to)
}

/// Untyped entry point for status values coming from outside (store rows, requests).
///
/// Unknown values on either side are reported, not silently rejected.
pub fn can_transition_str(from: &str, to: &str) -> Result<bool, InvalidStatusError> {
    let from: OrderStatus = from.parse()?;
    let to: OrderStatus = to.parse()?;
    Ok(can_transition(from, to))
}

/// Validate a transition, returning the rejected edge on failure
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ValidationError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_two_forward_edges_allowed() {
        let mut allowed = Vec::new();
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if can_transition(from, to) {
                    allowed.push((from, to));
                }
            }
        }

        assert_eq!(
            allowed,
            vec![
                (OrderStatus::Received, OrderStatus::Preparing),
                (OrderStatus::Preparing, OrderStatus::Completed),
            ]
        );
    }

    #[test]
    fn test_rejected_edges() {
        // 终态
        for to in OrderStatus::ALL {
            assert!(!can_transition(OrderStatus::Completed, to));
        }
        // 回退
        assert!(!can_transition(OrderStatus::Preparing, OrderStatus::Received));
        // 跳步
        assert!(!can_transition(OrderStatus::Received, OrderStatus::Completed));
        // 自环
        for s in OrderStatus::ALL {
            assert!(!can_transition(s, s));
        }
    }

    #[test]
    fn test_validate_transition_reports_edge() {
        let err = validate_transition(OrderStatus::Received, OrderStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: OrderStatus::Received,
                to: OrderStatus::Completed,
            }
        );
        assert!(validate_transition(OrderStatus::Received, OrderStatus::Preparing).is_ok());
    }

    #[test]
    fn test_can_transition_str() {
        assert_eq!(can_transition_str("received", "preparing"), Ok(true));
        assert_eq!(can_transition_str("Preparing", " COMPLETED "), Ok(true));
        assert_eq!(can_transition_str("completed", "received"), Ok(false));
        assert_eq!(
            can_transition_str("cancelled", "received"),
            Err(InvalidStatusError("cancelled".to_string()))
        );
        assert!(can_transition_str("received", "").is_err());
    }

    #[test]
    fn test_next_and_terminal() {
        assert_eq!(OrderStatus::Received.next(), Some(OrderStatus::Preparing));
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        let back: OrderStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(back, OrderStatus::Completed);
        assert!(serde_json::from_str::<OrderStatus>("\"void\"").is_err());
    }
}
