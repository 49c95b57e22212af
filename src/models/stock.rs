use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

/// Post-production status derived from the stock flags.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter, ToSchema,
)]
pub enum StockStatus {
    #[serde(rename = "Stockyard")]
    #[strum(serialize = "Stockyard")]
    Stockyard,
    #[serde(rename = "In request")]
    #[strum(serialize = "In request")]
    InRequest,
    #[serde(rename = "Dispatched")]
    #[strum(serialize = "Dispatched")]
    Dispatched,
    #[serde(rename = "Received at site")]
    #[strum(serialize = "Received at site")]
    ReceivedAtSite,
    #[serde(rename = "Erected")]
    #[strum(serialize = "Erected")]
    Erected,
}

/// The mutually constrained booleans of a `precast_stock` row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockFlags {
    pub stockyard: bool,
    pub dispatch_status: bool,
    pub erected: bool,
    pub order_by_erection: bool,
    pub receive_in_erection: bool,
}

impl StockFlags {
    /// Flags of a row created on stockyard receipt.
    pub fn received() -> Self {
        Self {
            stockyard: true,
            ..Default::default()
        }
    }

    /// Status name for the flag combination, latest stage first. `None` for
    /// combinations that match no predicate.
    pub fn status(&self) -> Option<StockStatus> {
        if self.erected && self.receive_in_erection {
            Some(StockStatus::Erected)
        } else if self.receive_in_erection && !self.erected {
            Some(StockStatus::ReceivedAtSite)
        } else if self.dispatch_status && !self.receive_in_erection {
            Some(StockStatus::Dispatched)
        } else if !self.dispatch_status
            && self.order_by_erection
            && !self.receive_in_erection
            && !self.erected
        {
            Some(StockStatus::InRequest)
        } else if self.stockyard && !self.order_by_erection {
            Some(StockStatus::Stockyard)
        } else {
            None
        }
    }

    /// `erected` implies `receive_in_erection`.
    pub fn is_consistent(&self) -> bool {
        !self.erected || self.receive_in_erection
    }

    /// Applies a transition, refusing moves out of order.
    pub fn apply(self, action: StockAction) -> Result<Self, StockTransitionError> {
        let mut next = self;
        match action {
            StockAction::ReceiveInStockyard => {
                return Err(StockTransitionError::AlreadyInStock);
            }
            StockAction::RequestErection => {
                if self.order_by_erection {
                    return Err(StockTransitionError::AlreadyRequested);
                }
                if !self.stockyard {
                    return Err(StockTransitionError::NotInStockyard);
                }
                next.order_by_erection = true;
            }
            StockAction::Dispatch => {
                if self.dispatch_status {
                    return Err(StockTransitionError::AlreadyDispatched);
                }
                if !self.order_by_erection {
                    return Err(StockTransitionError::NotRequested);
                }
                next.dispatch_status = true;
            }
            StockAction::ReceiveAtSite => {
                if self.receive_in_erection {
                    return Err(StockTransitionError::AlreadyReceived);
                }
                if !self.dispatch_status {
                    return Err(StockTransitionError::NotDispatched);
                }
                next.receive_in_erection = true;
            }
            StockAction::Erect => {
                if self.erected {
                    return Err(StockTransitionError::AlreadyErected);
                }
                if !self.receive_in_erection {
                    return Err(StockTransitionError::NotReceived);
                }
                next.erected = true;
            }
        }
        Ok(next)
    }
}

/// Stock transitions exposed under `/stock/{action}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockAction {
    ReceiveInStockyard,
    RequestErection,
    Dispatch,
    ReceiveAtSite,
    Erect,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockTransitionError {
    #[error("element is already in stock")]
    AlreadyInStock,
    #[error("element is not in the stockyard")]
    NotInStockyard,
    #[error("erection already requested")]
    AlreadyRequested,
    #[error("element has not been requested for erection")]
    NotRequested,
    #[error("element already dispatched")]
    AlreadyDispatched,
    #[error("element has not been dispatched")]
    NotDispatched,
    #[error("element already received at site")]
    AlreadyReceived,
    #[error("element has not been received at site")]
    NotReceived,
    #[error("element already erected")]
    AlreadyErected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_walk_matches_status_table() {
        let mut flags = StockFlags {
            stockyard: true,
            ..Default::default()
        };
        assert_eq!(flags.status(), Some(StockStatus::Stockyard));

        flags.order_by_erection = true;
        flags.receive_in_erection = false;
        assert_eq!(flags.status(), Some(StockStatus::InRequest));

        flags.dispatch_status = true;
        assert_eq!(flags.status(), Some(StockStatus::Dispatched));

        flags.receive_in_erection = true;
        flags.erected = false;
        assert_eq!(flags.status(), Some(StockStatus::ReceivedAtSite));

        flags.erected = true;
        assert_eq!(flags.status(), Some(StockStatus::Erected));
        assert!(flags.is_consistent());
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        let flags = StockFlags::received()
            .apply(StockAction::RequestErection)
            .and_then(|f| f.apply(StockAction::Dispatch))
            .and_then(|f| f.apply(StockAction::ReceiveAtSite))
            .and_then(|f| f.apply(StockAction::Erect))
            .unwrap();
        assert_eq!(flags.status(), Some(StockStatus::Erected));
    }

    #[test]
    fn refuses_out_of_order_moves() {
        let flags = StockFlags::received();
        assert_eq!(
            flags.apply(StockAction::Erect),
            Err(StockTransitionError::NotReceived)
        );
        assert_eq!(
            flags.apply(StockAction::Dispatch),
            Err(StockTransitionError::NotRequested)
        );
        assert_eq!(
            flags.apply(StockAction::ReceiveAtSite),
            Err(StockTransitionError::NotDispatched)
        );
    }

    #[test]
    fn status_names_render_for_humans() {
        assert_eq!(StockStatus::ReceivedAtSite.to_string(), "Received at site");
        assert_eq!(
            serde_json::to_string(&StockStatus::InRequest).unwrap(),
            "\"In request\""
        );
    }

    #[test]
    fn inconsistent_flags_are_detected() {
        let flags = StockFlags {
            erected: true,
            ..Default::default()
        };
        assert!(!flags.is_consistent());
        assert_eq!(flags.status(), None);
    }
}
