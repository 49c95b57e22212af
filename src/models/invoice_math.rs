use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// `rate * volume * (1 + tax/100)`.
pub fn line_amount(unit_rate: Decimal, volume: Decimal, tax_percent: Decimal) -> Decimal {
    unit_rate * volume * (Decimal::ONE + tax_percent / dec!(100))
}

/// Portion of a stage total due under its payment term percent.
pub fn paid_by_term(total: Decimal, percent: Decimal) -> Decimal {
    total * percent / dec!(100)
}

/// Rounds to cents, half away from zero.
pub fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartialPaid,
    FullyPaid,
}

impl PaymentStatus {
    pub fn derive(total_paid: Decimal, total_amount: Decimal) -> Self {
        if total_paid >= total_amount {
            PaymentStatus::FullyPaid
        } else if total_paid > Decimal::ZERO {
            PaymentStatus::PartialPaid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn stage_amounts_match_worked_example() {
        let amount = line_amount(dec!(100), dec!(2), dec!(18));
        assert_eq!(money(amount), dec!(236.00));
        assert_eq!(money(paid_by_term(amount, dec!(40))), dec!(94.40));
        assert_eq!(money(paid_by_term(amount, dec!(20))), dec!(47.20));
    }

    #[rstest]
    #[case(dec!(0), dec!(100), PaymentStatus::Unpaid)]
    #[case(dec!(10), dec!(100), PaymentStatus::PartialPaid)]
    #[case(dec!(100), dec!(100), PaymentStatus::FullyPaid)]
    #[case(dec!(150), dec!(100), PaymentStatus::FullyPaid)]
    #[case(dec!(0), dec!(0), PaymentStatus::FullyPaid)]
    fn derives_payment_status(
        #[case] paid: Decimal,
        #[case] total: Decimal,
        #[case] expected: PaymentStatus,
    ) {
        assert_eq!(PaymentStatus::derive(paid, total), expected);
    }

    #[test]
    fn status_column_spelling() {
        assert_eq!(PaymentStatus::PartialPaid.to_string(), "partial_paid");
        assert_eq!(
            "fully_paid".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::FullyPaid
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn term_shares_sum_to_stage_total(total in cents()) {
            let parts = [dec!(40), dec!(20), dec!(30), dec!(10)];
            let sum: Decimal = parts.iter().map(|p| paid_by_term(total, *p)).sum();
            prop_assert_eq!(sum, total);
        }

        #[test]
        fn status_is_monotonic_in_payments(total in cents(), paid in cents()) {
            let status = PaymentStatus::derive(paid, total);
            if paid >= total && paid > Decimal::ZERO {
                prop_assert_eq!(status, PaymentStatus::FullyPaid);
            } else if paid > Decimal::ZERO {
                prop_assert_eq!(status, PaymentStatus::PartialPaid);
            }
        }
    }
}
