use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;
use utoipa::ToSchema;

/// Canonical invoice stage. The variant order is the order stages are
/// reported in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StageKey {
    Casted,
    Dispatch,
    Erection,
    Handover,
}

impl StageKey {
    /// Lower-cases the key and folds the legacy `dispatched` spelling.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "casted" => Some(StageKey::Casted),
            "dispatch" | "dispatched" => Some(StageKey::Dispatch),
            "erection" => Some(StageKey::Erection),
            "handover" => Some(StageKey::Handover),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKey::Casted => "casted",
            StageKey::Dispatch => "dispatch",
            StageKey::Erection => "erection",
            StageKey::Handover => "handover",
        }
    }

    pub fn canonical_order() -> impl Iterator<Item = StageKey> {
        StageKey::iter()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentTermError {
    #[error("unknown payment term stage `{0}`")]
    UnknownStage(String),
    #[error("percent for `{0}` must be between 0 and 100")]
    OutOfRange(String),
    #[error("payment term percents must add up to 100, got {0}")]
    BadTotal(Decimal),
}

/// Stage to percent map of a work order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerm(BTreeMap<StageKey, Decimal>);

impl PaymentTerm {
    /// Validated construction from request input. Keys are normalised and
    /// the percents must total exactly 100.
    pub fn from_input(input: &BTreeMap<String, Decimal>) -> Result<Self, PaymentTermError> {
        let mut map = BTreeMap::new();
        for (key, pct) in input {
            let stage = StageKey::normalize(key)
                .ok_or_else(|| PaymentTermError::UnknownStage(key.clone()))?;
            if *pct < Decimal::ZERO || *pct > dec!(100) {
                return Err(PaymentTermError::OutOfRange(key.clone()));
            }
            *map.entry(stage).or_insert(Decimal::ZERO) += *pct;
        }
        let term = PaymentTerm(map);
        let total = term.total();
        if total != dec!(100) {
            return Err(PaymentTermError::BadTotal(total));
        }
        Ok(term)
    }

    /// Reads whatever is stored in the column. Malformed content yields an
    /// empty term; an object wrapped in a JSON string is unwrapped first.
    pub fn parse_lenient(raw: Option<&JsonValue>) -> Self {
        let value = match raw {
            Some(JsonValue::String(inner)) => match serde_json::from_str::<JsonValue>(inner) {
                Ok(v) => v,
                Err(_) => return Self::default(),
            },
            Some(v) => v.clone(),
            None => return Self::default(),
        };

        let JsonValue::Object(obj) = value else {
            return Self::default();
        };

        let mut map = BTreeMap::new();
        for (key, pct) in obj {
            let Some(stage) = StageKey::normalize(&key) else {
                continue;
            };
            let pct = match pct {
                JsonValue::Number(n) => n.to_string().parse::<Decimal>().ok(),
                JsonValue::String(s) => s.trim().parse::<Decimal>().ok(),
                _ => None,
            };
            if let Some(pct) = pct {
                *map.entry(stage).or_insert(Decimal::ZERO) += pct;
            }
        }
        PaymentTerm(map)
    }

    pub fn percent(&self, stage: StageKey) -> Decimal {
        self.0.get(&stage).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        let obj = self
            .0
            .iter()
            .map(|(k, v)| {
                let num = serde_json::from_str::<JsonValue>(&v.normalize().to_string())
                    .unwrap_or(JsonValue::Null);
                (k.as_str().to_string(), num)
            })
            .collect();
        JsonValue::Object(obj)
    }

    pub fn entries(&self) -> impl Iterator<Item = (StageKey, Decimal)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn normalises_legacy_dispatched() {
        assert_eq!(StageKey::normalize("Dispatched"), Some(StageKey::Dispatch));
        assert_eq!(StageKey::normalize(" CASTED "), Some(StageKey::Casted));
        assert_eq!(StageKey::normalize("curing"), None);
    }

    #[test]
    fn canonical_order_is_fixed() {
        let order: Vec<_> = StageKey::canonical_order().collect();
        assert_eq!(
            order,
            vec![
                StageKey::Casted,
                StageKey::Dispatch,
                StageKey::Erection,
                StageKey::Handover
            ]
        );
    }

    #[test]
    fn input_must_total_one_hundred() {
        let ok = PaymentTerm::from_input(&input(&[
            ("casted", dec!(40)),
            ("dispatched", dec!(20)),
            ("erection", dec!(30)),
            ("handover", dec!(10)),
        ]))
        .unwrap();
        assert_eq!(ok.percent(StageKey::Dispatch), dec!(20));

        assert_eq!(
            PaymentTerm::from_input(&input(&[("casted", dec!(40))])),
            Err(PaymentTermError::BadTotal(dec!(40)))
        );
        assert_eq!(
            PaymentTerm::from_input(&input(&[("curing", dec!(100))])),
            Err(PaymentTermError::UnknownStage("curing".into()))
        );
    }

    #[test]
    fn lenient_parse_tolerates_bad_storage() {
        assert!(PaymentTerm::parse_lenient(None).is_empty());
        assert!(PaymentTerm::parse_lenient(Some(&json!("{not json"))).is_empty());
        assert!(PaymentTerm::parse_lenient(Some(&json!([1, 2]))).is_empty());

        let wrapped = json!("{\"casted\": 40, \"Dispatched\": \"20\"}");
        let term = PaymentTerm::parse_lenient(Some(&wrapped));
        assert_eq!(term.percent(StageKey::Casted), dec!(40));
        assert_eq!(term.percent(StageKey::Dispatch), dec!(20));
        assert_eq!(term.percent(StageKey::Handover), Decimal::ZERO);
    }

    #[test]
    fn json_round_trip_through_storage() {
        let term = PaymentTerm::from_input(&input(&[
            ("casted", dec!(40)),
            ("dispatch", dec!(20)),
            ("erection", dec!(30)),
            ("handover", dec!(10)),
        ]))
        .unwrap();
        let stored = term.to_json();
        assert_eq!(PaymentTerm::parse_lenient(Some(&stored)), term);
    }
}
