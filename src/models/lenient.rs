//! Serde helpers for request fields that older clients send loosely typed:
//! ids as strings, booleans as `"1"` / `"true"`.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Bool(bool),
    Text(String),
}

fn int_from(loose: Loose) -> Result<i64, String> {
    match loose {
        Loose::Int(v) => Ok(v),
        Loose::Bool(_) => Err("expected an integer, got a boolean".into()),
        Loose::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("`{}` is not an integer", s)),
    }
}

pub fn i32_from_any<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = int_from(Loose::deserialize(deserializer)?).map_err(de::Error::custom)?;
    i32::try_from(raw).map_err(|_| de::Error::custom("integer out of range"))
}

pub fn vec_i32_from_any<'de, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Loose>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|l| {
            int_from(l)
                .and_then(|v| i32::try_from(v).map_err(|_| "integer out of range".to_string()))
                .map_err(de::Error::custom)
        })
        .collect()
}

pub fn bool_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => Ok(b),
        Loose::Int(0) => Ok(false),
        Loose::Int(1) => Ok(true),
        Loose::Int(v) => Err(de::Error::custom(format!("{} is not a boolean", v))),
        Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(de::Error::custom(format!("`{}` is not a boolean", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "i32_from_any")]
        id: i32,
        #[serde(deserialize_with = "bool_from_any")]
        flag: bool,
        #[serde(deserialize_with = "vec_i32_from_any")]
        ids: Vec<i32>,
    }

    #[test]
    fn accepts_loose_values() {
        let p: Probe =
            serde_json::from_str(r#"{"id":"42","flag":"1","ids":[1,"2"," 3 "]}"#).unwrap();
        assert_eq!(p.id, 42);
        assert!(p.flag);
        assert_eq!(p.ids, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(serde_json::from_str::<Probe>(r#"{"id":"x","flag":true,"ids":[]}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"id":1,"flag":"maybe","ids":[]}"#).is_err());
    }
}
