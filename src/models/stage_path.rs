use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagePathError {
    #[error("stage path is empty")]
    Empty,
    #[error("stage path entry `{0}` is not a stage id")]
    BadEntry(String),
    #[error("stage {0} appears more than once in the stage path")]
    Duplicate(i32),
}

/// Ordered production stages of an element type. Never empty.
///
/// Stored as `{s1,s2,...}`; the first entry is the entry stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct StagePath(Vec<i32>);

impl StagePath {
    pub fn new(stages: Vec<i32>) -> Result<Self, StagePathError> {
        if stages.is_empty() {
            return Err(StagePathError::Empty);
        }
        for (idx, stage) in stages.iter().enumerate() {
            if stages[..idx].contains(stage) {
                return Err(StagePathError::Duplicate(*stage));
            }
        }
        Ok(Self(stages))
    }

    /// Parses the brace form. Surrounding whitespace and a bare
    /// comma list without braces are tolerated.
    pub fn parse(raw: &str) -> Result<Self, StagePathError> {
        let inner = raw
            .trim()
            .trim_start_matches(['{', '['])
            .trim_end_matches(['}', ']']);
        if inner.trim().is_empty() {
            return Err(StagePathError::Empty);
        }
        let stages = inner
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<i32>()
                    .map_err(|_| StagePathError::BadEntry(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stages)
    }

    pub fn first(&self) -> i32 {
        self.0[0]
    }

    pub fn last(&self) -> i32 {
        self.0[self.0.len() - 1]
    }

    /// Stage that follows `current`, `None` after the last one or when
    /// `current` is not on the path.
    pub fn next(&self, current: i32) -> Option<i32> {
        let idx = self.position(current)?;
        self.0.get(idx + 1).copied()
    }

    pub fn contains(&self, stage: i32) -> bool {
        self.0.contains(&stage)
    }

    pub fn position(&self, stage: i32) -> Option<usize> {
        self.0.iter().position(|s| *s == stage)
    }

    pub fn stages(&self) -> &[i32] {
        &self.0
    }

    /// Brace form written to the `stage_path` column.
    pub fn to_storage(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{{{}}}", joined)
    }
}

impl TryFrom<Vec<i32>> for StagePath {
    type Error = StagePathError;

    fn try_from(value: Vec<i32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StagePath> for Vec<i32> {
    fn from(value: StagePath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brace_form() {
        let path = StagePath::parse("{76,75,74,73,77}").unwrap();
        assert_eq!(path.stages(), &[76, 75, 74, 73, 77]);
        assert_eq!(path.first(), 76);
        assert_eq!(path.last(), 77);
        assert_eq!(path.next(76), Some(75));
        assert_eq!(path.next(77), None);
        assert_eq!(path.next(1), None);
        assert!(path.contains(73));
        assert!(!path.contains(1));
    }

    #[test]
    fn tolerates_whitespace_and_bare_lists() {
        assert_eq!(
            StagePath::parse(" { 1, 2 ,3 } ").unwrap().stages(),
            &[1, 2, 3]
        );
        assert_eq!(StagePath::parse("4,5").unwrap().stages(), &[4, 5]);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(StagePath::parse("{}"), Err(StagePathError::Empty));
        assert_eq!(StagePath::parse(""), Err(StagePathError::Empty));
        assert_eq!(
            StagePath::parse("{1,x}"),
            Err(StagePathError::BadEntry("x".into()))
        );
        assert_eq!(
            StagePath::parse("{1,2,1}"),
            Err(StagePathError::Duplicate(1))
        );
    }

    #[test]
    fn serde_rejects_empty_arrays() {
        assert!(serde_json::from_str::<StagePath>("[]").is_err());
        let path: StagePath = serde_json::from_str("[3,2]").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), "[3,2]");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_path() -> impl Strategy<Value = StagePath> {
        proptest::collection::hash_set(1i32..10_000, 1..12)
            .prop_map(|set| StagePath::new(set.into_iter().collect()).unwrap())
    }

    proptest! {
        #[test]
        fn storage_form_round_trips(path in arb_path()) {
            prop_assert_eq!(StagePath::parse(&path.to_storage()).unwrap(), path);
        }

        #[test]
        fn walking_next_visits_every_stage_once(path in arb_path()) {
            let mut seen = vec![path.first()];
            let mut cur = path.first();
            while let Some(n) = path.next(cur) {
                seen.push(n);
                cur = n;
            }
            prop_assert_eq!(seen.as_slice(), path.stages());
            prop_assert_eq!(cur, path.last());
        }
    }
}
