//! Element type version codes.

/// Code given to a freshly created element type.
pub const INITIAL_VERSION: &str = "V1";

/// Derives the code that follows `current`.
///
/// A trailing number is incremented in place (`V3` -> `V4`, `R-09` -> `R-10`).
/// Codes without a numeric suffix are legacy values and get `-V1` appended.
pub fn next_version_code(current: &str) -> String {
    let current = current.trim();
    if current.is_empty() {
        return INITIAL_VERSION.to_string();
    }

    let digits_start = current
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx);

    match digits_start {
        Some(idx) => {
            let (prefix, digits) = current.split_at(idx);
            match digits.parse::<u64>() {
                Ok(n) => {
                    let next = (n + 1).to_string();
                    let padded = if next.len() < digits.len() {
                        format!("{:0>width$}", next, width = digits.len())
                    } else {
                        next
                    };
                    format!("{}{}", prefix, padded)
                }
                // Too many digits to fit; start a fresh suffix.
                Err(_) => format!("{}-V1", current),
            }
        }
        None => format!("{}-V1", current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("V1", "V2")]
    #[case("V9", "V10")]
    #[case("R-09", "R-10")]
    #[case("LEGACY", "LEGACY-V1")]
    #[case("LEGACY-V1", "LEGACY-V2")]
    #[case("", "V1")]
    fn derives_next_code(#[case] current: &str, #[case] expected: &str) {
        assert_eq!(next_version_code(current), expected);
    }

    #[test]
    fn codes_are_always_fresh() {
        let mut code = INITIAL_VERSION.to_string();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            assert!(seen.insert(code.clone()));
            code = next_version_code(&code);
        }
    }
}
