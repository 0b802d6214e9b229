//! Human-readable requisition number allocation.

/// Computes the next `R-<n>` label from the numbers already in the store:
/// strip non-digits, take the maximum (floor 1000 when nothing parses), add
/// one. Must only be called while holding the store's write lock, otherwise
/// two concurrent creations could be handed the same number. Gaps after
/// deletions are expected; numbers are never reused.
pub fn next_requisition_number<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut max = 1000u64;
    for number in existing {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(value) = digits.parse::<u64>() {
            if value > max {
                max = value;
            }
        }
    }
    format!("R-{}", max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_starts_above_the_floor() {
        assert_eq!(next_requisition_number([]), "R-1001");
    }

    #[test]
    fn junk_numbers_fall_back_to_the_floor() {
        assert_eq!(next_requisition_number(["draft", "R-", ""]), "R-1001");
    }

    #[test]
    fn takes_the_maximum_not_the_latest() {
        assert_eq!(
            next_requisition_number(["R-1005", "R-1040", "R-1012"]),
            "R-1041"
        );
    }

    #[test]
    fn non_digit_characters_are_stripped() {
        assert_eq!(next_requisition_number(["REQ 1050-b"]), "R-1051");
        assert_eq!(next_requisition_number(["R-1050"]), "R-1051");
    }

    #[test]
    fn allocation_is_strictly_increasing() {
        let mut numbers: Vec<String> = Vec::new();
        for _ in 0..50 {
            let next = next_requisition_number(numbers.iter().map(String::as_str));
            assert!(!numbers.contains(&next));
            numbers.push(next);
        }
        let parsed: Vec<u64> = numbers
            .iter()
            .map(|n| n.trim_start_matches("R-").parse().unwrap())
            .collect();
        assert!(parsed.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(parsed[0] > 1000);
    }
}
