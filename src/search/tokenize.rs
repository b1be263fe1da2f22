/// Splits text into lowercase ASCII alphanumeric tokens
///
/// Every run of characters outside `[A-Za-z0-9]` acts as a single separator,
/// so accented letters and punctuation split words.
///
/// # Examples
///
/// ```
/// use forage::search::tokenize;
///
/// assert_eq!(tokenize("Crème-Brûlée, 2 pots!"), vec!["cr", "me", "br", "l", "e", "2", "pots"]);
/// assert!(tokenize(" -- ").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases() {
        assert_eq!(tokenize("Apple JUICE"), vec!["apple", "juice"]);
    }

    #[test]
    fn test_punctuation_runs_collapse() {
        assert_eq!(tokenize("sugar,,  salt\t&fat"), vec!["sugar", "salt", "fat"]);
    }

    #[test]
    fn test_digits_kept() {
        assert_eq!(tokenize("E330 100g"), vec!["e330", "100g"]);
    }

    #[test]
    fn test_empty() {
        assert!(tokenize("").is_empty());
    }
}
