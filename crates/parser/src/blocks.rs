use once_cell::sync::Lazy;
use regex::Regex;

/// Delimiters between cookie blocks in one pasted/uploaded batch: three or
/// more consecutive newlines, or runs of five or more `=` / `-` characters.
static BLOCK_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}|={5,}|-{5,}").expect("valid block delimiter pattern"));

/// Split raw batch text into trimmed, non-empty cookie blocks.
pub fn split_blocks(text: &str) -> Vec<String> {
    BLOCK_DELIMITER
        .split(text.trim())
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block_passes_through() {
        let blocks = split_blocks("NetflixId=abc; SecureNetflixId=xyz");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_triple_newline_splits() {
        let blocks = split_blocks("first=1\n\n\nsecond=2");
        assert_eq!(blocks, vec!["first=1", "second=2"]);
    }

    #[test]
    fn test_double_newline_does_not_split() {
        let blocks = split_blocks("first=1\n\nsecond=2");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_equals_and_dash_rules_split() {
        let blocks = split_blocks("first=1\n=====\nsecond=2\n-----\nthird=3");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2], "third=3");
    }

    #[test]
    fn test_empty_blocks_discarded() {
        let blocks = split_blocks("=====\n\n\n=====\nonly=1\n=====");
        assert_eq!(blocks, vec!["only=1"]);
    }

    #[test]
    fn test_blank_input_yields_no_blocks() {
        assert!(split_blocks("   \n\n  ").is_empty());
    }
}
