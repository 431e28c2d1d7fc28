/// Collapse the whitespace of a translation block into single spaces.
///
/// Every line is trimmed, lines left empty are dropped, and the remainder is
/// joined with one space. Indentation changes in a template therefore never
/// change the resulting message id.
pub fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "")]
    #[case("    ", "")]
    #[case("  \n\t\r\n   ", "")]
    #[case("foo", "foo")]
    #[case("   foo   ", "foo")]
    #[case("   foo\n    bar", "foo bar")]
    #[case("\n  foo\n\n\n  bar  \n", "foo bar")]
    #[case("a  b\n c", "a  b c")]
    fn test_collapse_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(collapse_whitespace(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   foo\n    bar")]
    #[case("\r\n  There is\n    %(num)s thing.\n  ")]
    fn test_collapse_whitespace_is_idempotent(#[case] input: &str) {
        let once = collapse_whitespace(input);
        assert_eq!(collapse_whitespace(&once), once);
    }
}
