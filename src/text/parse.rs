//! Dimension parsing for corrected recognizer output.
//!
//! Handwritten entries look like `12x5x3`: fields separated by an "x", with
//! the decimal point usually missing. Each field is split into dimension
//! tokens by a fixed left-to-right scan, where an explicit point is trusted
//! and otherwise digits are paired as integer part and fraction.

/// One inferred numeric field, e.g. "1.2" or "5"
pub type DimensionToken = String;

/// Tokens parsed from one corrected string
pub type ParsedLine = Vec<DimensionToken>;

/// Parse each corrected string into its dimension tokens.
///
/// Returns one `ParsedLine` per input string; an empty input string yields an
/// empty line and an empty slice yields an empty result.
pub fn parse<S: AsRef<str>>(texts: &[S]) -> Vec<ParsedLine> {
    texts.iter().map(|t| parse_line(t.as_ref())).collect()
}

/// Parse a single corrected string
pub fn parse_line(text: &str) -> ParsedLine {
    split_fields(text)
        .iter()
        .flat_map(|field| infer_decimals(field))
        .collect()
}

/// Split on "x" or "X", dropping empty fields
fn split_fields(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut buffer = String::new();

    for c in text.chars() {
        if c.eq_ignore_ascii_case(&'x') {
            if !buffer.is_empty() {
                fields.push(std::mem::take(&mut buffer));
            }
        } else {
            buffer.push(c);
        }
    }
    if !buffer.is_empty() {
        fields.push(buffer);
    }

    fields
}

/// Decide where decimal points belong in one field
fn infer_decimals(field: &str) -> Vec<DimensionToken> {
    let chars: Vec<char> = field.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();

        if next == Some('.') {
            // Explicit point: keep "d.d" as written
            let end = (i + 3).min(chars.len());
            tokens.push(chars[i..end].iter().collect());
            i += 3;
        } else if after == Some('.') {
            // Lone digit before a later point is a whole number
            tokens.push(format!("{}.0", chars[i]));
            i += 1;
        } else if let Some(fraction) = next {
            tokens.push(format!("{}.{}", chars[i], fraction));
            i += 2;
        } else {
            tokens.push(chars[i].to_string());
            i += 1;
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tokens: &[&str]) -> ParsedLine {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_digit_pairs_get_implied_point() {
        assert_eq!(parse_line("125"), line(&["1.2", "5"]));
        assert_eq!(parse_line("1234"), line(&["1.2", "3.4"]));
    }

    #[test]
    fn test_explicit_point_is_trusted() {
        assert_eq!(parse_line("1.25"), line(&["1.2", "5"]));
        assert_eq!(parse_line("7.0"), line(&["7.0"]));
    }

    #[test]
    fn test_lone_digit_before_point_is_whole() {
        // "3" sees "." two places ahead, then "4.5" is taken as written
        assert_eq!(parse_line("34.5"), line(&["3.0", "4.5"]));
    }

    #[test]
    fn test_splits_on_either_case_of_x() {
        assert_eq!(parse_line("12x5x3"), line(&["1.2", "5", "3"]));
        assert_eq!(parse_line("12X5"), line(&["1.2", "5"]));
    }

    #[test]
    fn test_repeated_and_edge_delimiters_are_skipped() {
        assert_eq!(parse_line("x12xx5x"), line(&["1.2", "5"]));
        assert_eq!(parse_line("xxx"), ParsedLine::new());
    }

    #[test]
    fn test_trailing_point_is_truncated() {
        assert_eq!(parse_line("1."), line(&["1."]));
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(parse(&none).is_empty());
        assert_eq!(parse(&[""]), vec![ParsedLine::new()]);
    }

    #[test]
    fn test_one_line_per_input_string() {
        let parsed = parse(&["125", "", "7"]);
        assert_eq!(parsed, vec![line(&["1.2", "5"]), ParsedLine::new(), line(&["7"])]);
    }

    #[test]
    fn test_multibyte_characters_do_not_split_bytes() {
        assert_eq!(parse_line("1°5"), line(&["1.°", "5"]));
    }
}
