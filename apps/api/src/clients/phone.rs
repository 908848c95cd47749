/// Normalizes a WhatsApp number to international digit form.
///
/// Drops every non-digit, then rewrites a leading `0` to the Indonesian
/// country code `62`. Length and country code are not checked.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix('0') {
        Some(rest) => format!("62{rest}"),
        None => digits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_format_with_dashes() {
        assert_eq!(normalize_phone("0812-345-6789"), "628123456789");
    }

    #[test]
    fn test_international_format_with_plus_and_spaces() {
        assert_eq!(normalize_phone("+62 812 345 6789"), "628123456789");
    }

    #[test]
    fn test_already_normalized_is_unchanged() {
        assert_eq!(normalize_phone("628123456789"), "628123456789");
    }

    #[test]
    fn test_only_first_zero_is_rewritten() {
        assert_eq!(normalize_phone("00812"), "620812");
    }

    #[test]
    fn test_malformed_input_passes_through() {
        assert_eq!(normalize_phone("(12) 34"), "1234");
        assert_eq!(normalize_phone("abc"), "");
    }
}
