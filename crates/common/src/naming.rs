//! Label → identifier conversions.
//!
//! Element labels and plugin labels are human-facing strings ("Profile Link",
//! "IP-Address"). Everything that is looked up by name (input fields, persisted
//! properties, registry keys, transform keys) uses the snake-cased form.

/// Convert a human label into its canonical snake-case identifier.
///
/// Letters are lower-cased, every run of characters that is not alphanumeric
/// (spaces, dashes, underscores, punctuation) becomes a single `_`, and
/// leading/trailing separators are dropped.
///
/// ```
/// use sleuth_common::to_snake_case;
/// assert_eq!(to_snake_case("Profile Link"), "profile_link");
/// assert_eq!(to_snake_case("ip-address"), "ip_address");
/// ```
pub fn to_snake_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Convert a human label into an UpperCamelCase Rust type name.
///
/// A leading digit is prefixed with `_` so the result is always a valid
/// identifier. Returns an empty string when the label has no alphanumerics.
pub fn to_type_name(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for word in to_snake_case(label).split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Username", "username")]
    #[case("Profile Link", "profile_link")]
    #[case("profile_link", "profile_link")]
    #[case("IP-Address", "ip_address")]
    #[case("  Search  query ", "search_query")]
    #[case("result", "result")]
    #[case("Pages (max)", "pages_max")]
    #[case("", "")]
    fn snake_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_snake_case(input), expected);
    }

    #[test]
    fn snake_case_is_idempotent() {
        let once = to_snake_case("Google Cache Result");
        assert_eq!(to_snake_case(&once), once);
    }

    #[rstest]
    #[case("Google Result", "GoogleResult")]
    #[case("ip address", "IpAddress")]
    #[case("42 things", "_42Things")]
    #[case("---", "")]
    fn type_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_type_name(input), expected);
    }
}
