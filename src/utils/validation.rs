use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

/// Loose email check used for imported rows: something@something.tld.
pub fn is_plausible_email(value: &str) -> bool {
    email_regex().is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_email_pattern() {
        assert!(is_plausible_email("maria@agency.com"));
        assert!(is_plausible_email("a.b+c@x.co.uk"));
        assert!(!is_plausible_email("maria@agency"));
        assert!(!is_plausible_email("maria agency@x.com"));
        assert!(!is_plausible_email("@x.com"));
    }
}
