//! ISO code normalization shared by pricing and order creation.

pub const DEFAULT_COUNTRY_CODE: &str = "US";
pub const DEFAULT_CURRENCY_CODE: &str = "USD";

fn alpha_code(raw: &str, len: usize) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == len && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code)
    } else {
        None
    }
}

/// Returns the uppercase ISO-4217 code if `raw` looks like one.
pub fn resolve_currency_code(raw: Option<&str>) -> Option<String> {
    raw.and_then(|r| alpha_code(r, 3))
}

/// Like [`resolve_currency_code`] but falls back to `USD`.
pub fn normalize_currency_code(raw: Option<&str>) -> String {
    resolve_currency_code(raw).unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string())
}

/// Uppercase ISO-3166 alpha-2 code, falling back to `US`.
pub fn normalize_country_code(raw: Option<&str>) -> String {
    raw.and_then(|r| alpha_code(r, 2))
        .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_normalization() {
        assert_eq!(normalize_country_code(Some("ng")), "NG");
        assert_eq!(normalize_country_code(Some("  gb ")), "GB");
        assert_eq!(normalize_country_code(None), "US");
        assert_eq!(normalize_country_code(Some("")), "US");
        assert_eq!(normalize_country_code(Some("NGA")), "US");
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(normalize_currency_code(Some("ngn")), "NGN");
        assert_eq!(normalize_currency_code(Some(" eur ")), "EUR");
        assert_eq!(normalize_currency_code(None), "USD");
        assert_eq!(normalize_currency_code(Some("N1N")), "USD");
        assert_eq!(resolve_currency_code(Some("dollars")), None);
    }
}
