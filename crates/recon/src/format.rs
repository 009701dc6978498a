//! Currency rendering for chat replies.

/// Group an integer string's digits in thousands: `1234567` → `1,234,567`.
pub fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{sign}{out}")
}

/// Symbol-prefixed amount with thousands grouping and no decimals.
/// Negative values keep the sign after the symbol (`₹-1,234`).
pub fn format_currency(symbol: &str, value: f64) -> String {
    let rounded = value.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{symbol}{}", group_thousands(&format!("{:.0}", rounded)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("-1234"), "-1,234");
        assert_eq!(group_thousands("-123"), "-123");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency("₹", 700.0), "₹700");
        assert_eq!(format_currency("₹", 125000.4), "₹125,000");
        assert_eq!(format_currency("₹", -1234.0), "₹-1,234");
        assert_eq!(format_currency("$", -0.2), "$0");
        assert_eq!(format_currency("₹", 0.0), "₹0");
    }
}
