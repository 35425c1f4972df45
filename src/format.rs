/// `value` is already a percentage (0..100).
pub fn format_percentage(value: f64, fraction_digits: usize) -> String {
    format!("{:.*}%", fraction_digits, value)
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Escapes text for use inside tooltip HTML.
pub fn encode_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages() {
        assert_eq!(format_percentage(40.0, 2), "40.00%");
        assert_eq!(format_percentage(66.666, 2), "66.67%");
        assert_eq!(format_percentage(50.0, 0), "50%");
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to_hundredths(12.345_6), 12.35);
        assert_eq!(round_to_hundredths(80.0), 80.0);
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(encode_html("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(encode_html("src.main.App"), "src.main.App");
    }
}
