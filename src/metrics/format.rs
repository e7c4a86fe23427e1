//! Display formatting for token metrics.

const SUBSCRIPT_DIGITS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

/// Significant digits kept after the zero run in compact prices.
const COMPACT_SIGNIFICANT_DIGITS: usize = 4;

/// `$1.23K`, `$4.56M`, `$7.89B`; plain two decimals below a thousand.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    let body = if abs >= 1e9 {
        format!("{:.2}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", abs / 1e3)
    } else {
        format!("{:.2}", abs)
    };
    format!("{}${}", sign, body)
}

/// Percentage with a fixed number of decimals.
pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{:.*}%", decimals, 0.0);
    }
    format!("{:.*}%", decimals, value)
}

/// Signed percentage change, e.g. `+12.5%` / `-3.1%`.
pub fn format_change(value: f64) -> String {
    if !value.is_finite() {
        return "0.0%".to_string();
    }
    if value > 0.0 {
        format!("+{:.1}%", value)
    } else {
        format!("{:.1}%", value)
    }
}

/// Price in dollars; sub-cent prices use subscript-zero notation so
/// `0.00001234` renders as `$0.0₄1234`.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price <= 0.0 {
        return "$0".to_string();
    }
    if price >= 1.0 {
        return format!("${:.2}", price);
    }
    if price >= 0.01 {
        return format!("${:.4}", price);
    }

    let fixed = format!("{:.18}", price);
    let fraction = fixed.split_once('.').map(|(_, f)| f).unwrap_or("");
    let zeros = fraction.chars().take_while(|c| *c == '0').count();
    let digits: String = fraction
        .chars()
        .skip(zeros)
        .take(COMPACT_SIGNIFICANT_DIGITS)
        .collect();
    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        return "$0".to_string();
    }
    format!("$0.0{}{}", subscript(zeros), digits)
}

/// Holder counts and other integers with thousands separators.
pub fn format_count(value: u64) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn subscript(n: usize) -> String {
    n.to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| SUBSCRIPT_DIGITS[d as usize])
        .collect()
}
