//! Display helpers for market caps and money inputs.

/// Compact rendering with `B`/`M` suffixes above a million; smaller values
/// are grouped with thousands separators.
pub fn format_large_number(num: f64, decimals: usize, currency: bool) -> String {
    let prefix = if currency { "$" } else { "" };
    let sign = if num < 0.0 { "-" } else { "" };
    let abs = num.abs();

    if abs >= 1_000_000_000.0 {
        return format!("{sign}{prefix}{:.decimals$}B", abs / 1_000_000_000.0);
    }
    if abs >= 1_000_000.0 {
        return format!("{sign}{prefix}{:.decimals$}M", abs / 1_000_000.0);
    }
    format!("{sign}{prefix}{}", group_number(abs))
}

/// Parses a money value as a user would type it (`$1,500,000`, `2_000`).
/// Blank input is `0`; anything else that is not a finite number is `None`.
pub fn parse_money_input(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn group_number(value: f64) -> String {
    let rounded = format!("{value:.3}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    match trimmed.split_once('.') {
        Some((integer, decimal)) => format!("{}.{decimal}", group_digits(integer)),
        None => group_digits(trimmed),
    }
}

fn group_digits(integer: &str) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
