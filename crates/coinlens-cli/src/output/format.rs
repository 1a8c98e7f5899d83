use coinlens_core::UtcDateTime;
use time::format_description::BorrowedFormatItem;

/// `$81,237` at or above 1000, `$2.53` at or above 1, `$0.1067` below.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return String::from("$0.00");
    }

    if price >= 1_000.0 {
        return format!("${}", group_thousands(&format!("{price:.0}")));
    }
    if price >= 1.0 {
        return format!("${price:.2}");
    }
    format!("${price:.4}")
}

/// Price with an explicit sign, for gains and losses: `+$1,200`, `-$35.10`.
pub fn format_signed_price(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "+" };
    format!("{sign}{}", format_price(value.abs()))
}

/// `$1.62T`, `$56.51B`, `$36.35M`; smaller values format as prices.
pub fn format_large_number(value: f64) -> String {
    if !value.is_finite() {
        return String::from("$0");
    }

    if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else {
        format_price(value)
    }
}

pub fn format_percentage(change: f64) -> String {
    if !change.is_finite() {
        return String::from("0.00%");
    }

    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{sign}{change:.2}%")
}

const TIME_FORMAT: &[BorrowedFormatItem<'static>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]"
);

pub fn format_time(timestamp: UtcDateTime) -> String {
    timestamp
        .into_inner()
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| timestamp.format_rfc3339())
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push_str(sign);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
