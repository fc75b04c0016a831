pub mod dashboard;
pub mod shop;

use crate::catalog::Category;

// ANSI color codes
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const RED: &str = "\x1b[31m";
pub const CYAN: &str = "\x1b[36m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const CLEAR_LINE: &str = "\x1b[2K";

pub fn category_color(category: Category) -> &'static str {
    match category {
        Category::Gpu => BLUE,
        Category::Asic => MAGENTA,
        Category::Pro => YELLOW,
    }
}

/// `1234567.891` -> `1,234,567.89`
pub fn money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    // sign of the rounded value, so -0.001 is plain 0.00
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}{}.{frac}", group_thousands(int))
}

/// Whole-number rendering with separators, for hash rates and watts.
pub fn count(value: f64) -> String {
    group_thousands(&format!("{:.0}", value.max(0.0)))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
