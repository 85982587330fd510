pub mod pdf;

pub use pdf::{render_revenue_pdf, REPORT_FILENAME};

// Rounded to whole rupiah.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if negative {
        format!("-{out}")
    } else {
        out
    }
}

pub fn format_rupiah(amount: f64) -> String {
    format!("Rp {}", format_amount(amount))
}
