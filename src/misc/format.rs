/// Round `value` to `places` decimal places.
#[must_use]
pub fn round(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Round `value` to a whole number and group its digits in thousands, as in `1,234,567`.
#[must_use]
#[expect(clippy::cast_possible_truncation, reason = "float to int casts saturate")]
pub fn comma(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
