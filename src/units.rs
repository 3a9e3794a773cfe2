//! # Length Units
//!
//! Every length in the label schema is a decimal number with a unit
//! suffix. Internally everything is `f64` points.
//!
//! ```text
//! 1 in = 72 pt
//! 1 mm = 2.834645669 pt
//! ```

/// Points per millimeter
pub const MM_TO_PT: f64 = 2.834645669;

/// Points per inch
pub const IN_TO_PT: f64 = 72.0;

#[inline]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

#[inline]
pub fn pt_to_mm(pt: f64) -> f64 {
    pt / MM_TO_PT
}

#[inline]
pub fn in_to_pt(inches: f64) -> f64 {
    inches * IN_TO_PT
}

/// Parse a length such as `"12.5pt"`, `"3mm"`, `"0.5in"` or a bare `"12"`
/// (points) into points.
///
/// Returns `None` for anything else, callers attach the element path.
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    let (number, scale) = if let Some(n) = lower.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = lower.strip_suffix("mm") {
        (n, MM_TO_PT)
    } else if let Some(n) = lower.strip_suffix("in") {
        (n, IN_TO_PT)
    } else {
        (lower.as_str(), 1.0)
    };
    let parsed: f64 = number.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed * scale)
}

/// Format points as a schema length.
///
/// With `precision = None` the shortest decimal that parses back to the
/// identical `f64` is used, so formatted geometry round-trips exactly.
/// Integral values drop the decimal point and `-0` becomes `0`.
pub fn format_pt(value: f64, precision: Option<usize>) -> String {
    format!("{}pt", format_number(value, precision))
}

pub(crate) fn format_number(value: f64, precision: Option<usize>) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = match precision {
        None => format!("{value}"),
        Some(p) => {
            let fixed = format!("{value:.p$}");
            if fixed.contains('.') {
                fixed.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                fixed
            }
        }
    };
    if text == "-0" { "0".to_string() } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("12.5pt"), Some(12.5));
        assert_eq!(parse_length(" 2pt "), Some(2.0));
        assert_eq!(parse_length("1in"), Some(72.0));
        assert_eq!(parse_length("7"), Some(7.0));
        let mm = parse_length("10mm").unwrap();
        assert!(approx_eq!(f64, mm, 28.34645669, epsilon = 1e-9));
    }

    #[test]
    fn test_parse_length_rejects_garbage() {
        assert_eq!(parse_length(""), None);
        assert_eq!(parse_length("pt"), None);
        assert_eq!(parse_length("12px"), None);
        assert_eq!(parse_length("NaNpt"), None);
    }

    #[test]
    fn test_format_pt_shortest() {
        assert_eq!(format_pt(2.0, None), "2pt");
        assert_eq!(format_pt(5.6, None), "5.6pt");
        assert_eq!(format_pt(-0.0, None), "0pt");
        let third = 100.0 / 3.0;
        let text = format_pt(third, None);
        assert_eq!(parse_length(&text), Some(third));
    }

    #[test]
    fn test_format_pt_fixed_precision() {
        assert_eq!(format_pt(33.333333, Some(1)), "33.3pt");
        assert_eq!(format_pt(12.0, Some(2)), "12pt");
        assert_eq!(format_pt(-0.01, Some(1)), "0pt");
    }

    #[test]
    fn test_mm_round_trip() {
        let pt = mm_to_pt(24.0);
        assert!(approx_eq!(f64, pt_to_mm(pt), 24.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, in_to_pt(0.5), 36.0));
    }
}
