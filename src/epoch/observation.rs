/// Width of one observation field: F14.3 value, LLI and SSI flags.
const FIELD_WIDTH: usize = 16;

/// Observation fields per RINEX2 record line
pub(crate) const RINEX2_FIELDS_PER_LINE: usize = 5;

/// Width of the value part of a field
const VALUE_WIDTH: usize = 14;

/// Decodes one observation field.
/// The fixed value slice is tried first, then the first whitespace
/// separated token of the whole field. Blank or undecodable fields are NaN.
pub(crate) fn decode_field(field: &str) -> f64 {
    let value = field.get(..VALUE_WIDTH.min(field.len())).unwrap_or(field);
    let value = value.trim();

    if value.is_empty() {
        return f64::NAN;
    }

    if let Ok(value) = value.parse::<f64>() {
        return value;
    }

    field
        .split_ascii_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Cuts the observation content of a record line into decoded fields.
/// A trailing partial field is decoded as well.
pub(crate) fn split_fields(content: &str) -> Vec<f64> {
    content
        .as_bytes()
        .chunks(FIELD_WIDTH)
        .map(|chunk| match std::str::from_utf8(chunk) {
            Ok(field) => decode_field(field),
            Err(_) => f64::NAN,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_decoding() {
        assert_eq!(decode_field("  23619095.450  "), 23619095.450);
        assert_eq!(decode_field("  23619095.450 7"), 23619095.450);
        assert_eq!(decode_field(" -53875.632 8  6"), -53875.632);
        assert_eq!(decode_field("        44.000  "), 44.0);
        assert!(decode_field("                ").is_nan());
        assert!(decode_field("").is_nan());

        // shifted content: value slice fails, token succeeds
        assert_eq!(decode_field(" 44.25 7        "), 44.25);
        assert_eq!(decode_field("1.5 e            "), 1.5);
        assert!(decode_field("   x.y          ").is_nan());
    }

    #[test]
    fn field_splitting() {
        let content = "  23619095.450 7 -53875.632 8  6        44.000";
        let fields = split_fields(content);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], 23619095.450);
        assert_eq!(fields[1], -53875.632);
        assert_eq!(fields[2], 44.0);

        let content = "                  -53875.632";
        let fields = split_fields(content);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].is_nan());
        assert_eq!(fields[1], -53875.632);

        assert!(split_fields("").is_empty());
    }
}
