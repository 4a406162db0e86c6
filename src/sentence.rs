//! Lexical layer for NMEA 0183 sentences: integrity checking, field
//! splitting, and the degrees-minutes coordinate encoding.
//!
//! Everything here is failure-tolerant by contract. Garbage input yields
//! `false` or a zero default; nothing at this layer returns an error.

/// Verify a sentence's checksum.
///
/// A sentence is valid only if a `$` appears before a `*` and the XOR of
/// every byte strictly between them equals the two hex digits that follow
/// the `*`. Missing or mis-ordered markers, a truncated tail, or non-hex
/// digits all report as invalid. An empty payload XORs to zero and is still
/// compared against the provided digits.
pub fn validate_checksum(sentence: &str) -> bool {
    let Some(start) = sentence.find('$') else {
        return false;
    };
    let Some(tail) = sentence.find('*') else {
        return false;
    };
    if tail < start {
        return false;
    }

    let mut computed: u8 = 0;
    for byte in &sentence.as_bytes()[start + 1..tail] {
        computed ^= byte;
    }

    // Exactly two hex digits must follow the asterisk.
    let Some(provided_hex) = sentence.get(tail + 1..tail + 3) else {
        return false;
    };
    match u8::from_str_radix(provided_hex, 16) {
        Ok(provided) => computed == provided,
        Err(_) => false,
    }
}

/// Split a sentence into fields on the given delimiter.
///
/// Empty fields are preserved, including a trailing one: several sentence
/// layouts convey "field omitted" as an empty slot whose position still
/// matters for the fields after it.
pub fn tokenize(sentence: &str, delimiter: char) -> Vec<&str> {
    sentence.split(delimiter).collect()
}

/// Convert a `DDMM.MMMM` (latitude) or `DDDMM.MMMM` (longitude) field plus
/// hemisphere letter into signed decimal degrees.
///
/// The two digits before the decimal point and everything after it are
/// minutes; whatever precedes them is whole degrees. South and west are
/// negative. Empty or malformed input yields 0.0.
pub fn to_decimal_degrees(field: &str, hemisphere: &str) -> f64 {
    if field.is_empty() {
        return 0.0;
    }
    let Some(point) = field.find('.') else {
        return 0.0;
    };
    // A decimal point earlier than index 2 leaves no room for the minutes.
    if point < 2 {
        return 0.0;
    }

    let (degrees_str, minutes_str) = field.split_at(point - 2);
    let degrees = lenient_f64(degrees_str);
    let minutes = lenient_f64(minutes_str);

    let mut value = degrees + minutes / 60.0;
    if matches!(hemisphere, "S" | "W") {
        value = -value;
    }

    // Normalize -0.0 so a zero coordinate has no hemisphere ambiguity.
    if value == 0.0 { 0.0 } else { value }
}

/// Parse a float field, defaulting to 0.0 on malformed digits.
pub fn lenient_f64(field: &str) -> f64 {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Parse an integer field, defaulting to 0 on malformed digits.
pub fn lenient_u32(field: &str) -> u32 {
    field.trim().parse::<u32>().unwrap_or(0)
}
