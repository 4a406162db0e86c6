//! Sentence dispatch: map a validated line to its handler and decode the
//! fields into a [`Fix`].
//!
//! The handler set is closed; adding a sentence type means adding a variant
//! here and nothing else. Field decoding is positional and tolerant: a short
//! token list or a garbled numeric field leaves that field at its zero
//! default without invalidating the sentence.

use crate::fix::{Fix, FixQuality, RawLine};
use crate::sentence::{lenient_f64, lenient_u32, to_decimal_degrees, tokenize, validate_checksum};

const FIELD_DELIMITER: char = ',';

/// Handler variants, keyed by the sentence's leading tag token.
enum SentenceHandler {
    /// `$GPGGA`: essential fix data (position, quality, satellites, altitude)
    Gga,
    /// `$GPRMC`: recommended minimum (position, speed, course, date)
    Rmc,
}

impl SentenceHandler {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "$GPGGA" => Some(SentenceHandler::Gga),
            "$GPRMC" => Some(SentenceHandler::Rmc),
            _ => None,
        }
    }

    fn decode(&self, tokens: &[&str], fix: &mut Fix) {
        match self {
            SentenceHandler::Gga => decode_gga(tokens, fix),
            SentenceHandler::Rmc => decode_rmc(tokens, fix),
        }
    }
}

/// Decode one raw line into a [`Fix`].
///
/// Checksum failure, an unrecognized tag, or an empty token list all yield
/// an invalid fix; no partial decode is ever exposed for those lines.
pub fn parse(line: &RawLine) -> Fix {
    let mut fix = Fix::invalid(line);

    if !validate_checksum(&line.text) {
        return fix;
    }

    let tokens = tokenize(&line.text, FIELD_DELIMITER);
    if tokens.is_empty() {
        return fix;
    }

    let Some(handler) = SentenceHandler::from_tag(tokens[0]) else {
        return fix;
    };

    fix.sentence_type = tokens[0].trim_start_matches('$').to_string();
    handler.decode(&tokens, &mut fix);
    fix.is_valid = true;
    fix
}

/// Field access that treats everything past the end of a short sentence as
/// an omitted (empty) field.
fn field<'a>(tokens: &[&'a str], index: usize) -> &'a str {
    tokens.get(index).copied().unwrap_or("")
}

/// Reject a converted coordinate that left its valid range; the field falls
/// back to its zero default like any other garbled field.
fn within(value: f64, limit: f64) -> f64 {
    if value.abs() > limit { 0.0 } else { value }
}

fn decode_gga(tokens: &[&str], fix: &mut Fix) {
    fix.timestamp_raw = field(tokens, 1).to_string();
    fix.latitude = within(to_decimal_degrees(field(tokens, 2), field(tokens, 3)), 90.0);
    fix.longitude = within(to_decimal_degrees(field(tokens, 4), field(tokens, 5)), 180.0);
    fix.fix_quality = FixQuality::from_code(lenient_u32(field(tokens, 6)));
    fix.satellite_count = lenient_u32(field(tokens, 7));
    fix.altitude_meters = lenient_f64(field(tokens, 9));
}

fn decode_rmc(tokens: &[&str], fix: &mut Fix) {
    fix.timestamp_raw = field(tokens, 1).to_string();
    // "A" is active, "V" is void. A void sentence is still structurally
    // valid; it just reports no fix quality.
    fix.fix_quality = if field(tokens, 2) == "A" {
        FixQuality::Gps
    } else {
        FixQuality::None
    };
    fix.latitude = within(to_decimal_degrees(field(tokens, 3), field(tokens, 4)), 90.0);
    fix.longitude = within(to_decimal_degrees(field(tokens, 5), field(tokens, 6)), 180.0);
    fix.speed_knots = lenient_f64(field(tokens, 7));
    fix.course_degrees = lenient_f64(field(tokens, 8));
    fix.date_raw = field(tokens, 9).to_string();
}
