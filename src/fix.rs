use chrono::{DateTime, Utc};
use serde::Serialize;

/// One raw sentence pulled off a source, tagged with its provenance.
///
/// The receive time is captured when the line is taken off the wire, so a
/// line that sits in the hand-off queue keeps its true arrival time.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Identifier of the source that produced this line
    pub source_id: String,
    /// The sentence text, without trailing line terminator
    pub text: String,
    /// When the line was read from the source
    pub received_at: DateTime<Utc>,
}

impl RawLine {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Quality of a position fix as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixQuality {
    /// No fix, or an inactive/void sentence
    #[default]
    None,
    /// Standard GPS fix
    Gps,
    /// Differential GPS fix
    Dgps,
}

impl FixQuality {
    /// Map a GGA quality indicator code. Codes outside the supported set
    /// (and unparseable fields) report as no fix.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => FixQuality::Gps,
            2 => FixQuality::Dgps,
            _ => FixQuality::None,
        }
    }
}

/// A decoded position fix.
///
/// This is the main domain entity for position updates, agnostic to source
/// (UDP, replay file) and destination (display, track log, broadcast).
/// An invalid fix carries zero defaults in every numeric field and means
/// only "this line did not decode".
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Identifier of the source the sentence arrived on
    pub source_id: String,
    /// Sentence tag without the leading `$`, e.g. "GPGGA"
    pub sentence_type: String,
    /// True only when the checksum passed and the tag was recognized
    pub is_valid: bool,
    /// When the underlying line was read from its source
    pub received_at: DateTime<Utc>,
    /// UTC time field exactly as it appeared in the sentence (hhmmss.sss)
    pub timestamp_raw: String,
    /// Date field exactly as it appeared in the sentence (DDMMYY)
    pub date_raw: String,
    /// Signed decimal degrees, south negative
    pub latitude: f64,
    /// Signed decimal degrees, west negative
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude_meters: f64,
    pub fix_quality: FixQuality,
    /// Number of satellites in use
    pub satellite_count: u32,
    /// Speed over ground in knots
    pub speed_knots: f64,
    /// Track angle in degrees true
    pub course_degrees: f64,
}

impl Fix {
    /// An undecodable line: provenance and receive time are kept, every
    /// data field stays at its zero default.
    pub fn invalid(line: &RawLine) -> Self {
        Self {
            source_id: line.source_id.clone(),
            sentence_type: String::new(),
            is_valid: false,
            received_at: line.received_at,
            timestamp_raw: String::new(),
            date_raw: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            altitude_meters: 0.0,
            fix_quality: FixQuality::None,
            satellite_count: 0,
            speed_knots: 0.0,
            course_degrees: 0.0,
        }
    }

    /// Wire view handed to persistence and broadcast consumers.
    pub fn wire(&self) -> WireFix<'_> {
        WireFix {
            kind: &self.sentence_type,
            timestamp: &self.timestamp_raw,
            is_valid: self.is_valid,
            lat: self.latitude,
            lon: self.longitude,
            speed: self.speed_knots,
            course: self.course_degrees,
            sats: self.satellite_count,
            alt: self.altitude_meters,
        }
    }

    /// Serialize the wire view as a single JSON object.
    pub fn to_wire_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.wire())
    }
}

/// Serialized fix representation consumed by the track log and broadcast
/// sinks. The key set is a stable external contract; internal fields such as
/// the source id never appear here.
#[derive(Debug, Serialize)]
pub struct WireFix<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub timestamp: &'a str,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub course: f64,
    pub sats: u32,
    pub alt: f64,
}
