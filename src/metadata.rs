use chrono::{NaiveDate, NaiveTime};

use crate::keywords::KeywordMap;

/// Declared byte order of the DATA segment ($BYTEORD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Declared on-disk representation of the DATA segment ($DATATYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRepresentation {
    /// Packed integers of per-channel bit width.
    PackedInteger,
    /// 32-bit IEEE floats.
    Float,
    /// 64-bit IEEE doubles.
    Double,
    /// Fixed-width ASCII decimal digits.
    Ascii,
}

/// One measurement parameter. The per-channel vectors in [`Metadata`] are
/// parallel-indexed; every channel is built from the `$Pn*` keyword family
/// for its 1-based index.
#[derive(Debug, Default, Clone)]
pub struct Channel {
    pub short_name: String,
    pub long_name: String,
    pub bits: usize,
    pub range: f64,
    pub gain: f64,
    pub amplifier: String,
    pub is_log: bool,
    pub display_log: bool,
    pub voltage: f64,
}

/// Typed document metadata extracted from the keyword mapping.
#[derive(Debug, Default, Clone)]
pub struct Metadata {
    pub parameters: usize,
    pub declared_events: usize,
    /// Declared event count clamped by the actual DATA payload size.
    pub events: usize,
    pub byte_order: Endianness,
    pub representation: Option<DataRepresentation>,
    pub datatype_tag: String,
    pub channels: Vec<Channel>,
    pub cytometer: String,
    pub source_file: String,
    pub acquisition_date: Option<NaiveDate>,
    pub acquisition_begin: Option<NaiveTime>,
    pub acquisition_end: Option<NaiveTime>,
}

impl Default for Endianness {
    fn default() -> Endianness {
        Endianness::Little
    }
}

pub fn keyword_str<'a>(keywords: &'a KeywordMap, key: &str) -> Option<&'a str> {
    keywords.get(key)
}

/// Numeric keyword lookup with the degrade-to-default policy: absence or a
/// parse failure yields `default`, never an error.
pub fn keyword_f64(keywords: &KeywordMap, key: &str, default: f64) -> f64 {
    keywords
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

pub fn keyword_usize(keywords: &KeywordMap, key: &str, default: usize) -> usize {
    keywords
        .get(key)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

pub fn keyword_u64(keywords: &KeywordMap, key: &str, default: u64) -> u64 {
    keywords
        .get(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_byte_order(keywords: &KeywordMap) -> Endianness {
    match keywords.get("$BYTEORD").map(str::trim) {
        Some("4,3,2,1") | Some("2,1") => Endianness::Big,
        _ => Endianness::Little,
    }
}

fn parse_representation(tag: &str) -> Option<DataRepresentation> {
    match tag.trim().to_ascii_uppercase().as_str() {
        "I" => Some(DataRepresentation::PackedInteger),
        "F" => Some(DataRepresentation::Float),
        "D" => Some(DataRepresentation::Double),
        "A" => Some(DataRepresentation::Ascii),
        _ => None,
    }
}

/// A channel amplifies logarithmically when the first comma-separated
/// component of its $PnE spec is a positive decade count.
fn derive_is_log(amplifier: &str) -> bool {
    amplifier
        .split(',')
        .next()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|decades| decades > 0.0)
        .unwrap_or(false)
}

fn extract_channel(keywords: &KeywordMap, index: usize) -> Channel {
    let short_name = keywords
        .get(&format!("$P{}N", index))
        .map(str::to_string)
        .unwrap_or_else(|| format!("P{}", index));
    let long_name = keywords
        .get(&format!("$P{}S", index))
        .map(str::to_string)
        .unwrap_or_else(|| short_name.clone());
    let amplifier = keywords
        .get(&format!("$P{}E", index))
        .unwrap_or("")
        .to_string();
    let display_log = keywords
        .get(&format!("P{}DISPLAY", index))
        .map(|v| v.trim().eq_ignore_ascii_case("LOG"))
        .unwrap_or(false);

    Channel {
        bits: keyword_usize(keywords, &format!("$P{}B", index), 0),
        range: keyword_f64(keywords, &format!("$P{}R", index), 0.0),
        gain: keyword_f64(keywords, &format!("$P{}G", index), 1.0),
        is_log: derive_is_log(&amplifier),
        voltage: keyword_f64(keywords, &format!("$P{}V", index), 0.0),
        short_name,
        long_name,
        amplifier,
        display_log,
    }
}

fn parse_date(keywords: &KeywordMap) -> Option<NaiveDate> {
    let value = keywords.get("$DATE")?;
    NaiveDate::parse_from_str(value.trim(), "%d-%b-%Y").ok()
}

fn parse_time(keywords: &KeywordMap, key: &str) -> Option<NaiveTime> {
    let value = keywords.get(key)?;
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S%.f").ok()
}

/// Build typed metadata from the raw keyword mapping.
///
/// `data_len` is the DATA segment's byte length; with a known positive
/// bits-per-event it clamps a declared $TOT that overstates the actual
/// payload.
pub fn extract_metadata(keywords: &KeywordMap, data_len: usize) -> Metadata {
    let parameters = keyword_usize(keywords, "$PAR", 0);
    let declared_events = keyword_usize(keywords, "$TOT", 0);
    let datatype_tag = keywords.get("$DATATYPE").unwrap_or("").trim().to_string();

    let channels: Vec<Channel> = (1..=parameters)
        .map(|index| extract_channel(keywords, index))
        .collect();

    let bits_per_event: usize = channels.iter().map(|c| c.bits).sum();
    let events = if bits_per_event > 0 {
        let payload_events = (data_len as u64 * 8 / bits_per_event as u64) as usize;
        if payload_events < declared_events {
            log::debug!(
                "declared $TOT {} exceeds payload capacity {}, clamping",
                declared_events,
                payload_events
            );
        }
        declared_events.min(payload_events)
    } else {
        declared_events
    };

    Metadata {
        parameters,
        declared_events,
        events,
        byte_order: parse_byte_order(keywords),
        representation: parse_representation(&datatype_tag),
        datatype_tag,
        channels,
        cytometer: keywords.get("$CYT").unwrap_or("").to_string(),
        source_file: keywords.get("$FIL").unwrap_or("").to_string(),
        acquisition_date: parse_date(keywords),
        acquisition_begin: parse_time(keywords, "$BTIM"),
        acquisition_end: parse_time(keywords, "$ETIM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::parse_keywords;

    fn keywords(text: &str) -> KeywordMap {
        parse_keywords(text.as_bytes())
    }

    #[test]
    fn extracts_typed_channel_fields() {
        let kv = keywords(
            "/$PAR/2/$TOT/100/$DATATYPE/I/$BYTEORD/4,3,2,1\
             /$P1N/FSC-A/$P1S/Forward Scatter/$P1B/16/$P1R/1024/$P1E/0,0/$P1V/450\
             /$P2N/FL1-A/$P2B/16/$P2R/1024/$P2E/4,1/P2DISPLAY/LOG/",
        );
        let meta = extract_metadata(&kv, 100 * 4);
        assert_eq!(meta.parameters, 2);
        assert_eq!(meta.byte_order, Endianness::Big);
        assert_eq!(meta.representation, Some(DataRepresentation::PackedInteger));
        assert_eq!(meta.channels.len(), meta.parameters);

        let fsc = &meta.channels[0];
        assert_eq!(fsc.short_name, "FSC-A");
        assert_eq!(fsc.long_name, "Forward Scatter");
        assert_eq!(fsc.bits, 16);
        assert!((fsc.range - 1024.0).abs() < 1e-12);
        assert!((fsc.voltage - 450.0).abs() < 1e-12);
        assert!(!fsc.is_log);
        assert!(!fsc.display_log);

        let fl1 = &meta.channels[1];
        assert_eq!(fl1.long_name, "FL1-A");
        assert!(fl1.is_log);
        assert!(fl1.display_log);
    }

    #[test]
    fn malformed_numeric_keyword_takes_default() {
        let kv = keywords("/$PAR/2/$TOT/banana/$P1B/16/$P1R/x/$P2B/16/");
        let meta = extract_metadata(&kv, 0);
        assert_eq!(meta.declared_events, 0);
        assert!((meta.channels[0].range - 0.0).abs() < 1e-12);
    }

    #[test]
    fn missing_parameter_count_means_no_channels() {
        let kv = keywords("/$TOT/100/");
        let meta = extract_metadata(&kv, 400);
        assert_eq!(meta.parameters, 0);
        assert!(meta.channels.is_empty());
    }

    #[test]
    fn declared_events_clamped_by_payload_size() {
        // 2 channels x 16 bits = 4 bytes per event; 40 bytes hold 10 events.
        let kv = keywords("/$PAR/2/$TOT/1000/$P1B/16/$P2B/16/");
        let meta = extract_metadata(&kv, 40);
        assert_eq!(meta.declared_events, 1000);
        assert_eq!(meta.events, 10);

        // Without known bit widths the declared count stands.
        let kv = keywords("/$PAR/2/$TOT/1000/");
        let meta = extract_metadata(&kv, 40);
        assert_eq!(meta.events, 1000);
    }

    #[test]
    fn amplifier_first_component_drives_is_log() {
        assert!(derive_is_log("4.0,1.0"));
        assert!(!derive_is_log("0,0"));
        assert!(!derive_is_log(""));
        assert!(!derive_is_log("linear"));
    }

    #[test]
    fn acquisition_timestamps_parse_and_degrade() {
        let kv = keywords("/$DATE/01-JAN-2021/$BTIM/09:15:30/$ETIM/not a time/");
        let meta = extract_metadata(&kv, 0);
        assert_eq!(
            meta.acquisition_date,
            NaiveDate::from_ymd_opt(2021, 1, 1)
        );
        assert_eq!(
            meta.acquisition_begin,
            NaiveTime::from_hms_opt(9, 15, 30)
        );
        assert_eq!(meta.acquisition_end, None);
    }
}
