use crate::error::FcsError;

/// Byte range of one segment, inclusive on both ends as the header declares
/// them. `(0, 0)` means the segment is absent.
pub type SegmentRange = (u64, u64);

/// Resolved byte ranges of the container's segments. Supplemental TEXT is
/// not addressed by the fixed header; it is filled in later from the
/// $BEGINSTEXT/$ENDSTEXT keywords.
#[derive(Debug, Default, Clone)]
pub struct SegmentTable {
    pub version: String,
    pub text: SegmentRange,
    pub data: SegmentRange,
    pub analysis: SegmentRange,
    pub supplemental_text: SegmentRange,
}

impl SegmentTable {
    pub fn slice<'a>(&self, bytes: &'a [u8], range: SegmentRange) -> &'a [u8] {
        let (start, end) = range;
        if end < start || end as usize >= bytes.len() {
            return &[];
        }
        &bytes[start as usize..=end as usize]
    }

    pub fn text_segment<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        self.slice(bytes, self.text)
    }

    pub fn data_segment<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        self.slice(bytes, self.data)
    }
}

const VERSION_TAG_LEN: usize = 6;
const OFFSET_BLOCK_START: usize = 10;
const OFFSET_FIELD_LEN: usize = 8;
const OFFSET_BLOCK_LEN: usize = 6 * OFFSET_FIELD_LEN;

fn offset_field(bytes: &[u8], index: usize) -> Option<u64> {
    let start = OFFSET_BLOCK_START + index * OFFSET_FIELD_LEN;
    let field = &bytes[start..start + OFFSET_FIELD_LEN];
    let text = String::from_utf8_lossy(field);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u64>().ok()
}

/// Locate the TEXT/DATA/ANALYSIS segments from the fixed-offset header.
///
/// The version tag occupies bytes 0..6 and must start with `FCS`. Six
/// 8-character space-padded decimal fields begin at byte 10: TEXT start/end,
/// DATA start/end, ANALYSIS start/end. TEXT and DATA must parse; ANALYSIS
/// degrades to `(0, 0)`.
pub fn parse_segments(bytes: &[u8]) -> Result<SegmentTable, FcsError> {
    if bytes.len() < VERSION_TAG_LEN {
        return Err(FcsError::TruncatedHeader);
    }
    let version = String::from_utf8_lossy(&bytes[..VERSION_TAG_LEN])
        .trim_end()
        .to_string();
    if !version.starts_with("FCS") {
        return Err(FcsError::NotAnFcsFile);
    }
    if bytes.len() < OFFSET_BLOCK_START + OFFSET_BLOCK_LEN {
        return Err(FcsError::TruncatedHeader);
    }

    let text_start = offset_field(bytes, 0)
        .ok_or_else(|| FcsError::BadSegmentOffsets("TEXT".to_string()))?;
    let text_end = offset_field(bytes, 1)
        .ok_or_else(|| FcsError::BadSegmentOffsets("TEXT".to_string()))?;
    let data_start = offset_field(bytes, 2)
        .ok_or_else(|| FcsError::BadSegmentOffsets("DATA".to_string()))?;
    let data_end = offset_field(bytes, 3)
        .ok_or_else(|| FcsError::BadSegmentOffsets("DATA".to_string()))?;

    // The ANALYSIS segment is optional; a blank or garbled field means no
    // segment rather than a broken file.
    let analysis = match (offset_field(bytes, 4), offset_field(bytes, 5)) {
        (Some(start), Some(end)) => (start, end),
        _ => (0, 0),
    };

    Ok(SegmentTable {
        version,
        text: (text_start, text_end),
        data: (data_start, data_end),
        analysis,
        supplemental_text: (0, 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(fields: [&str; 6]) -> Vec<u8> {
        let mut bytes = b"FCS3.0    ".to_vec();
        for field in fields {
            bytes.extend_from_slice(format!("{:>8}", field).as_bytes());
        }
        bytes
    }

    #[test]
    fn parses_all_six_offsets() {
        let bytes = header_bytes(["58", "1024", "1025", "4096", "4097", "4200"]);
        let table = parse_segments(&bytes).unwrap();
        assert_eq!(table.version, "FCS3.0");
        assert_eq!(table.text, (58, 1024));
        assert_eq!(table.data, (1025, 4096));
        assert_eq!(table.analysis, (4097, 4200));
    }

    #[test]
    fn rejects_unknown_version_tag() {
        let mut bytes = header_bytes(["58", "1024", "1025", "4096", "0", "0"]);
        bytes[..6].copy_from_slice(b"LMD1.0");
        assert!(matches!(parse_segments(&bytes), Err(FcsError::NotAnFcsFile)));
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = header_bytes(["58", "1024", "1025", "4096", "0", "0"]);
        assert!(matches!(
            parse_segments(&bytes[..30]),
            Err(FcsError::TruncatedHeader)
        ));
    }

    #[test]
    fn bad_text_offset_is_fatal() {
        let bytes = header_bytes(["oops", "1024", "1025", "4096", "0", "0"]);
        assert!(matches!(
            parse_segments(&bytes),
            Err(FcsError::BadSegmentOffsets(_))
        ));
    }

    #[test]
    fn bad_analysis_offsets_degrade_to_zero() {
        let bytes = header_bytes(["58", "1024", "1025", "4096", "??", "??"]);
        let table = parse_segments(&bytes).unwrap();
        assert_eq!(table.analysis, (0, 0));
    }

    #[test]
    fn segment_slice_is_bounds_checked() {
        let bytes = header_bytes(["58", "9999", "1025", "4096", "0", "0"]);
        let table = parse_segments(&bytes).unwrap();
        assert!(table.text_segment(&bytes).is_empty());
    }
}
