use std::path::Path;

use memmap2::Mmap;
use ndarray::Array2;
use tempfile::NamedTempFile;

use crate::compensation::{self, SpilloverSpec, SPILLOVER_KEYS};
use crate::error::FcsError;
use crate::header::{parse_segments, SegmentTable};
use crate::input::open_input_mmap;
use crate::keywords::{merge_keywords, parse_keywords, KeywordMap};
use crate::metadata::{extract_metadata, keyword_u64, Channel, Metadata};
use crate::read::read_event_matrix;

enum Source {
    Mapped(Mmap, Option<NamedTempFile>),
    Owned(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(mmap, _) => &mmap[..],
            Source::Owned(bytes) => &bytes[..],
        }
    }
}

/// A parsed FCS file: segment table, keyword mapping, typed metadata, and
/// the (lazily decoded) channel x event matrix. Immutable once constructed,
/// apart from the one-time compensation overwrite of the event matrix.
pub struct FcsDocument {
    source: Source,
    pub segments: SegmentTable,
    pub delimiter: char,
    pub keywords: KeywordMap,
    pub meta: Metadata,
    events: Option<Array2<f64>>,
    compensated: bool,
}

impl FcsDocument {
    /// Parse a file from disk via a zero-copy memory map. Metadata is
    /// extracted eagerly; the event matrix decodes on first access.
    pub fn open(path: &Path) -> Result<FcsDocument, FcsError> {
        let (mmap, guard) = open_input_mmap(path)?;
        FcsDocument::from_source(Source::Mapped(mmap, guard))
    }

    /// Parse an in-memory byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<FcsDocument, FcsError> {
        FcsDocument::from_source(Source::Owned(bytes))
    }

    fn from_source(source: Source) -> Result<FcsDocument, FcsError> {
        let bytes = source.bytes();
        let mut segments = parse_segments(bytes)?;

        let text = segments.text_segment(bytes);
        let delimiter = text.first().map(|&b| b as char).unwrap_or('\0');
        let mut keywords = parse_keywords(text);

        // Supplemental TEXT is addressed by keywords, not the fixed header;
        // merge it with the primary overwrite policy.
        let sup_start = keyword_u64(&keywords, "$BEGINSTEXT", 0);
        let sup_end = keyword_u64(&keywords, "$ENDSTEXT", 0);
        if sup_end > sup_start && sup_start > 0 {
            segments.supplemental_text = (sup_start, sup_end);
            let extra = parse_keywords(segments.slice(bytes, (sup_start, sup_end)));
            merge_keywords(&mut keywords, &extra);
        }

        // Large files zero the header DATA offsets and declare them in TEXT.
        if segments.data == (0, 0) {
            let begin = keyword_u64(&keywords, "$BEGINDATA", 0);
            let end = keyword_u64(&keywords, "$ENDDATA", 0);
            if end > begin && begin > 0 {
                segments.data = (begin, end);
            }
        }

        let data_len = segments.data_segment(bytes).len();
        let meta = extract_metadata(&keywords, data_len);

        Ok(FcsDocument {
            source,
            segments,
            delimiter,
            keywords,
            meta,
            events: None,
            compensated: false,
        })
    }

    pub fn version(&self) -> &str {
        &self.segments.version
    }

    pub fn channels(&self) -> &[Channel] {
        &self.meta.channels
    }

    pub fn event_count(&self) -> usize {
        self.meta.events
    }

    /// Decode the DATA segment on first call; later calls return the cached
    /// matrix.
    pub fn event_matrix(&mut self) -> Result<&Array2<f64>, FcsError> {
        if self.events.is_none() {
            let data = self.segments.data_segment(self.source.bytes());
            self.events = Some(read_event_matrix(data, &self.meta)?);
        }
        Ok(self.events.as_ref().unwrap())
    }

    /// The embedded spillover specification, if any of the known keywords
    /// carries a parsable one.
    pub fn spillover(&self) -> Option<SpilloverSpec> {
        SPILLOVER_KEYS
            .iter()
            .find_map(|key| self.keywords.get(key))
            .and_then(|value| compensation::parse_spillover(value, self.meta.parameters))
    }

    /// Apply spillover compensation to the event matrix, at most once.
    ///
    /// Returns `Ok(true)` when the matrix was compensated. A missing or
    /// invalid spillover spec, a channel mismatch, or a singular matrix all
    /// skip compensation and return `Ok(false)`; only a decode failure is an
    /// error.
    pub fn apply_compensation(&mut self) -> Result<bool, FcsError> {
        if self.compensated {
            return Ok(false);
        }
        let spec = match self.spillover() {
            Some(spec) => spec,
            None => return Ok(false),
        };
        self.event_matrix()?;
        let channels = self.meta.channels.clone();
        let matrix = self.events.as_mut().unwrap();
        let applied = compensation::compensate(&spec, &channels, matrix);
        self.compensated = applied;
        Ok(applied)
    }
}
