use std::collections::HashMap;

/// Insertion-ordered keyword mapping from the TEXT segment. Keys are trimmed
/// and uppercased (FCS keywords are case-insensitive); values are kept
/// verbatim. A later insert of the same key overwrites the earlier value in
/// place.
#[derive(Debug, Default, Clone)]
pub struct KeywordMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl KeywordMap {
    pub fn new() -> KeywordMap {
        KeywordMap::default()
    }

    pub fn insert(&mut self, key: &str, value: String) {
        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() {
            return;
        }
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim().to_ascii_uppercase();
        self.index
            .get(&key)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Split a TEXT segment into keyword pairs.
///
/// The first decoded character is the delimiter; the remainder splits on it.
/// The element before the first delimiter is always empty and is discarded.
/// Elements then alternate key, value; a trailing key without a value is
/// dropped. A value that itself contains the delimiter is split apart here
/// (doubled-delimiter escaping is intentionally not handled).
pub fn parse_keywords(bytes: &[u8]) -> KeywordMap {
    let mut map = KeywordMap::new();
    if bytes.is_empty() {
        return map;
    }
    let text = String::from_utf8_lossy(bytes);
    let delimiter = match text.chars().next() {
        Some(c) => c,
        None => return map,
    };

    let mut fields = text.split(delimiter);
    // The segment starts with the delimiter, so the first element is always
    // empty.
    fields.next();
    loop {
        let key = match fields.next() {
            Some(k) => k,
            None => break,
        };
        let value = match fields.next() {
            Some(v) => v,
            None => break,
        };
        map.insert(key, value.to_string());
    }
    map
}

/// Merge `extra` into `map` with the same last-occurrence-wins policy the
/// primary segment uses.
pub fn merge_keywords(map: &mut KeywordMap, extra: &KeywordMap) {
    for (key, value) in extra.iter() {
        map.insert(key, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_byte_declares_the_delimiter() {
        let map = parse_keywords(b"/$PAR/3/$TOT/100/");
        assert_eq!(map.get("$PAR"), Some("3"));
        assert_eq!(map.get("$TOT"), Some("100"));

        let map = parse_keywords(b"|$PAR|3|");
        assert_eq!(map.get("$PAR"), Some("3"));
    }

    #[test]
    fn keys_are_trimmed_and_case_insensitive() {
        let map = parse_keywords(b"/ $par /3/");
        assert_eq!(map.get("$PAR"), Some("3"));
        assert_eq!(map.get("$par"), Some("3"));
    }

    #[test]
    fn later_occurrence_overwrites_and_keeps_position() {
        let map = parse_keywords(b"/$TOT/100/$PAR/3/$TOT/200/");
        assert_eq!(map.get("$TOT"), Some("200"));
        assert_eq!(map.len(), 2);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["$TOT", "$PAR"]);
    }

    #[test]
    fn trailing_key_without_value_is_dropped() {
        let map = parse_keywords(b"/$PAR/3/$ORPHAN");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("$ORPHAN"), None);
    }

    #[test]
    fn empty_segment_yields_empty_map() {
        assert!(parse_keywords(b"").is_empty());
        assert!(parse_keywords(b"/").is_empty());
    }

    #[test]
    fn delimiter_inside_value_splits_the_stream() {
        // Known limitation: no doubled-delimiter escaping, so the value
        // "a/b" degrades into a stray pair.
        let map = parse_keywords(b"/$FIL/a/b/$PAR/2/");
        assert_eq!(map.get("$FIL"), Some("a"));
        assert_eq!(map.get("B"), Some("$PAR"));
    }

    #[test]
    fn merge_applies_overwrite_policy() {
        let mut map = parse_keywords(b"/$PAR/3/$TOT/10/");
        let extra = parse_keywords(b"/$TOT/20/$CYT/Imitator/");
        merge_keywords(&mut map, &extra);
        assert_eq!(map.get("$TOT"), Some("20"));
        assert_eq!(map.get("$CYT"), Some("Imitator"));
    }
}
