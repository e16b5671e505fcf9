use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{copy, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zstd::stream::read::Decoder;

use crate::error::FcsError;

fn is_zstd_input(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zst"))
        .unwrap_or(false)
}

/// Read a whole input file into memory, decompressing `.zst` inputs.
pub fn read_input_bytes(path: &Path) -> Result<Vec<u8>, FcsError> {
    if is_zstd_input(path) {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(file)?;
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(path)?)
    }
}

/// Map an input file for zero-copy byte-range access. A `.zst` input is
/// decompressed into a temp file first and the temp file is mapped; the
/// returned guard keeps it alive for the lifetime of the map.
pub fn open_input_mmap(path: &Path) -> Result<(Mmap, Option<NamedTempFile>), FcsError> {
    if !is_zstd_input(path) {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        return Ok((mmap, None));
    }

    let mut decoder = Decoder::new(File::open(path)?)?;
    let mut temp = tempfile::Builder::new()
        .prefix("cytoplot_input_")
        .suffix(".fcs")
        .tempfile_in(std::env::temp_dir())?;
    copy(&mut decoder, &mut temp)?;
    temp.as_file_mut().flush()?;

    let map_file = temp.reopen()?;
    let mmap = unsafe { Mmap::map(&map_file)? };
    Ok((mmap, Some(temp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_file_maps_to_its_contents() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"FCS3.0 payload").unwrap();
        file.flush().unwrap();

        let (mmap, guard) = open_input_mmap(file.path()).unwrap();
        assert!(guard.is_none());
        assert_eq!(&mmap[..], b"FCS3.0 payload");
    }

    #[test]
    fn zstd_input_is_decompressed_before_mapping() {
        let raw = b"FCS3.0 compressed payload".to_vec();
        let compressed = zstd::stream::encode_all(&raw[..], 0).unwrap();

        let mut file = tempfile::Builder::new()
            .suffix(".zst")
            .tempfile()
            .unwrap();
        file.write_all(&compressed).unwrap();
        file.flush().unwrap();

        let (mmap, guard) = open_input_mmap(file.path()).unwrap();
        assert!(guard.is_some());
        assert_eq!(&mmap[..], &raw[..]);

        let bytes = read_input_bytes(file.path()).unwrap();
        assert_eq!(bytes, raw);
    }
}
