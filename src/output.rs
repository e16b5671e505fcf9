use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use npyz::WriterBuilder;

use crate::metadata::Metadata;

/// Write the decoded event matrix as a 2D `.npy` array shaped
/// `[parameters, events]`.
pub fn write_events_npy(path: &Path, matrix: &Array2<f64>) -> io::Result<()> {
    let (parameters, events) = matrix.dim();
    let file = File::create(path)?;
    let mut writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(&[parameters as u64, events as u64])
        .writer(file)
        .begin_nd()?;
    for value in matrix.iter() {
        writer.push(value)?;
    }
    writer.finish()?;
    Ok(())
}

/// Write the decoded event matrix as tab-separated text, one event per line,
/// with a header row of channel short names.
pub fn write_events_tsv(path: &Path, meta: &Metadata, matrix: &Array2<f64>) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let names: Vec<&str> = meta
        .channels
        .iter()
        .map(|c| c.short_name.as_str())
        .collect();
    writeln!(writer, "{}", names.join("\t"))?;

    let (parameters, events) = matrix.dim();
    for event in 0..events {
        let mut line = String::new();
        for channel in 0..parameters {
            if channel > 0 {
                line.push('\t');
            }
            line.push_str(&format!("{}", matrix[[channel, event]]));
        }
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}
