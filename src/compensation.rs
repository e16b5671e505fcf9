use nalgebra::DMatrix;
use ndarray::Array2;

use crate::metadata::Channel;

/// Parsed spillover keyword: `n, name_1..name_n, c_11..c_nn` (row-major).
#[derive(Debug, Clone)]
pub struct SpilloverSpec {
    pub channel_names: Vec<String>,
    pub coefficients: DMatrix<f64>,
}

impl SpilloverSpec {
    pub fn order(&self) -> usize {
        self.channel_names.len()
    }
}

/// Keywords that may carry the spillover matrix, in lookup order.
pub const SPILLOVER_KEYS: [&str; 3] = ["$SPILLOVER", "SPILL", "$COMP"];

/// Parse a spillover keyword value. Returns `None` when the leading count is
/// missing, non-positive, larger than the parameter count, or the value does
/// not hold `n` names plus `n*n` coefficient slots. Unparsable coefficient
/// cells default to 0.0.
pub fn parse_spillover(value: &str, parameter_count: usize) -> Option<SpilloverSpec> {
    let tokens: Vec<&str> = value.split(',').map(str::trim).collect();
    let n = tokens.first()?.parse::<usize>().ok()?;
    if n == 0 || n > parameter_count {
        log::warn!("spillover channel count {} out of range, skipping", n);
        return None;
    }
    if tokens.len() < 1 + n + n * n {
        log::warn!(
            "spillover value holds {} fields, expected {}",
            tokens.len(),
            1 + n + n * n
        );
        return None;
    }

    let channel_names: Vec<String> = tokens[1..=n].iter().map(|s| s.to_string()).collect();
    let cells: Vec<f64> = tokens[1 + n..1 + n + n * n]
        .iter()
        .map(|s| s.parse::<f64>().unwrap_or(0.0))
        .collect();

    Some(SpilloverSpec {
        channel_names,
        coefficients: DMatrix::from_row_slice(n, n, &cells),
    })
}

/// Index of the spillover block in the channel list. The named channels must
/// appear contiguously and in spillover order; any mismatch disqualifies the
/// whole spec.
fn locate_block(spec: &SpilloverSpec, channels: &[Channel]) -> Option<usize> {
    let first = channels
        .iter()
        .position(|c| c.short_name == spec.channel_names[0])?;
    if first + spec.order() > channels.len() {
        return None;
    }
    for (offset, name) in spec.channel_names.iter().enumerate() {
        if channels[first + offset].short_name != *name {
            return None;
        }
    }
    Some(first)
}

/// Apply spillover compensation in place.
///
/// Replaces the matched `n`-row sub-block of `matrix` with
/// `inverse(M)ᵀ × subblock`; every other row is left untouched. Returns
/// `true` when compensation was applied, `false` when it was skipped
/// (non-contiguous or misordered channels, or a singular matrix); skipping
/// is never an error because uncompensated data is still meaningful.
pub fn compensate(spec: &SpilloverSpec, channels: &[Channel], matrix: &mut Array2<f64>) -> bool {
    let n = spec.order();
    let offset = match locate_block(spec, channels) {
        Some(offset) => offset,
        None => {
            log::warn!("spillover channels not contiguous in channel list, skipping");
            return false;
        }
    };

    let inverse = match spec.coefficients.clone().try_inverse() {
        Some(inverse) => inverse,
        None => {
            log::warn!("singular spillover matrix, skipping compensation");
            return false;
        }
    };
    let weights = inverse.transpose();

    let events = matrix.ncols();
    let mut block = DMatrix::zeros(n, events);
    for row in 0..n {
        for event in 0..events {
            block[(row, event)] = matrix[[offset + row, event]];
        }
    }
    let compensated = weights * block;
    for row in 0..n {
        for event in 0..events {
            matrix[[offset + row, event]] = compensated[(row, event)];
        }
    }
    true
}
