/// Requested axis transform for one plot dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Linear,
    Log,
    /// asinh(x / 150), the fluorescence display cofactor.
    ArcsinhFluor,
    /// asinh(x / 5), the CyTOF display cofactor.
    ArcsinhCytof,
}

/// Domain range and transform for one axis. Stateless; construct per render
/// call from the requested kind and the channel's declared maximum.
#[derive(Debug, Clone, Copy)]
pub struct AxisScale {
    pub kind: ScaleKind,
    pub domain_min: f64,
    pub domain_max: f64,
}

impl AxisScale {
    pub fn new(kind: ScaleKind, channel_max: f64) -> AxisScale {
        let (domain_min, domain_max) = match kind {
            ScaleKind::Linear | ScaleKind::Log => (1.0, channel_max),
            ScaleKind::ArcsinhFluor => (-200.0, 260_000.0),
            ScaleKind::ArcsinhCytof => (-20.0, 10_000.0),
        };
        AxisScale {
            kind,
            domain_min,
            domain_max,
        }
    }

    /// Transform a raw channel value into display coordinates.
    pub fn apply(&self, x: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear => x,
            ScaleKind::Log => x.log10(),
            ScaleKind::ArcsinhFluor => (x / 150.0).asinh(),
            ScaleKind::ArcsinhCytof => (x / 5.0).asinh(),
        }
    }
}
