//! Decoder and plot renderer for FCS flow-cytometry data files.
//!
//! An [`document::FcsDocument`] is parsed once from a file or byte buffer:
//! segment location, keyword decoding, and typed metadata extraction happen
//! eagerly, the channel x event matrix decodes on first access, and spillover
//! compensation can be applied to it once. Rendering consumes an externally
//! binned [`density::DensityGrid`] and a [`plot::PlotRequest`] and produces a
//! raster image.

pub mod compensation;
pub mod contour;
pub mod density;
pub mod document;
pub mod error;
pub mod header;
pub mod heatmap;
pub mod input;
pub mod keywords;
pub mod metadata;
pub mod output;
pub mod plot;
pub mod read;
pub mod scale;
