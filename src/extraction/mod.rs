//! Photo-to-row extraction for log sheets
//!
//! Locates the marked box, rectifies it, slices it into rows, drops empty
//! rows and hands the rest to a text recognizer.

pub mod pipeline;
pub mod steps;
pub mod workspace;

pub use pipeline::{ExtractionReport, Extractor, StepTiming};
pub use steps::content::{ContentFilter, FilteredStrip};
pub use steps::enhance::Enhancement;
pub use steps::locate::{BoxLocator, Detection, Strategy};
pub use steps::quad::Quadrilateral;
pub use steps::segment::{segment, LineStrip};
pub use workspace::Workspace;
