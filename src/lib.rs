//! Dimension extraction from photographed log sheets.
//!
//! A photo goes through [`extraction::Extractor`], which finds the ruled box,
//! cuts it into rows and sends every inked row to an [`engine::OcrEngine`].
//! The recognized text is corrected and parsed by [`text`] into a flat,
//! 1-based mapping of dimension tokens.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extraction;
pub mod server;
pub mod text;
