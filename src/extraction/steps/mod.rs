//! Individual extraction stages

pub mod content;
pub mod enhance;
pub mod locate;
pub mod quad;
pub mod segment;
pub mod threshold;
