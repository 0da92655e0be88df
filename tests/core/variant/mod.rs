//! Variant layer tests
//!
//! Format detection and anchor/volume resolution across the built-in
//! variants.

mod test_detection;
mod test_resolution;
