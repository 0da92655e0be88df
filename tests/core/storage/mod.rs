//! Storage layer tests
//!
//! Round trips through the Tantivy index and write strategy
//! guarantees.

mod test_roundtrip;
mod test_write_strategy;
