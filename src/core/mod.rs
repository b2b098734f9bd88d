//! Extent list, decoding, compaction policies and checksum

pub mod builder;
pub mod checksum;
pub mod compactor;
pub mod config;
pub mod error;
pub mod extent;
pub mod key;
pub mod list;
pub mod observer;
