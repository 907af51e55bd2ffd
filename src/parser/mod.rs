//! Core segmentation and classification of entry containers.

pub mod blocks;
pub mod labels;
pub mod links;
pub mod sources;
pub mod tables;

pub use tables::Tables;
