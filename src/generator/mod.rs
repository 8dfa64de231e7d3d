//! Conversion of node sets into client configuration documents.

pub mod clash;
pub mod converter;
pub mod region;

pub use clash::ClashConverter;
pub use converter::{
    ConvertOptions, ConverterRegistry, FormatConverter, SerializeFormat, TargetFormat,
};
