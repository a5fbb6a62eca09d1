//! Built-in parsers, reshapers and exporters.
//!
//! These cover the common file formats so a project can run end to end
//! without out-of-tree plugins.

pub mod export;
pub mod parsers;
pub mod reshape;

use crate::registry::PluginRegistry;

pub(crate) fn register(registry: &mut PluginRegistry) {
    registry
        .register_parser("csv", || Box::new(parsers::CsvParser))
        .register_parser("jsonl", || Box::new(parsers::JsonLinesParser))
        .register_reshaper("rename", || Box::new(reshape::Rename))
        .register_reshaper("dedupe", || Box::new(reshape::Dedupe))
        .register_exporter("csv", || Box::new(export::CsvExporter))
        .register_exporter("jsonl", || Box::new(export::JsonLinesExporter));
}
