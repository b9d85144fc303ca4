// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Dataset loading and report export

mod dataset_reader;
mod exporter;

pub use dataset_reader::{DatasetReader, DatasetSource, FileDatasetSource};
pub use exporter::{
    export_annotated, export_summary, parse_summary, ANNOTATED_FILE_NAME, SUMMARY_FILE_NAME,
};
