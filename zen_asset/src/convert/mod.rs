//! Conversion between the legacy and Zen representations

pub mod payload;
pub mod to_legacy;
pub mod to_zen;

/// What to do when a bulk-data map entry doesn't fit the side-file it
/// describes
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum BulkMapPolicy {
    /// Keep the entries as they are and log the mismatch
    #[default]
    Passthrough,
    /// Replace the map with a single entry covering the whole side-file
    SingleEntryCoveringFile,
}

/// Conversion tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Fail on unresolved references instead of downgrading to a warning
    /// plus a fallback value
    pub strict: bool,
    /// Extra bytes charged to the last export's serial size when a bulk
    /// side-file exists; matches the packaging the content corpus was built
    /// with
    pub bulk_overhead: u64,
    /// Size of the bulk side-file accompanying the asset, if any
    pub bulk_data_size: Option<u64>,
    /// Bulk-data map validation policy
    pub bulk_map_policy: BulkMapPolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            strict: false,
            bulk_overhead: 432,
            bulk_data_size: None,
            bulk_map_policy: BulkMapPolicy::default(),
        }
    }
}
