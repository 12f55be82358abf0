pub mod entry;
pub mod group;
pub mod subject;

pub use entry::{CatalogEntry, CheckpointRecord, DownloadTask, ResolvedLink};
pub use group::Group;
pub use subject::Subject;
