pub mod catalog_fetcher;
pub mod checkpoint_store;
pub mod downloader;
pub mod failure_writer;
pub mod link_resolver;
pub mod normalizer;

pub use catalog_fetcher::CatalogFetcher;
pub use downloader::{local_file_name, DownloadReport, Downloader};
pub use failure_writer::{FailureWriter, Stage};
pub use link_resolver::{LinkResolver, ResolveReport};
pub use normalizer::Normalizer;
