pub mod fetcher;
pub mod images;
pub mod traits;

pub use fetcher::HttpPageFetcher;
pub use images::HttpImageFetcher;
pub use traits::{ImageFetcher, PageFetcher};
