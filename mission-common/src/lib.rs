pub mod cache;
pub mod normalize;
pub mod status;
pub mod types;

// Re-export common types
pub use cache::{CacheError, Clock, ManualClock, ResponseCache, SystemClock, DEFAULT_TTL};
pub use normalize::EpicArchive;
pub use status::StatusPolicy;
pub use types::{
    Apod, EarthImage, ImageSearchPage, ImageSearchResult, LaunchDetail, MissionSuccess,
    NormalizedLaunch, Pagination, StatusCategory,
};
