pub mod cache;
pub mod clock;

pub use cache::BucketedCache;
pub use clock::{time_bucket, Clock, ManualClock, SystemClock, BUCKET_SECONDS};
