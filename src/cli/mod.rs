//! Administrative commands.
//!
//! Both commands build a throwaway S3 client from the connection options of
//! the configuration record; they do not go through [`crate::store::S3Storage`]
//! because they operate on buckets the storage may not be pointed at yet.

mod create_bucket;
mod list;

pub use create_bucket::run_create_bucket;
pub use list::run_list;
