mod client;
mod lazy_read;

pub use client::create_s3_client;
pub use lazy_read::LazyReadStream;
