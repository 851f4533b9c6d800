//! Robots.txt handling
//!
//! Fetches, parses, and caches robots.txt policy per origin. Policy is
//! permissive by default: any failure to fetch or parse falls back to
//! allow-all rather than blocking the crawl.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;
