mod fetch;
mod parse;

pub use fetch::{fetch_feed_bytes, is_url, load_episodes, read_feed_file};
pub use parse::{Episode, parse_feed, try_parse_feed};
