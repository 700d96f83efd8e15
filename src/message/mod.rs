mod nom_parser;
mod serialize;
pub mod tags;
mod types;

pub use self::tags::Tags;
pub use self::types::{Message, Source};
