//! Audio metadata: resource access, tag parsing and fallback-safe extraction

pub mod extractor;
pub mod resource;
pub mod tag_reader;

pub use extractor::{ExtractionResult, MetadataExtractor, NO_LYRICS_FOUND, NO_TAGS_FOUND};
pub use resource::{LocalResourceAccess, ResourceAccess};
pub use tag_reader::{Artwork, AudioTags, LoftyTagReader, TagFields, TagReader};
