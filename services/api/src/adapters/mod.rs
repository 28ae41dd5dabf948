pub mod json_store;
pub mod photo_metadata;
pub mod uploads;
pub mod vision_llm;

pub use json_store::JsonStore;
pub use photo_metadata::ExifMetadataAdapter;
pub use uploads::UploadDir;
pub use vision_llm::OpenAiEnrichmentAdapter;
