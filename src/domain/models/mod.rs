mod document;
mod embedding;
mod search_result;
mod sync_status;

pub use document::*;
pub use embedding::*;
pub use search_result::*;
pub use sync_status::*;
