mod ask_question;
mod purge_source;
mod search_documents;
mod sync_scheduler;
mod watermark_store;

pub use ask_question::*;
pub use purge_source::*;
pub use search_documents::*;
pub use sync_scheduler::*;
pub use watermark_store::*;
