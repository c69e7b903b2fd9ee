pub mod entry;
pub mod source;
pub mod markdown;
pub mod classifier;
pub mod index;
pub mod live;
pub mod coordinator;

pub use entry::{EntryKind, SourceEntry};
pub use source::{EntrySource, EntryStream, MemorySource};
pub use markdown::{MarkdownRenderer, Renderer};
pub use classifier::{classify, Classification, IgnoreReason, Listing};
pub use index::{IndexSet, SiteIndexBuilder, TreeNode};
pub use live::LiveIndex;
pub use coordinator::{IngestionCoordinator, PassReport, PassState, PassStats};
