pub mod audit;
pub mod counts;
pub mod cue;
pub mod lexicon;
pub mod record;
pub mod topic;
pub mod transcript;

pub use audit::*;
pub use counts::*;
pub use cue::*;
pub use lexicon::*;
pub use record::*;
pub use topic::*;
pub use transcript::*;
