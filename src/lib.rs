pub mod config;
pub mod error;
pub mod io;
pub mod patterns;
pub mod policy;

pub use anyhow::{Error, Result};
pub use error::{WipeError, WipeResult};
pub use io::batch::{BatchOptions, BatchSummary, BatchWiper};
pub use io::{wipe, OverwriteEngine, PositionedWrite, WipeSummary, DEFAULT_CHUNK_SIZE};
pub use patterns::random::{FixedSequence, RandomByteSource, SystemRandom};
pub use patterns::{Pass, RandomMode, Rule};
pub use policy::{Policy, PolicyTable};
