pub mod memory;
pub mod needs;
pub mod profile;

pub use memory::{AgentMemory, KnownResource, MemoryStore};
pub use needs::{NeedKind, NeedsSnapshot};
pub use profile::{AgentProfile, CraftOption, Personality, Role};
