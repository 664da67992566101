pub mod conformance;
mod memory;
mod record;
mod traits;

pub use memory::InMemoryInvocationLog;
pub use record::{InvocationRecord, InvocationResult};
pub use traits::InvocationStore;
