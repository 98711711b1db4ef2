//! Index administration.
//!
//! [`IndexManager`] works on raw index names and descriptors;
//! [`IndexAdministrator`] adds the operations that need records from the
//! store (reindex, rebuild, versioned deploys).

mod administrator;
mod manager;

pub use administrator::{IndexAdministrator, ReindexSummary};
pub use manager::IndexManager;
