//! Parameter identities and the central timestamped store.

pub mod id;
pub mod shared;
pub mod store;

pub use id::{Domain, ParamId, PARAM_COUNT};
pub use shared::SharedParamStore;
pub use store::{ParamStore, Source, CHANGE_EPSILON, MAX_OBSERVERS};
