//! Core value model shared by the inbox ledger, kernel, and CLI: account
//! addresses, storage paths, static types, runtime values, and the typed
//! capability descriptor with its force-cast.

mod address;
mod cast;
mod path;
mod types;
mod value;

pub use address::{Address, AddressError};
pub use cast::{ForceCastError, force_cast};
pub use path::{Path, PathDomain, PathError};
pub use types::{StaticType, TypeParseError};
pub use value::{CapabilityValue, Value};
