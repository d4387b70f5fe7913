//! service-invoke: JSON service calls with shared accounting, security
//! token injection and error presentation
//!
//! - [`invoke_core`]: URL resolution, origin checks, envelope validation, config
//! - [`invoke_client`]: transports, the call pipeline and its collaborators

pub use invoke_client;
pub use invoke_core;

pub use invoke_client::{ServiceCallError, ServiceCallOptions, ServiceClient};
pub use invoke_core::{ClientConfig, ServiceResponse};
