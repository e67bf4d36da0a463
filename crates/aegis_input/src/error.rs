//! Error types for front-end initialization.
//!
//! Only initialization returns errors to the host; everything after that
//! is feedback plus logging, and the state machines stay where they are.

use aegis_core::InputSource;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    /// The capability backing a modality (camera, microphone, switch
    /// device) was denied or is unsupported. Surfaced once; the modality
    /// stays disabled with no retries.
    #[error("{} capability unavailable", source.as_str())]
    CapabilityUnavailable { source: InputSource },

    /// A modality was used before its `initialize` succeeded.
    #[error("{} front-end not initialized", source.as_str())]
    NotInitialized { source: InputSource },
}
