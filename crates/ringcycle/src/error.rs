//! Error types for queue construction and handle registration.

use std::fmt;
use thiserror::Error;

/// Which end of a queue a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// The enqueueing side.
    Producer,
    /// The dequeueing side.
    Consumer,
}

impl fmt::Display for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Errors returned when building a queue or registering a handle.
///
/// Full and empty conditions are not errors: `try_enqueue` hands the value
/// back and `try_dequeue` returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Capacity is below the supported minimum.
    #[error("capacity {capacity} is below the minimum of {min}")]
    CapacityTooSmall {
        /// The requested capacity.
        capacity: usize,
        /// The smallest accepted capacity.
        min: usize,
    },

    /// Capacity is not a power of two.
    #[error("capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo {
        /// The requested capacity.
        capacity: usize,
    },

    /// The slack bound must be at least 1 and below the capacity.
    #[error("max_threads {max_threads} must be in 1..{capacity}")]
    InvalidMaxThreads {
        /// The requested slack bound.
        max_threads: usize,
        /// The requested capacity.
        capacity: usize,
    },

    /// A single-owner end already has a live handle.
    #[error("single-{end} queue already has a registered {end}")]
    EndpointTaken {
        /// The end that was requested.
        end: End,
    },

    /// A multi-owner end already has `max` live handles.
    #[error("too many {end} handles registered (max: {max})")]
    TooManyHandles {
        /// The end that was requested.
        end: End,
        /// The configured slack bound.
        max: usize,
    },
}

impl QueueError {
    /// Returns `true` if the error comes from an invalid [`Config`](crate::Config).
    #[inline]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::CapacityTooSmall { .. }
                | Self::CapacityNotPowerOfTwo { .. }
                | Self::InvalidMaxThreads { .. }
        )
    }

    /// Returns `true` if a handle could not be registered. Dropping an
    /// existing handle makes the registration possible again.
    #[inline]
    pub fn is_registration_error(&self) -> bool {
        matches!(self, Self::EndpointTaken { .. } | Self::TooManyHandles { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = QueueError::EndpointTaken { end: End::Producer };
        assert_eq!(err.to_string(), "single-producer queue already has a registered producer");

        let err = QueueError::TooManyHandles { end: End::Consumer, max: 4 };
        assert_eq!(err.to_string(), "too many consumer handles registered (max: 4)");
    }

    #[test]
    fn test_classification() {
        assert!(QueueError::CapacityNotPowerOfTwo { capacity: 33 }.is_config_error());
        assert!(!QueueError::CapacityNotPowerOfTwo { capacity: 33 }.is_registration_error());
        assert!(QueueError::EndpointTaken { end: End::Consumer }.is_registration_error());
    }
}
