// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a cache operation.
///
/// The type is `Clone` so that the outcome of a single refresh can be
/// broadcast to every invalidation caller coalesced onto it; user errors are
/// consequently held behind an [`Arc`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The cache holds no data: it has not been started yet, or it has been
    /// shut down.
    Invalid,

    /// The requested index is not present in the cache.
    NotFound {
        /// The index that was requested.
        index: String,
    },

    /// The data source returned the same index more than once during a
    /// refresh. The offending dataset is rejected wholesale.
    Conflict {
        /// The index that was witnessed more than once.
        index: String,
    },

    /// The user refresh callback failed. The cache retains the previous
    /// snapshot.
    Refresh {
        /// The underlying error returned by the callback.
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// The refresh pipeline panicked. The panic is contained and the worker
    /// keeps running; the cache retains the previous snapshot.
    WorkerPanic {
        /// The rendered panic payload.
        message: String,
    },
}

impl Error {
    /// Wraps a data source error for return from a refresh callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use epochal::Error;
    ///
    /// let error = Error::refresh(std::io::Error::other("listing failed"));
    /// assert!(error.to_string().contains("listing failed"));
    /// ```
    pub fn refresh(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Refresh {
            source: Arc::from(source.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "cache invalid"),
            Self::NotFound { index } => write!(f, "cache index {index} not found"),
            Self::Conflict { index } => {
                write!(f, "cache index {index} witnessed more than once")
            }
            Self::Refresh { source } => write!(f, "cache refresh failed: {source}"),
            Self::WorkerPanic { message } => write!(f, "cache worker panic: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Refresh { source } => {
                let source: &(dyn StdError + 'static) = source.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Error: Send, Sync, Clone, std::error::Error);
    }

    #[test]
    fn display_names_the_offending_index() {
        let error = Error::NotFound {
            index: "m1.small".to_owned(),
        };
        assert_eq!(error.to_string(), "cache index m1.small not found");

        let error = Error::Conflict {
            index: "m1.small".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "cache index m1.small witnessed more than once"
        );
    }

    #[test]
    fn refresh_preserves_the_source() {
        let error = Error::refresh(std::io::Error::other("connection reset"));

        let source = error.source().expect("refresh errors expose a source");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn clones_share_the_source() {
        let error = Error::refresh(std::io::Error::other("transient"));
        let clone = error.clone();

        assert_eq!(error.to_string(), clone.to_string());
        assert!(clone.source().is_some());
    }

    #[test]
    fn non_source_variants_have_no_source() {
        assert!(Error::Invalid.source().is_none());
        assert!(
            Error::WorkerPanic {
                message: "boom".to_owned()
            }
            .source()
            .is_none()
        );
    }
}
