//! Errors raised while building a machine profile or estimating a cost.
use failure::Fail;

/// An error occuring while estimating the cost of a tiled computation.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "invalid machine profile: `{}` {}", field, reason)]
    Configuration { field: &'static str, reason: String },
    #[fail(display = "invalid dimension: {} = {} {}", name, value, reason)]
    InvalidDimension {
        name: &'static str,
        value: u64,
        reason: String,
    },
    #[fail(display = "arithmetic overflow while computing the {}", quantity)]
    Overflow { quantity: &'static str },
    #[fail(display = "cannot load machine profile: {}", _0)]
    ProfileFile(#[cause] config::ConfigError),
}

impl Error {
    /// Builds a configuration error for `field`.
    pub fn configuration<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Error::Configuration { field, reason: reason.into() }
    }

    /// Builds an error for a dimension that cannot be tiled.
    pub fn dimension<S: Into<String>>(name: &'static str, value: u64, reason: S) -> Self {
        Error::InvalidDimension { name, value, reason: reason.into() }
    }

    /// Builds an overflow error for `quantity`.
    pub fn overflow(quantity: &'static str) -> Self {
        Error::Overflow { quantity }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self { Error::ProfileFile(e) }
}

/// Ensures a profile field used as a divisor is not zero.
pub(crate) fn divisor(value: u64, field: &'static str) -> Result<u64, Error> {
    if value == 0 {
        Err(Error::configuration(field, "must be strictly positive"))
    } else {
        Ok(value)
    }
}

/// Ensures a checked arithmetic operation did not overflow.
pub(crate) fn checked(value: Option<u64>, quantity: &'static str) -> Result<u64, Error> {
    value.ok_or_else(|| Error::overflow(quantity))
}
