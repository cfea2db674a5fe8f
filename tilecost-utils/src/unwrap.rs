//! An `unwrap` that reports where it failed.

/// Unwraps an `Option` or a `Result`, panicking with the source location otherwise.
#[macro_export]
macro_rules! unwrap {
    ($e:expr) => {
        $crate::unwrap::Unwrap::unwrap_at($e,
            format_args!("at {}:{}:{} in {}", file!(), line!(), column!(), module_path!()))
    };
    ($e:expr, $($msg:tt)*) => {
        $crate::unwrap::Unwrap::unwrap_at($e,
            format_args!("({}) at {}:{}:{} in {}", format_args!($($msg)*),
                         file!(), line!(), column!(), module_path!()))
    };
}

pub trait Unwrap {
    /// The type obtained after unwrapping.
    type Output;

    /// Unwraps the value, panicking with `location` on failure.
    fn unwrap_at(self, location: std::fmt::Arguments) -> Self::Output;
}

impl<T> Unwrap for Option<T> {
    type Output = T;

    fn unwrap_at(self, location: std::fmt::Arguments) -> T {
        match self {
            Some(t) => t,
            None => panic!("failed unwrapping an option {}", location),
        }
    }
}

impl<T, E: std::fmt::Display> Unwrap for Result<T, E> {
    type Output = T;

    fn unwrap_at(self, location: std::fmt::Arguments) -> T {
        match self {
            Ok(t) => t,
            Err(err) => panic!("failed with error `{}` {}", err, location),
        }
    }
}
