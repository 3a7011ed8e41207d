//! Error types.
//!
//! Each error is represented by a unique type that implements [`std::error::Error`].
//! However, most APIs return more than one kind of error and so will return one
//! of the higher level enums, [`ResponseError`] or [`Error`]. The error types
//! are convertible to the higher level enums, allowing them to be used with `?`:
//!
//! ```
//! use marsproto::error::{Error, ResponseError};
//!
//! fn decode() -> Result<(), ResponseError> {
//!     // ...
//! # Ok(())
//! }
//!
//! fn query() -> Result<(), Error> {
//!     decode()?;
//!     // ...
//! # Ok(())
//! }
//! ```
//!
//! Errors about a printer's reply keep the offending text. Use [`AsRef`] or
//! [`From`]/[`Into`] to retrieve it:
//!
//! ```
//! # use marsproto::error::UnexpectedResponseError;
//! # fn wrapper(error: UnexpectedResponseError) {
//! let response: &str = error.as_ref();
//! // OR
//! let response: String = error.into();
//! # }
//! ```

/// Implement Error and Display traits for the specified type.
///
/// After the type define the format string and any arguments it should
/// reference after `self =>` (to abide by macro hygiene rules).
macro_rules! impl_error_display {
    (
        $name:path,
        $self:ident =>
        $display:literal
        $(,
            $($arg:expr),+
        )?
    ) => {
        impl std::error::Error for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&$self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(
                    f,
                    $display
                    $(,
                        $($arg),+
                    )?
                )
            }
        }
    };
}

/// Implement `new()`, `response()`, `AsRef<str>` and `From<Self> for String`
/// for errors that only hold the text of a reply.
macro_rules! impl_for_type_containing_response {
    ($name:ident) => {
        impl $name {
            /// Create an instance of the error.
            pub(crate) fn new<S: AsRef<str>>(response: S) -> Self {
                $name(Box::from(response.as_ref()))
            }

            /// Get the text of the offending response.
            pub fn response(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            /// Get access to the response associated with this error.
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            /// Consume the error and return the response associated with it.
            fn from(other: $name) -> Self {
                other.0.into()
            }
        }
    };
}

macro_rules! impl_is_timeout {
    ($name:ident) => {
        impl $name {
            /// A convenience function for determining if the error is due to the
            /// port timing out.
            pub fn is_timeout(&self) -> bool {
                matches!(self, $name::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
            }
        }
    };
}

macro_rules! impl_from_serialport_error {
    ($name:ident) => {
        impl From<serialport::Error> for $name {
            fn from(other: serialport::Error) -> Self {
                use std::io;

                match other.kind() {
                    serialport::ErrorKind::NoDevice => $name::SerialDeviceInUseOrDisconnected(
                        SerialDeviceInUseOrDisconnectedError(other.description.into_boxed_str()),
                    ),
                    serialport::ErrorKind::InvalidInput => $name::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        other.description,
                    )),
                    serialport::ErrorKind::Unknown => {
                        $name::Io(io::Error::new(io::ErrorKind::Other, other.description))
                    }
                    serialport::ErrorKind::Io(kind) => {
                        $name::Io(io::Error::new(kind, other.description))
                    }
                }
            }
        }
    };
}

/// Define error enums that contain concrete error types (not other error enums).
///
/// From and TryFrom traits will be implemented for the enum and its underlying
/// errors. The enum's Display implementation will defer to the underlying errors'
/// Display implementations. An `is_<variant>()` predicate is generated for
/// every variant.
///
/// Simple implementations of From with other error enums can be added by
/// appending a succinct impl block, which assumes that:
///   * it is being implemented for this error enum,
///   * each variant has a single tuple value, and can be converted to the value
///     in this enum with its own From implementation.
///
/// ```compile_fail
/// # // This fails to compile because the macro is not exported.
/// error_enum!{
///     // This defines the enum and From/TryFrom between ThisError and A and B.
///     #[non_exhaustive]
///     pub enum ThisError {
///         VariantA(A),
///         VariantB(B),
///     }
///
///     // This implements a simple From between ThisError and OtherType.
///     impl From<OtherType> {
///         FromVariantA => VariantA,
///     }
/// }
/// ```
macro_rules! error_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $(
                $variant:ident($inner:path)
            ),+
            $(,)?
        }
        $(
            impl From<$from_t:ident>
            {
                $($from_variant:ident => $to_variant:ident),+
                $(,)?
            }
        )*
    ) => {
        $(
            #[$attr]
        )*
        #[allow(missing_docs)]
        pub enum $name {
            $(
                $variant($inner)
            ),+
        }

        impl std::error::Error for $name {}

        // Defer the display to the inner error type
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$variant(e) => e.fmt(f)
                    ),+
                }
            }
        }

        impl From<std::convert::Infallible> for $name {
            fn from(_: std::convert::Infallible) -> Self {
                unreachable!();
            }
        }

        paste::paste! {
            impl $name {
                $(
                    #[doc = "Whether this is a `" $variant "` error."]
                    pub fn [<is_ $variant:snake>](&self) -> bool {
                        matches!(self, $name::$variant(_))
                    }
                )+
            }
        }

        $(
            impl From<$inner> for $name {
                fn from(other: $inner) -> Self {
                    $name::$variant(other)
                }
            }

            impl TryFrom<$name> for $inner {
                type Error = $name;
                fn try_from(other: $name) -> Result<Self, Self::Error> {
                    match other {
                        $name::$variant(value) => Ok(value),
                        #[allow(unreachable_patterns)]
                        value => Err(value)
                    }
                }
            }
        )+

        $(
            impl From<$from_t> for $name {
                fn from(other: $from_t) -> Self {
                    match other {
                        $($from_t::$from_variant(e) => $name::$to_variant(From::from(e))),+
                    }
                }
            }
        )*
    };
}

/// The specified device is either disconnected or already in use by another process.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SerialDeviceInUseOrDisconnectedError(Box<str>);

impl_error_display! {
    SerialDeviceInUseOrDisconnectedError,
    self =>
    "the specified device is either disconnected or already in use by another process: {}", self.0
}

/// The printer replied, but not with the reply expected for the command.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct UnexpectedResponseError(Box<str>);

impl_error_display! {
    UnexpectedResponseError,
    self => "unexpected response from printer: {:?}", self.0
}
impl_for_type_containing_response! { UnexpectedResponseError }

/// The printer's reply was recognised, but one of its fields could not be
/// decoded.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProtocolViolationError(Box<(Box<str>, Box<str>)>);

impl_error_display! {
    ProtocolViolationError,
    self => "protocol violation ({}) in response from printer: {:?}", self.0 .1, self.0 .0
}

impl ProtocolViolationError {
    /// Create an instance of the error.
    pub(crate) fn new<S: AsRef<str>, R: Into<Box<str>>>(response: S, reason: R) -> Self {
        ProtocolViolationError(Box::new((Box::from(response.as_ref()), reason.into())))
    }

    /// Get the text of the offending response.
    pub fn response(&self) -> &str {
        &self.0 .0
    }

    /// Get a description of what was wrong with the response.
    pub fn reason(&self) -> &str {
        &self.0 .1
    }
}

impl AsRef<str> for ProtocolViolationError {
    /// Get access to the response associated with this error.
    fn as_ref(&self) -> &str {
        self.response()
    }
}

impl From<ProtocolViolationError> for String {
    /// Consume the error and return the response associated with it.
    fn from(other: ProtocolViolationError) -> Self {
        other.0 .0.into()
    }
}

/// The printer replied with a recognised shape that is not handled yet.
///
/// This usually means the firmware reports a phase the library does not model,
/// so the reply is surfaced rather than misreported.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct UnimplementedError(Box<str>);

impl_error_display! {
    UnimplementedError,
    self => "unhandled response from printer: {:?}", self.0
}
impl_for_type_containing_response! { UnimplementedError }

/// A layer offset table did not describe a sliced file.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InvalidLayerTableError(Box<str>);

impl_error_display! {
    InvalidLayerTableError,
    self => "invalid layer offset table: {}", self.0
}

impl InvalidLayerTableError {
    /// Create an instance of the error.
    pub(crate) fn new<R: Into<Box<str>>>(reason: R) -> Self {
        InvalidLayerTableError(reason.into())
    }

    /// Get a description of what was wrong with the table.
    pub fn reason(&self) -> &str {
        &self.0
    }
}

error_enum! {
    /// A reply did not match the grammar expected for a command.
    #[derive(Debug, PartialEq, Eq, Hash)]
    #[non_exhaustive]
    pub enum ResponseError {
        UnexpectedResponse(UnexpectedResponseError),
        ProtocolViolation(ProtocolViolationError),
        Unimplemented(UnimplementedError),
    }
}

impl ResponseError {
    /// Get the text of the offending response.
    pub fn response(&self) -> &str {
        match self {
            ResponseError::UnexpectedResponse(e) => e.response(),
            ResponseError::ProtocolViolation(e) => e.response(),
            ResponseError::Unimplemented(e) => e.response(),
        }
    }
}

error_enum! {
    /// Any error returned while communicating with a printer.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum Error {
        SerialDeviceInUseOrDisconnected(SerialDeviceInUseOrDisconnectedError),
        Io(std::io::Error),
        UnexpectedResponse(UnexpectedResponseError),
        ProtocolViolation(ProtocolViolationError),
        Unimplemented(UnimplementedError),
    }

    impl From<ResponseError> {
        UnexpectedResponse => UnexpectedResponse,
        ProtocolViolation => ProtocolViolation,
        Unimplemented => Unimplemented,
    }
}

impl_is_timeout! { Error }
impl_from_serialport_error! { Error }

impl TryFrom<Error> for ResponseError {
    type Error = Error;
    /// Recover the error about a printer's reply, if that is what `other` is.
    fn try_from(other: Error) -> Result<Self, Self::Error> {
        match other {
            Error::UnexpectedResponse(e) => Ok(e.into()),
            Error::ProtocolViolation(e) => Ok(e.into()),
            Error::Unimplemented(e) => Ok(e.into()),
            other => Err(other),
        }
    }
}
