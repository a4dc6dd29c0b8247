use std::{fmt, io};

/// Errors that may occur while encoding or decoding a DNS message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The end of the message was reached while more data was expected.
    Eof,
    /// A domain name compression pointer targets an offset outside the
    /// message, or following pointers exceeded the hop limit.
    InvalidPointer,
    /// A field was set to an invalid (reserved for future use or illegal) value.
    InvalidValue,
    /// An empty label was encountered where it is not allowed.
    InvalidEmptyLabel,
    /// A label exceeded the maximum allowable length of a label.
    LabelTooLong,
    /// A record payload does not have the shape its type code declares (for
    /// example, an A record whose RDATA is not exactly 4 bytes long).
    InvalidRecordData,
    /// A textual address could not be parsed into a record payload.
    InvalidAddress,
}

impl Error {
    fn description(&self) -> &str {
        match self {
            Error::Eof => "unexpected end of data",
            Error::InvalidPointer => "invalid domain name compression pointer",
            Error::InvalidValue => "invalid value",
            Error::InvalidEmptyLabel => "invalid empty label",
            Error::LabelTooLong => "label too long",
            Error::InvalidRecordData => "record data does not match record type",
            Error::InvalidAddress => "malformed address",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Eof => io::ErrorKind::UnexpectedEof.into(),
            Error::InvalidPointer => io::Error::new(
                io::ErrorKind::InvalidData,
                "an invalid domain name pointer was encountered; this may indicate a malicious message",
            ),
            Error::InvalidValue | Error::InvalidRecordData => io::ErrorKind::InvalidData.into(),
            Error::InvalidEmptyLabel => io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid empty label in domain name",
            ),
            Error::LabelTooLong => io::Error::new(
                io::ErrorKind::InvalidInput,
                "domain name label exceeds maximum label length",
            ),
            Error::InvalidAddress => io::ErrorKind::InvalidInput.into(),
        }
    }
}
