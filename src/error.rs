use rmp::decode::{MarkerReadError, ValueReadError};
use rmp::encode::ValueWriteError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum Error {
  #[error("should receive more data to restore the entire message")]
  BufferUnsatisfied,
  #[error("{count} bytes remain after the message")]
  TrailingBytes { count: usize },

  #[error("expected array, got marker {marker:#04X}")]
  NotAnArray { marker: u8 },
  #[error("expected tuple with 4 elements, got {length}")]
  UnexpectedTupleLength { length: usize },
  #[error("expected tag as string, got marker {marker:#04X}")]
  TagNotString { marker: u8 },
  #[error("expected ext8, fixext8, uint32 or int64 for time, got unrecognized time encoding {marker:#04X}")]
  UnrecognizedTimeEncoding { marker: u8 },
  #[error("unexpected extension for time: type={type_id}, size={size}")]
  UnexpectedExtension { type_id: i8, size: u32 },
  #[error("unexpected marker in this position: {marker:#04X}")]
  TypeMismatch { marker: u8 },
  #[error("unsupported value type: {marker:#04X}")]
  UnsupportedMarker { marker: u8 },
  #[error("map key must be a string, got marker {marker:#04X}")]
  MapKeyNotString { marker: u8 },
  #[error("invalid UTF-8 sequence in string")]
  InvalidUtf8,
  #[error("values nested deeper than {maximum}")]
  NestingTooDeep { maximum: usize },
  #[error("too many elements to encode: {length}")]
  LengthOverflow { length: usize },
  #[error("integer out of range: {value}")]
  IntegerOverflow { value: String },
  #[error("time cannot be represented in the high-precision form: {seconds}")]
  TimeOutOfRange { seconds: i64 },

  #[error("not a JSON array of 4 elements: {message}")]
  NotAJsonArray { message: String },
  #[error("expected tag as JSON string: {value}")]
  TagNotJsonString { value: String },
  #[error("expected time as JSON integer: {value}")]
  TimeNotInteger { value: String },
  #[error("non-finite float cannot be represented in JSON: {value}")]
  NonFiniteFloat { value: String },
  #[error("duplicate map key cannot be represented in JSON: {key}")]
  DuplicateKey { key: String },
  #[error("failed to process JSON: {message}")]
  Json { message: String },

  #[error("unknown option: {name}")]
  UnknownOption { name: String },
  #[error("illegal value for option {name}: {value:?}")]
  IllegalOptionValue { name: &'static str, value: String },

  #[error("underlying I/O layer error: {message}")]
  Io { kind: std::io::ErrorKind, message: String },
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
      Error::BufferUnsatisfied
    } else {
      Error::Io { kind: err.kind(), message: err.to_string() }
    }
  }
}

impl From<ValueWriteError> for Error {
  fn from(err: ValueWriteError) -> Error {
    match err {
      ValueWriteError::InvalidMarkerWrite(err) | ValueWriteError::InvalidDataWrite(err) => Error::from(err),
    }
  }
}

impl From<ValueReadError> for Error {
  fn from(err: ValueReadError) -> Error {
    match err {
      ValueReadError::InvalidMarkerRead(err) | ValueReadError::InvalidDataRead(err) => Error::from(err),
      ValueReadError::TypeMismatch(marker) => Error::TypeMismatch { marker: marker.to_u8() },
    }
  }
}

impl From<MarkerReadError> for Error {
  fn from(err: MarkerReadError) -> Error {
    Error::from(err.0)
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Error {
    if err.is_eof() {
      Error::BufferUnsatisfied
    } else {
      Error::Json { message: err.to_string() }
    }
  }
}
