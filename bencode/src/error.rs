pub type Result<T> = std::result::Result<T, Error>;

// Everything the decoder can trip over. Encoding an in-memory value
// cannot fail.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {

    // Input ran out inside a construct (unterminated integer, list,
    // dictionary, or a string shorter than its length prefix).
    #[error("unexpected end of input")]
    Eof,

    // Empty digits, "-0", leading zeros, or a value outside i64.
    #[error("invalid integer literal")]
    InvalidInteger,

    // String length prefix is not a decimal number that fits in usize.
    #[error("invalid string length prefix")]
    InvalidLength,

    // Dictionary key is not a byte string.
    #[error("dictionary key must be a byte string")]
    NonStringKey,

    #[error("invalid leading byte: {0:#04x}")]
    UnexpectedByte(u8),

    #[error("trailing data after value")]
    TrailingData,

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

}
