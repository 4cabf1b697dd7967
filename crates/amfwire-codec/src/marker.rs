//! AMF3 type markers and fixed wire constants.

pub const UNDEFINED: u8 = 0x00;
pub const NULL: u8 = 0x01;
pub const FALSE: u8 = 0x02;
pub const TRUE: u8 = 0x03;
pub const INTEGER: u8 = 0x04;
pub const DOUBLE: u8 = 0x05;
pub const STRING: u8 = 0x06;
pub const XML_DOC: u8 = 0x07;
pub const DATE: u8 = 0x08;
pub const ARRAY: u8 = 0x09;
pub const OBJECT: u8 = 0x0A;
pub const XML: u8 = 0x0B;
pub const BYTE_ARRAY: u8 = 0x0C;
pub const VECTOR_INT: u8 = 0x0D;
pub const VECTOR_UINT: u8 = 0x0E;
pub const VECTOR_DOUBLE: u8 = 0x0F;
pub const VECTOR_OBJECT: u8 = 0x10;
pub const DICTIONARY: u8 = 0x11;

/// Inline empty string (`u29` length 0 with the inline bit set).
pub const EMPTY_STRING: u8 = 0x01;
/// Terminates the dynamic member section of an object.
pub const CLOSE_DYNAMIC_OBJECT: u8 = 0x01;
/// Terminates the associative section of an array.
pub const CLOSE_DYNAMIC_ARRAY: u8 = 0x01;
/// Inline indicator written before a date's milliseconds.
pub const DATE_INLINE: u8 = 0x01;

/// Largest value encodable as an AMF3 integer.
pub const MAX_INTEGER: i64 = 268_435_455;
/// Smallest value encodable as an AMF3 integer.
pub const MIN_INTEGER: i64 = -268_435_456;

/// Returns a human-readable name for a type marker.
pub fn marker_name(marker: u8) -> &'static str {
    match marker {
        UNDEFINED => "undefined",
        NULL => "null",
        FALSE => "false",
        TRUE => "true",
        INTEGER => "integer",
        DOUBLE => "double",
        STRING => "string",
        XML_DOC => "xml-doc",
        DATE => "date",
        ARRAY => "array",
        OBJECT => "object",
        XML => "xml",
        BYTE_ARRAY => "byte-array",
        VECTOR_INT => "vector-int",
        VECTOR_UINT => "vector-uint",
        VECTOR_DOUBLE => "vector-double",
        VECTOR_OBJECT => "vector-object",
        DICTIONARY => "dictionary",
        _ => "invalid",
    }
}

/// Returns true if the marker is one of the optional XML/vector types.
pub fn is_extended(marker: u8) -> bool {
    matches!(
        marker,
        XML_DOC | XML | VECTOR_INT | VECTOR_UINT | VECTOR_DOUBLE | VECTOR_OBJECT
    )
}

/// Returns true if `value` fits the 29-bit AMF3 integer range.
pub fn fits_integer(value: i64) -> bool {
    (MIN_INTEGER..=MAX_INTEGER).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_range_bounds() {
        assert!(fits_integer(MAX_INTEGER));
        assert!(fits_integer(MIN_INTEGER));
        assert!(!fits_integer(MAX_INTEGER + 1));
        assert!(!fits_integer(MIN_INTEGER - 1));
    }

    #[test]
    fn extended_markers() {
        assert!(is_extended(XML));
        assert!(is_extended(VECTOR_OBJECT));
        assert!(!is_extended(DICTIONARY));
        assert_eq!(marker_name(0x42), "invalid");
    }
}
