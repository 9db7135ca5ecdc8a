//! URI component encoding
//!
//! Matches `encodeURIComponent`: ASCII alphanumerics and `- _ . ! ~ * ' ( )`
//! pass through, every other UTF-8 byte becomes `%XX` (uppercase hex).

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{AddressError, Result};

const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single URI component
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Reverse [`encode_component`]. Malformed `%` sequences are kept verbatim.
pub fn decode_component(input: &str) -> Result<String> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AddressError::InvalidUtf8(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_characters_are_escaped() {
        assert_eq!(encode_component("a/b?c=d"), "a%2Fb%3Fc%3Dd");
        assert_eq!(encode_component("foo bar"), "foo%20bar");
        assert_eq!(encode_component("#&:"), "%23%26%3A");
        assert_eq!(encode_component("gemini://x"), "gemini%3A%2F%2Fx");
    }

    #[test]
    fn test_unreserved_characters_pass_through() {
        assert_eq!(encode_component("hello"), "hello");
        assert_eq!(encode_component("A-z_0.9!~*'()"), "A-z_0.9!~*'()");
    }

    #[test]
    fn test_non_ascii_is_utf8_encoded() {
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("日本"), "%E6%97%A5%E6%9C%AC");
    }

    #[test]
    fn test_decode_reverses_encode() {
        for input in ["a b/c", "a/b?c=d", "geminiprotocol.net/docs/", "100% ☃"] {
            assert_eq!(decode_component(&encode_component(input)).unwrap(), input);
        }
        assert_eq!(decode_component("a%20b%2Fc").unwrap(), "a b/c");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert_eq!(
            decode_component("%FF"),
            Err(AddressError::InvalidUtf8("%FF".to_string()))
        );
    }
}
