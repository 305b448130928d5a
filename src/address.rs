//! Address and hash normalization
//!
//! Etherscan expects hex values with a `0x` prefix. Users often paste hashes
//! without one, so values are normalized before they are put into a query.

/// The hex prefix every normalized value starts with
pub const HEX_PREFIX: &str = "0x";

/// Ensures an address-like string starts with `0x`
///
/// Only the prefix is checked; the remaining characters are not validated
/// as hex digits.
///
/// # Examples
/// ```
/// use etherquery::address::normalize_address;
///
/// assert_eq!(normalize_address("abc123"), "0xabc123");
/// assert_eq!(normalize_address("0xabc123"), "0xabc123");
/// ```
pub fn normalize_address(addr: &str) -> String {
    if addr.starts_with(HEX_PREFIX) {
        addr.to_string()
    } else {
        format!("{}{}", HEX_PREFIX, addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_prefix_when_missing() {
        assert_eq!(normalize_address("abc123"), "0xabc123");
    }

    #[test]
    fn test_keeps_existing_prefix() {
        assert_eq!(normalize_address("0xdeadbeef"), "0xdeadbeef");
    }

    #[test]
    fn test_is_idempotent() {
        for input in ["", "0x", "abc", "0xabc", "xyz", "0X12"] {
            let once = normalize_address(input);
            assert_eq!(normalize_address(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_does_not_validate_hex_digits() {
        assert_eq!(normalize_address("not hex at all"), "0xnot hex at all");
    }

    #[test]
    fn test_empty_string_gets_prefix() {
        assert_eq!(normalize_address(""), "0x");
    }

    #[test]
    fn test_uppercase_prefix_is_not_recognized() {
        // Only the lowercase prefix counts
        assert_eq!(normalize_address("0XABC"), "0x0XABC");
    }
}
