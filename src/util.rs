//! Small string and byte helpers shared by the encoding parsers.
//!
//! Type encodings and install names are short, but they are scanned for
//! every ivar, property and method argument of every class in an image, so
//! delimiter searches go through `memchr`.

// =============================================================================
// Byte Search
// =============================================================================

/// Finds the position of the first occurrence of `needle` in `haystack`.
#[inline(always)]
pub fn memchr_find(needle: u8, haystack: &[u8]) -> Option<usize> {
    memchr::memchr(needle, haystack)
}

/// Finds the position of the last occurrence of `needle` in `haystack`.
#[inline(always)]
pub fn memrchr_find(needle: u8, haystack: &[u8]) -> Option<usize> {
    memchr::memrchr(needle, haystack)
}

/// Returns true if `s` contains either `a` or `b`.
#[inline(always)]
pub fn contains_either(s: &str, a: u8, b: u8) -> bool {
    memchr::memchr2(a, b, s.as_bytes()).is_some()
}

// =============================================================================
// Paths
// =============================================================================

/// Returns the last path component of an install name.
///
/// `/System/Library/Frameworks/Foundation.framework/Foundation` becomes
/// `Foundation`.
#[inline]
pub fn basename(path: &str) -> &str {
    match memrchr_find(b'/', path.as_bytes()) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Returns true if `s` is non-empty and starts with an uppercase ASCII letter.
#[inline]
pub fn starts_uppercase(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_uppercase)
}

/// Uppercases the first character of `s`.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first character of `s`.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(
            basename("/System/Library/Frameworks/Foundation.framework/Foundation"),
            "Foundation"
        );
        assert_eq!(basename("libobjc.A.dylib"), "libobjc.A.dylib");
        assert_eq!(basename("/usr/lib/"), "");
    }

    #[test]
    fn test_contains_either() {
        assert!(contains_either("NSObject<Foo>", b'<', b'>'));
        assert!(contains_either("Foo>", b'<', b'>'));
        assert!(!contains_either("@\"NSString\"", b'<', b'>'));
    }

    #[test]
    fn test_starts_uppercase() {
        assert!(starts_uppercase("NSString *"));
        assert!(!starts_uppercase("id"));
        assert!(!starts_uppercase(""));
        assert!(!starts_uppercase("_Foo"));
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("Foo"), "foo");
        assert_eq!(lower_first("URLString"), "uRLString");
        assert_eq!(lower_first(""), "");
    }
}
