/// Loose absolute-url check: true when `(https?)?://` occurs anywhere in `s`.
///
/// The match is unanchored, so `"foo http://bar"` counts as absolute. Both
/// prefix groups are optional, which makes the pattern a plain `://` search.
pub fn is_absolute_url(s: &str) -> bool {
    s.contains("://")
}
