/// Declare a lazily-compiled, process-wide regex accessor.
///
/// ```ignore
/// static_regex!(version_re, r"v(\d+)");
/// assert!(version_re().is_match("v2"));
/// ```
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).unwrap())
        }
    };
}
