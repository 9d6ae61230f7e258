//! String helpers shared by the query builder and the CLI.

/// Percent-encodes everything outside `[A-Za-z0-9-_.~]` as uppercase hex.
///
/// Space becomes `%20`, never `+`. The output is echoed inside the signed
/// string, so it has to match the service byte for byte.
pub fn uri_escape(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Converts `foo_bar_baz` to `FooBarBaz` (or `fooBarBaz` when `upper_first` is false).
pub fn camelize(value: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(value.len());

    for (i, segment) in value.trim().split('_').filter(|s| !s.is_empty()).enumerate() {
        let lower = segment.to_lowercase();
        if i == 0 && !upper_first {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}
