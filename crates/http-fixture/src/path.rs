//! Accessor paths such as `data.items[2].id`.
//!
//! The root is the empty path and renders as `$`. Failure paths and
//! `MalformedPattern` paths are built with these helpers.

pub const ROOT: &str = "";

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Path of an object member.
pub fn key(parent: &str, key: &str) -> String {
    if !is_identifier(key) {
        let quoted = serde_json::Value::String(key.to_string());
        return format!("{parent}[{quoted}]");
    }
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Path of an array element.
pub fn index(parent: &str, idx: usize) -> String {
    format!("{parent}[{idx}]")
}

/// Printable form of a path.
pub fn display(path: &str) -> &str {
    if path.is_empty() {
        "$"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_path() {
        let items = key(ROOT, "data");
        let items = key(&items, "items");
        let second = index(&items, 2);
        assert_eq!(key(&second, "id"), "data.items[2].id");
    }

    #[test]
    fn test_quoted_keys() {
        assert_eq!(key("a", "with space"), "a[\"with space\"]");
        assert_eq!(key(ROOT, "1st"), "[\"1st\"]");
    }

    #[test]
    fn test_root_display() {
        assert_eq!(display(ROOT), "$");
        assert_eq!(display("id"), "id");
    }
}
