/// Trims whitespace and trailing commas from a path pasted into a form field.
pub fn clean_path(raw: &str) -> String {
    raw.trim().trim_end_matches(',').trim_end().to_string()
}

/// Same as [`clean_path`] for loosely typed JSON input; anything that is not a
/// string cleans to an empty path.
pub fn clean_path_value(raw: Option<&serde_json::Value>) -> String {
    raw.and_then(serde_json::Value::as_str)
        .map(clean_path)
        .unwrap_or_default()
}

/// Last path segment with its extension removed.
pub fn extract_base_name(path: &str) -> String {
    let file_name = file_name(path);
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name[..dot].to_string(),
        _ => file_name.to_string(),
    }
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of `path` without the trailing slash; empty for bare names.
pub fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(slash) => &path[..slash],
        None => "",
    }
}

/// Lenient `%XX` decoding for names derived from browsed file paths. Malformed
/// escapes are kept verbatim.
pub fn decode_percent(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0usize;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let escaped = std::str::from_utf8(&bytes[index + 1..index + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(value) = escaped {
                decoded.push(value);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8(decoded).unwrap_or_else(|_| raw.to_string())
}
