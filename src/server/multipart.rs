//! `multipart/form-data` body parsing, just enough for a file upload form.

use crate::error::{AmsError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    /// `Some("")` when the browser submitted the field without choosing a file.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extract the boundary from a `Content-Type` header value.
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// `key=value` parameters of a header such as `Content-Disposition`, after the
/// leading token. Quoted values may contain `;` and backslash escapes.
fn header_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();

    // Skip the disposition type.
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut key = String::new();
        let mut has_value = false;
        for c in chars.by_ref() {
            if c == '=' {
                has_value = true;
                break;
            }
            if c == ';' {
                break;
            }
            key.push(c);
        }
        let key = key.trim().to_lowercase();
        if !has_value {
            // Bare flag parameter, or the end of the header.
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                value.push(c);
            }
            value = value.trim().to_string();
        }

        if !key.is_empty() {
            params.push((key, value));
        }
        if chars.peek().is_none() {
            break;
        }
    }

    params
}

fn disposition_param(header: &str, key: &str) -> Option<String> {
    header_params(header)
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<Part>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();

    let mut pos = find_from(body, &delimiter, 0)
        .ok_or_else(|| AmsError::Request("multipart body has no boundary".to_string()))?
        + delimiter.len();

    loop {
        // "--" right after a delimiter closes the body.
        if body[pos..].starts_with(b"--") {
            break;
        }
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }

        let head_end = find_from(body, b"\r\n\r\n", pos)
            .ok_or_else(|| AmsError::Request("multipart part has no header terminator".to_string()))?;
        let head = String::from_utf8_lossy(&body[pos..head_end]).into_owned();
        let data_start = head_end + 4;

        let mut closing = b"\r\n".to_vec();
        closing.extend_from_slice(&delimiter);
        let data_end = find_from(body, &closing, data_start)
            .ok_or_else(|| AmsError::Request("multipart part is not terminated".to_string()))?;

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;
        for line in head.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim().to_lowercase().as_str() {
                "content-disposition" => {
                    name = disposition_param(value, "name");
                    filename = disposition_param(value, "filename");
                }
                "content-type" => content_type = Some(value.trim().to_string()),
                _ => {}
            }
        }

        parts.push(Part {
            name: name.unwrap_or_default(),
            filename,
            content_type,
            data: body[data_start..data_end].to_vec(),
        });

        pos = data_end + closing.len();
        if pos >= body.len() {
            break;
        }
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, filename, data) in parts {
            out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            let disposition = match filename {
                Some(f) => format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", name, f),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
            };
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        out
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----abc123"),
            Some("----abc123".to_string())
        );
        assert_eq!(boundary("multipart/form-data; boundary=\"q r\""), Some("q r".to_string()));
        assert_eq!(boundary("application/json"), None);
    }

    #[test]
    fn test_parse_file_and_field() {
        let raw = body(
            "XyZ",
            &[("note", None, b"hi"), ("file", Some("orders.csv"), b"a,b\r\n1,2\r\n")],
        );
        let parts = parse(&raw, "XyZ").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "note");
        assert_eq!(parts[0].filename, None);
        assert_eq!(parts[0].data, b"hi");
        assert_eq!(parts[1].filename.as_deref(), Some("orders.csv"));
        assert_eq!(parts[1].data, b"a,b\r\n1,2\r\n");
    }

    #[test]
    fn test_empty_filename_is_kept() {
        let raw = body("b", &[("file", Some(""), b"")]);
        let parts = parse(&raw, "b").unwrap();
        assert_eq!(parts[0].filename.as_deref(), Some(""));
        assert!(parts[0].data.is_empty());
    }

    #[test]
    fn test_quoted_filename_may_contain_semicolons() {
        let raw = body("b", &[("file", Some("orders; v2.csv"), b"x")]);
        let parts = parse(&raw, "b").unwrap();
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[0].filename.as_deref(), Some("orders; v2.csv"));
    }

    #[test]
    fn test_disposition_params() {
        let header = r#" form-data; name=file; filename="a \"b\".csv""#;
        assert_eq!(disposition_param(header, "name"), Some("file".to_string()));
        assert_eq!(disposition_param(header, "filename"), Some("a \"b\".csv".to_string()));
        assert_eq!(disposition_param(" form-data", "name"), None);
        assert_eq!(disposition_param("form-data; flag; name=\"x\"", "name"), Some("x".to_string()));
    }

    #[test]
    fn test_missing_boundary_is_an_error() {
        assert!(parse(b"no parts here", "b").is_err());
    }
}
