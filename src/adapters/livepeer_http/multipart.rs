//! Minimal `multipart/mixed` reader for broadcaster responses

use bytes::Bytes;

/// One body part with its headers (names lower-cased)
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Part {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Boundary parameter of a `multipart/*` content type
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Whether the bytes after a boundary match close the delimiter line
///
/// A delimiter is followed by `--`, or by optional spaces/tabs then CRLF.
fn ends_delimiter(rest: &[u8]) -> bool {
    if rest.starts_with(b"--") {
        return true;
    }
    let padding = rest.iter().take_while(|b| **b == b' ' || **b == b'\t').count();
    rest[padding..].starts_with(b"\r\n")
}

/// Next occurrence of `delimiter` that is a whole delimiter line
fn find_delimiter(body: &[u8], delimiter: &[u8], mut from: usize) -> Option<usize> {
    loop {
        let at = find(body, delimiter, from)?;
        if ends_delimiter(&body[at + delimiter.len()..]) {
            return Some(at);
        }
        from = at + 1;
    }
}

fn parse_headers(raw: &[u8]) -> Vec<(String, String)> {
    String::from_utf8_lossy(raw)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect()
}

/// Split `body` into its parts, in order
///
/// Part bodies are zero-copy slices of `body`.
pub fn parse(body: &Bytes, boundary: &str) -> Result<Vec<Part>, String> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let inner_delimiter = format!("\r\n--{}", boundary).into_bytes();

    let mut pos = find_delimiter(body, &delimiter, 0).ok_or("missing opening boundary")?;
    let mut parts = Vec::new();

    loop {
        pos += delimiter.len();
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }

        let line_end = find(body, b"\r\n", pos).ok_or("truncated boundary line")?;
        let headers_start = line_end + 2;
        let (headers, content_start) = if body[headers_start..].starts_with(b"\r\n") {
            (Vec::new(), headers_start + 2)
        } else {
            let headers_end =
                find(body, b"\r\n\r\n", headers_start).ok_or("truncated part headers")?;
            (
                parse_headers(&body[headers_start..headers_end]),
                headers_end + 4,
            )
        };

        let content_end =
            find_delimiter(body, &inner_delimiter, content_start).ok_or("missing closing boundary")?;
        parts.push(Part {
            headers,
            body: body.slice(content_start..content_end),
        });
        pos = content_end + 2;
    }
}
