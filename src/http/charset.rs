//! Content-Type charset normalization.
//!
//! Some servers send `Content-Type: text/html; charset="utf-8"`. Decoders
//! downstream look the charset label up verbatim, so quote characters in the
//! label make decoding fail. [`fix_invalid_charset`] strips them in place.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};

/// Strip quote characters from the `charset` parameter of `Content-Type`.
///
/// Returns `true` if the header was rewritten. Missing header, a value that
/// is not visible ASCII, or a missing/empty charset all leave the headers
/// untouched. Applying the fix twice is the same as applying it once.
pub fn fix_invalid_charset(headers: &mut HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let Some(fixed) = strip_charset_quotes(content_type) else {
        return false;
    };

    match HeaderValue::from_str(&fixed) {
        Ok(value) => {
            tracing::debug!(original = %content_type, fixed = %fixed, "fixed quoted charset");
            headers.insert(CONTENT_TYPE, value);
            true
        }
        Err(_) => false,
    }
}

/// Charset label from the `Content-Type` header, if any.
pub fn charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type
        .split(';')
        .skip(1)
        .filter_map(split_param)
        .find(|(name, _)| name.eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Rebuild a Content-Type value with the charset unquoted.
/// `None` when there is nothing to fix.
fn strip_charset_quotes(content_type: &str) -> Option<String> {
    let mut segments = content_type.split(';');
    let media_type = segments.next()?.trim();

    let mut changed = false;
    let mut params = Vec::new();
    for segment in segments {
        match split_param(segment) {
            Some((name, value))
                if name.eq_ignore_ascii_case("charset")
                    && !value.is_empty()
                    && value.contains('"') =>
            {
                changed = true;
                let unquoted = value.replace('"', "");
                let unquoted = unquoted.trim();
                // A label made only of quotes carries no charset at all.
                if !unquoted.is_empty() {
                    params.push(format!("{}={}", name, unquoted));
                }
            }
            _ => {
                let segment = segment.trim();
                if !segment.is_empty() {
                    params.push(segment.to_string());
                }
            }
        }
    }

    if !changed {
        return None;
    }

    let mut fixed = media_type.to_string();
    for param in params {
        fixed.push_str("; ");
        fixed.push_str(&param);
    }
    Some(fixed)
}

fn split_param(segment: &str) -> Option<(&str, &str)> {
    let (name, value) = segment.split_once('=')?;
    Some((name.trim(), value.trim()))
}
