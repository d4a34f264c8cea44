//! Response metadata delivered ahead of the body.

/// Status line and headers of a response, available before any body content
/// has been read.
///
/// The bridge treats the head as opaque cargo for the headers gate; the
/// accessors here mirror what callers typically inspect before deciding
/// whether to drain the body.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// All values for `name`, compared case-insensitively.
    pub fn get_header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The declared `content-length`, if present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.get_header("content-length")
            .first()
            .and_then(|v| v.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> ResponseHead {
        ResponseHead {
            status: 200,
            headers: vec![
                ("Content-Length".into(), "42".into()),
                ("Set-Cookie".into(), "a=1".into()),
                ("set-cookie".into(), "b=2".into()),
            ],
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        assert_eq!(head().get_header("SET-COOKIE"), vec!["a=1", "b=2"]);
        assert!(head().get_header("etag").is_empty());
    }

    #[test]
    fn content_length_parses() {
        assert_eq!(head().content_length(), Some(42));
        let mut malformed = head();
        malformed.headers[0].1 = "many".into();
        assert_eq!(malformed.content_length(), None);
    }
}
