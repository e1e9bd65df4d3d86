//! Raw HTTP/1.1 request-line formatter (spec.md §4.8): `<METHOD>
//! <fullPath> HTTP/1.1` followed by a `Host:` header, the way a developer
//! would paste a request into a raw socket or an HTTP file.

use crate::config::RenderConfig;
use crate::http::HttpRequest;

pub fn render_raw_http(request: &HttpRequest, config: &RenderConfig) -> String {
    let host = strip_scheme(&config.curl_host);
    format!("{} {} HTTP/1.1\nHost: {host}", request.method, request.full_path)
}

fn strip_scheme(origin: &str) -> &str {
    origin.strip_prefix("https://").or_else(|| origin.strip_prefix("http://")).unwrap_or(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn renders_request_line_and_host_header() {
        let request = HttpRequest {
            method: Method::GET,
            path: "/books".into(),
            params: Vec::new(),
            full_path: "/books?limit=10".into(),
        };
        let rendered = render_raw_http(&request, &RenderConfig::default());
        assert_eq!(rendered, "GET /books?limit=10 HTTP/1.1\nHost: localhost:3000");
    }
}
