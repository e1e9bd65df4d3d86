//! cURL formatter (spec.md §4.8): `curl [-G] <base><path>` followed by one
//! `-d "k=v"` per parameter, each on its own continuation line. `-G` only
//! appears when there's at least one parameter to send as a query string.

use crate::config::RenderConfig;
use crate::http::HttpRequest;

pub fn render_curl(request: &HttpRequest, config: &RenderConfig) -> String {
    let base = config.curl_host.trim_end_matches('/');
    let g_flag = if request.params.is_empty() { "" } else { " -G" };

    if request.params.is_empty() {
        return format!("curl{g_flag} {base}{}", request.path);
    }

    let mut lines = vec![format!("curl{g_flag} {base}{} \\", request.path)];
    let last = request.params.len() - 1;
    for (i, (key, value)) in request.params.iter().enumerate() {
        let continuation = if i == last { "" } else { " \\" };
        lines.push(format!("  -d \"{key}={value}\"{continuation}"));
    }
    lines.join("\n")
}
