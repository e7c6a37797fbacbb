//! Rendered page endpoint.
//!
//! Serves the last rendered output with the live reload client appended.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::state::AppState;

const BODY_CLOSE: &str = "</body>";

/// Client that reloads the page when the server sends `reload`.
const RELOAD_SCRIPT: &str = r"
<script>
const evtSource = new EventSource('/events');
evtSource.onmessage = function(event) {
	if (event.data === 'reload') {
		evtSource.close();
		setTimeout(() => location.reload(), 100);
	}
};
evtSource.onerror = function() {
	console.log('Live reload connection lost, retrying...');
};
</script>
";

/// Handle GET / and any unmatched path.
///
/// An unreadable output file is reported in the page itself with status 200,
/// so the browser keeps its event stream and reloads once a render succeeds.
pub(crate) async fn get_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = match tokio::fs::read_to_string(&state.output_path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                path = %state.output_path.display(),
                error = %e,
                "Failed to read output file"
            );
            format!("<html><body><h1>Error reading output file: {e}</h1></body></html>")
        }
    };

    Html(inject_reload_script(&content))
}

/// Insert the reload client before the last `</body>`.
///
/// Documents without `</body>` are returned unchanged.
pub(crate) fn inject_reload_script(html: &str) -> String {
    let Some(index) = html.rfind(BODY_CLOSE) else {
        return html.to_owned();
    };

    let mut result = String::with_capacity(html.len() + RELOAD_SCRIPT.len());
    result.push_str(&html[..index]);
    result.push_str(RELOAD_SCRIPT);
    result.push_str(&html[index..]);
    result
}
