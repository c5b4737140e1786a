//! Human-facing entry page served at `/`.

// crates.io
use axum::response::Html;

/// Renders a GraphiQL page titled `title` that sends queries to `endpoint`.
pub fn entry_page(title: &str, endpoint: &str) -> Html<String> {
	let title = escape_html(title);
	let endpoint = serde_json::to_string(endpoint).unwrap_or_else(|_| "\"/query\"".into());

	Html(format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/graphiql@3/graphiql.min.css">
<style>body {{ margin: 0; height: 100vh; }} #graphiql {{ height: 100vh; }}</style>
</head>
<body>
<div id="graphiql">Loading {title}...</div>
<script src="https://unpkg.com/react@18/umd/react.production.min.js" crossorigin></script>
<script src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js" crossorigin></script>
<script src="https://unpkg.com/graphiql@3/graphiql.min.js" crossorigin></script>
<script>
const fetcher = GraphiQL.createFetcher({{ url: new URL({endpoint}, window.location.href).toString() }});
ReactDOM.createRoot(document.getElementById("graphiql")).render(
	React.createElement(GraphiQL, {{ fetcher, shouldPersistHeaders: true }}),
);
</script>
</body>
</html>
"#
	))
}

fn escape_html(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			c => escaped.push(c),
		}
	}

	escaped
}
