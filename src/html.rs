use crate::sanitizer::sanitize_graph;

const MERMAID_SCRIPT: &str = "https://cdn.jsdelivr.net/npm/mermaid/dist/mermaid.min.js";

/// Standalone page that renders `chart` in a browser. The chart is sanitized first.
pub fn render_page(chart: &str, title: &str) -> String {
    let chart = escape_html(&sanitize_graph(chart));
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <script src="{MERMAID_SCRIPT}"></script>
    <script>
        mermaid.initialize({{ startOnLoad: true, theme: 'default', securityLevel: 'strict' }});
    </script>
    <style>
        .mermaid {{ width: 100%; height: auto; overflow: auto; }}
    </style>
</head>
<body>
<pre class="mermaid">
{chart}
</pre>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_embeds_sanitized_chart() {
        let page = render_page("```mermaid\ngraph LR\nA[Guard] --> B\n```", "Flow");
        assert!(page.contains("<title>Flow</title>"));
        assert!(page.contains("graph LR\n    A[\"Guard\"] --&gt; B\n</pre>"));
        assert!(!page.contains("```"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
