use axum::response::Html;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Document Conversion API</title>
<style>body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; } code { background: #f2f2f2; padding: 0 .25rem; }</style>
</head>
<body>
<h1>Document Conversion API</h1>
<p>Converts Word documents to PDF and PDF documents to Word.</p>
<h2>Endpoints</h2>
<ul>
<li><code>POST /convert/word-to-pdf</code>: upload a <code>.doc</code> or <code>.docx</code> as multipart field <code>file</code>, receive the PDF.</li>
<li><code>POST /convert/pdf-to-word</code>: upload a <code>.pdf</code> as multipart field <code>file</code>, receive a <code>.docx</code>.</li>
<li><code>POST /api/convert/{word-to-pdf|pdf-to-word|pdf-to-doc}</code>: queue a conversion and receive a task id.</li>
<li><code>GET /api/convert/task/status?taskId=&lt;id&gt;</code>: task status.</li>
<li><code>GET /api/convert/task/&lt;id&gt;/download</code>: converted file of a completed task.</li>
</ul>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
