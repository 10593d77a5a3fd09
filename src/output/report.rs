use super::{escape_markup, TableRow};
use crate::model::BatchSummary;

/// Keeps serialized JSON inert inside a `<script>` element. These three
/// characters only ever occur inside JSON strings, where the `\u` forms
/// decode to the same text.
fn json_for_script_tag(value: &str) -> String {
    value
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

fn escape_html(value: &str) -> String {
    escape_markup(value, "&#39;")
}

fn render_rows(rows: &[TableRow]) -> String {
    let mut out = String::new();
    for r in rows {
        out.push_str(&format!(
            r#"              <tr class="hover:bg-slate-50 dark:hover:bg-slate-800/30 transition-colors">
                <td class="px-6 py-4 text-sm font-mono font-bold break-all">{id}</td>
                <td class="px-6 py-4"><span class="{class} px-3 py-1 rounded-lg text-xs font-bold">{label}</span></td>
                <td class="px-6 py-4 text-sm font-medium text-slate-600 dark:text-slate-400">{error}</td>
              </tr>
"#,
            id = escape_html(&r.id),
            class = r.status.class(),
            label = r.status.label(),
            error = escape_html(&r.error),
        ));
    }
    out
}

fn render_top_errors(summary: &BatchSummary) -> String {
    if summary.top_errors.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "      <ul class=\"mb-8 text-sm text-slate-600 dark:text-slate-400 list-disc pl-6\">\n",
    );
    for e in &summary.top_errors {
        out.push_str(&format!(
            "        <li><span class=\"font-bold\">{}</span>: {}</li>\n",
            e.count,
            escape_html(&e.message)
        ));
    }
    out.push_str("      </ul>\n");
    out
}

/// Standalone HTML page for the rendered table.
pub fn render_html(rows: &[TableRow], summary: &BatchSummary, invalid_only: bool) -> Vec<u8> {
    let json = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
    let json = json_for_script_tag(&json);
    let view = if invalid_only {
        "invalid only"
    } else {
        "all results"
    };

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>Invoice QC Report</title>
  <script src="https://cdn.tailwindcss.com?plugins=forms,container-queries"></script>
  <link href="https://fonts.googleapis.com/css2?family=Montserrat:wght@700;800&amp;family=Inter:wght@400;500;600;700&amp;display=swap" rel="stylesheet"/>
  <style type="text/tailwindcss">
    body {{
      font-family: 'Inter', sans-serif;
    }}
    h1, h2, h3 {{
      font-family: 'Montserrat', sans-serif;
      font-weight: 800;
      letter-spacing: -0.025em;
    }}
    .status-valid {{
      @apply bg-emerald-50 text-emerald-700 border border-emerald-200;
    }}
    .status-invalid {{
      @apply bg-rose-50 text-rose-700 border border-rose-200;
    }}
  </style>
</head>
<body class="bg-slate-50 dark:bg-slate-900 text-slate-900 dark:text-slate-100 min-h-screen">
  <script type="application/json" id="records-data">{json}</script>
  <div class="flex h-full grow flex-col">
    <header class="flex items-center justify-between border-b border-slate-200 dark:border-slate-800 bg-white dark:bg-slate-900 px-8 py-4">
      <h2 class="text-xl uppercase tracking-tight">Invoice QC Report</h2>
      <span class="text-xs font-bold uppercase text-slate-500">{view}</span>
    </header>

    <main class="flex-1 max-w-[1440px] mx-auto w-full px-8 py-10">
      <div class="flex flex-wrap gap-6 mb-8">
        <p class="text-sm font-bold">{total} TOTAL</p>
        <p class="text-sm font-bold text-emerald-700">{valid} VALID</p>
        <p class="text-sm font-bold text-rose-700">{invalid} INVALID</p>
      </div>
{top_errors}
      <div class="bg-white dark:bg-slate-900 border border-slate-200 dark:border-slate-800 rounded-2xl overflow-hidden shadow-sm">
        <div class="overflow-x-auto">
          <table id="resultsTable" class="w-full text-left border-collapse">
            <thead>
              <tr class="bg-slate-50 dark:bg-slate-800/50 border-b border-slate-200 dark:border-slate-800">
                <th class="px-6 py-5 text-[11px] uppercase tracking-widest">Invoice</th>
                <th class="px-6 py-5 text-[11px] uppercase tracking-widest">Status</th>
                <th class="px-6 py-5 text-[11px] uppercase tracking-widest">Error</th>
              </tr>
            </thead>
            <tbody class="divide-y divide-slate-100 dark:divide-slate-800">
{rows}            </tbody>
          </table>
        </div>
      </div>
    </main>
  </div>
</body>
</html>
"####,
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        top_errors = render_top_errors(summary),
        rows = render_rows(rows),
    );

    html.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationResult;
    use crate::output::Status;

    #[test]
    fn html_escapes_ids_and_errors() {
        let rows = vec![TableRow {
            id: "<script>alert(1)</script>.pdf".to_string(),
            status: Status::Invalid,
            error: "total & tax don't match".to_string(),
        }];
        let html = String::from_utf8(render_html(&rows, &BatchSummary::default(), false)).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;.pdf"));
        assert!(html.contains("total &amp; tax don&#39;t match"));
        assert!(!html.contains("break-all\"><script>"));
        // embedded data cannot close its script tag
        assert!(html.contains(r"\u003c/script\u003e"));
    }

    fn records_blob(html: &str) -> &str {
        let start = html.find(r#"id="records-data">"#).unwrap() + r#"id="records-data">"#.len();
        let len = html[start..].find("</script>").unwrap();
        &html[start..start + len]
    }

    #[test]
    fn embedded_data_cannot_open_comments_or_scripts() {
        let rows = vec![TableRow {
            id: "<!--<script>x.pdf".to_string(),
            status: Status::Invalid,
            error: "a & b > c".to_string(),
        }];
        let html = String::from_utf8(render_html(&rows, &BatchSummary::default(), false)).unwrap();
        let blob = records_blob(&html);
        assert!(!blob.contains("<!--"));
        assert!(!blob.contains('<'));
        assert!(!blob.contains('>'));
        assert!(!blob.contains('&'));

        let decoded: serde_json::Value = serde_json::from_str(blob).unwrap();
        assert_eq!(decoded[0]["id"], "<!--<script>x.pdf");
        assert_eq!(decoded[0]["error"], "a & b > c");
        // the table after the data element still renders
        assert!(html.contains("&lt;!--&lt;script&gt;x.pdf"));
    }

    #[test]
    fn html_rows_carry_status_classes() {
        let results = vec![
            ValidationResult::valid_invoice("INV1"),
            ValidationResult::invalid_file("f.pdf", "bad total"),
        ];
        let rows: Vec<TableRow> = results.iter().map(TableRow::from).collect();
        let summary = BatchSummary::from_results(&results);
        let html = String::from_utf8(render_html(&rows, &summary, true)).unwrap();
        assert!(html.contains(r#"<span class="status-valid px-3"#));
        assert!(html.contains(r#"<span class="status-invalid px-3"#));
        assert!(html.contains(">VALID</span>"));
        assert!(html.contains(">INVALID</span>"));
        assert!(html.contains("1 INVALID"));
        assert!(html.contains("invalid only"));
        assert!(html.find("INV1") < html.find("f.pdf"));
    }
}
