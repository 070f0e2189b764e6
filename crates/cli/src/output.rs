//! Output formatting: a plain table for humans, raw JSON for scripts (§6).

/// Output format selection, toggled by the root `--json` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print an action's JSON result in the selected format.
///
/// `Human` renders a JSON array of flat objects as an aligned table (the common case
/// for query actions that return a row list); anything else — a single object, a
/// scalar, a deeper structure — falls back to pretty-printed JSON even in `Human` mode,
/// since there is no table projection for it.
pub fn print_result(format: OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap_or_default());
        }
        OutputFormat::Human => match rows_as_table(value) {
            Some((headers, rows)) => print_table(&headers, &rows),
            None => println!("{}", serde_json::to_string_pretty(value).unwrap_or_default()),
        },
    }
}

fn rows_as_table(value: &serde_json::Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let items = value.as_array()?;
    if items.is_empty() {
        return Some((Vec::new(), Vec::new()));
    }
    let mut headers: Vec<String> = Vec::new();
    for item in items {
        let obj = item.as_object()?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let rows = items
        .iter()
        .map(|item| {
            let obj = item.as_object().expect("checked above");
            headers
                .iter()
                .map(|h| match obj.get(h) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                })
                .collect()
        })
        .collect();
    Some((headers, rows))
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(col_count)
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Print an [`epicenter_core::action::ActionError`]-shaped failure to stderr.
pub fn print_error(code: &str, message: &str) {
    eprintln!("error [{code}]: {message}");
}
