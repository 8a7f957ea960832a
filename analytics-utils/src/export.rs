use serde_json::Value;

/// Formats rows into comma-separated text with an explicit column order.
///
/// Absent and null fields serialize as empty; composite values as their
/// canonical JSON text; everything else as its plain text form. A field
/// containing a comma, double quote, or newline is wrapped in double quotes
/// with embedded quotes doubled, so a standard CSV reader reproduces the
/// original value exactly.
pub fn to_csv(rows: &[Value], columns: &[&str]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(columns.join(","));

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .map(|column| escape(&field_text(row.get(*column))))
            .collect();
        lines.push(line.join(","));
    }

    lines.join("\n")
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(composite @ (Value::Object(_) | Value::Array(_))) => composite.to_string(),
        Some(scalar) => scalar.to_string(),
    }
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Minimal conforming CSV reader: splits one line into fields, honoring
    /// quoting and doubled quotes.
    fn read_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut chars = line.chars().peekable();
        let mut quoted = false;

        while let Some(c) = chars.next() {
            match c {
                '"' if quoted => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        quoted = false;
                    }
                }
                '"' if field.is_empty() => quoted = true,
                ',' if !quoted => {
                    fields.push(std::mem::take(&mut field));
                }
                c => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    #[test]
    fn header_then_one_line_per_row() {
        let rows = vec![
            json!({"name": "page_click", "count": 3}),
            json!({"name": "cta_clicked", "count": 1}),
        ];
        let csv = to_csv(&rows, &["name", "count"]);
        assert_eq!(csv, "name,count\npage_click,3\ncta_clicked,1");
    }

    #[test]
    fn absent_and_null_fields_are_empty() {
        let rows = vec![json!({"rating": null, "sessionId": "s-1"})];
        let csv = to_csv(&rows, &["rating", "text", "sessionId"]);
        assert_eq!(csv.lines().nth(1).unwrap(), ",,s-1");
    }

    #[test]
    fn composite_values_serialize_as_json_text() {
        let rows = vec![json!({"meta": {"label": "hero", "n": 2}})];
        let csv = to_csv(&rows, &["meta"]);
        let line = csv.lines().nth(1).unwrap();
        let fields = read_line(line);
        let parsed: Value = serde_json::from_str(&fields[0]).unwrap();
        assert_eq!(parsed, json!({"label": "hero", "n": 2}));
    }

    #[test]
    fn awkward_values_round_trip_through_a_standard_reader() {
        let awkward = [
            "plain",
            "with,comma",
            "with \"quotes\"",
            "multi\nline",
            "\",\"\n",
        ];
        for original in awkward {
            let rows = vec![json!({"text": original, "after": "next"})];
            let csv = to_csv(&rows, &["text", "after"]);
            let body = csv.split_once('\n').unwrap().1;
            let fields = read_line(body);
            assert_eq!(fields, vec![original.to_string(), "next".to_string()]);
        }
    }
}
