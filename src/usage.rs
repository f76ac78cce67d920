//! Human-readable listings of every field and where it can be set from.

use std::collections::BTreeSet;

use crate::flat::FieldDescriptor;

pub(crate) const USAGE_TAG: &str = "usage";

const FIELD_HEADER: &str = "field";
const SECRET_TAG: &str = "secret";
const CHECK: &str = "✅";
const GUTTER: usize = 4;

fn weight(header: &str) -> u8 {
    match header {
        FIELD_HEADER => 1,
        "flag" => 3,
        "env" => 4,
        USAGE_TAG => 99,
        _ => 98,
    }
}

/// Column headers: `field`, then every metadata key recorded on `fields`.
fn headers(fields: &[FieldDescriptor<'_>]) -> Vec<String> {
    let keys: BTreeSet<&str> = fields
        .iter()
        .flat_map(|field| field.meta().keys().map(String::as_str))
        .collect();

    let mut headers = vec![FIELD_HEADER.to_string()];
    headers.extend(keys.into_iter().map(str::to_string));
    headers.sort_by(|a, b| weight(a).cmp(&weight(b)).then_with(|| a.cmp(b)));
    headers
}

fn cell(field: &FieldDescriptor<'_>, header: &str) -> String {
    let secret = field.tag(SECRET_TAG).is_some();
    match header {
        FIELD_HEADER => field.name().to_string(),
        "default" if secret => String::new(),
        "default" => field.render(),
        SECRET_TAG if secret => CHECK.to_string(),
        _ => match field.meta().get(header).map(String::as_str) {
            None | Some("-") => String::new(),
            Some(flag) if header == "flag" => format!("--{flag}"),
            Some(value) => value.to_string(),
        },
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Render the `Supported Fields:` table.
///
/// Every column but the last is padded to its widest cell plus a four-space
/// gutter. The `default` column shows current values, blank for secrets.
pub fn render_usage(fields: &[FieldDescriptor<'_>]) -> String {
    let headers = headers(fields);

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(fields.len() + 2);
    rows.push(headers.iter().map(|h| h.to_uppercase()).collect());
    rows.push(headers.iter().map(|h| "-".repeat(width(h).max(5))).collect());
    for field in fields {
        rows.push(headers.iter().map(|h| cell(field, h)).collect());
    }

    let mut widths = vec![0; headers.len()];
    for row in &rows {
        for (i, text) in row.iter().enumerate() {
            widths[i] = widths[i].max(width(text));
        }
    }

    let mut out = String::from("\nSupported Fields:\n");
    for row in &rows {
        let last = row.len() - 1;
        for (i, text) in row.iter().enumerate() {
            out.push_str(text);
            if i < last {
                out.push_str(&" ".repeat(widths[i] + GUTTER - width(text)));
            }
        }
        out.push('\n');
    }
    out
}

fn code(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("`{value}`")
    }
}

fn icon(value: bool) -> String {
    let icon = if value { CHECK } else { " " };
    icon.to_string()
}

/// Render a markdown table documenting every field by environment variable.
///
/// Uses the `env` metadata when present, the upper-snake field name otherwise.
pub fn render_markdown(fields: &[FieldDescriptor<'_>]) -> String {
    let mut table: Vec<Vec<String>> = vec![[
        "**Name**",
        "**Required**",
        "**Secret**",
        "**Default value**",
        "**Usage**",
        "**Example**",
    ]
    .map(str::to_string)
    .to_vec()];

    for field in fields {
        let env = field
            .meta()
            .get("env")
            .filter(|name| name.as_str() != "-")
            .cloned()
            .unwrap_or_else(|| field.env_name());
        let required = field.tag("required").is_some()
            || field.tag("validate").is_some_and(|rules| rules.contains("required"));
        let secret = field.tag(SECRET_TAG).is_some();
        let default = if secret { String::new() } else { field.render() };

        table.push(vec![
            format!("`{env}`"),
            icon(required),
            icon(secret),
            code(&default),
            field.tag(USAGE_TAG).unwrap_or_default().to_string(),
            code(field.tag("example").unwrap_or_default()),
        ]);
    }

    let mut sizes = vec![0; table[0].len()];
    for row in &table {
        for (i, text) in row.iter().enumerate() {
            sizes[i] = sizes[i].max(width(text) + 2);
        }
    }

    let mut out = String::new();
    for (i, row) in table.iter().enumerate() {
        out.push('|');
        for (j, text) in row.iter().enumerate() {
            out.push(' ');
            out.push_str(text);
            out.push(' ');
            out.push_str(&" ".repeat(sizes[j] - width(text) - 2));
            out.push('|');
        }
        out.push('\n');

        if i == 0 {
            out.push('|');
            for size in &sizes {
                out.push_str(&"-".repeat(*size));
                out.push('|');
            }
            out.push('\n');
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::view;
    use crate::Schema;

    #[derive(Schema, Default)]
    struct Db {
        pub host: String,
        #[config(secret, usage = "database password")]
        pub password: String,
    }

    #[derive(Schema, Default)]
    struct App {
        #[config(usage = "listen port", required, example = "8080")]
        pub port: u16,
        pub db: Db,
    }

    // ===========================================
    // Usage table
    // ===========================================

    #[test]
    fn test_headers_are_weighted() {
        let mut app = App::default();
        let mut fields = view(&mut app).unwrap();
        for field in fields.iter_mut() {
            let meta = field.meta_mut();
            meta.insert("usage".to_string(), String::new());
            meta.insert("zeta".to_string(), String::new());
            meta.insert("env".to_string(), String::new());
            meta.insert("default".to_string(), String::new());
            meta.insert("flag".to_string(), String::new());
        }
        assert_eq!(
            headers(&fields),
            vec!["field", "flag", "env", "default", "zeta", "usage"]
        );
    }

    #[test]
    fn test_render_usage_table() {
        let mut app = App {
            port: 8080,
            db: Db {
                host: "db.local".to_string(),
                password: "hunter2".to_string(),
            },
        };
        let mut fields = view(&mut app).unwrap();
        for field in fields.iter_mut() {
            let flag = crate::naming::flag_name(field.name());
            let env = field.env_name();
            let usage = field.tag(USAGE_TAG).unwrap_or_default().to_string();
            let meta = field.meta_mut();
            meta.insert("flag".to_string(), flag);
            meta.insert("env".to_string(), env);
            meta.insert("default".to_string(), String::new());
            meta.insert("usage".to_string(), usage);
        }

        let expected = [
            "",
            "Supported Fields:",
            "FIELD          FLAG             ENV            DEFAULT     USAGE",
            "-----          -----            -----          -------     -----",
            "port           --port           PORT           8080        listen port",
            "db.host        --db-host        DB_HOST        db.local    ",
            "db.password    --db-password    DB_PASSWORD                database password",
            "",
        ]
        .join("\n");
        assert_eq!(render_usage(&fields), expected);
    }

    #[test]
    fn test_render_usage_without_meta() {
        let mut app = App::default();
        let fields = view(&mut app).unwrap();
        assert_eq!(
            render_usage(&fields),
            "\nSupported Fields:\nFIELD\n-----\nport\ndb.host\ndb.password\n"
        );
    }

    // ===========================================
    // Markdown
    // ===========================================

    #[test]
    fn test_render_markdown() {
        let mut app = App {
            port: 8080,
            db: Db {
                host: String::new(),
                password: "hunter2".to_string(),
            },
        };
        let mut fields = view(&mut app).unwrap();
        fields[0]
            .meta_mut()
            .insert("env".to_string(), "APP_PORT".to_string());

        let markdown = render_markdown(&fields);
        let lines: Vec<&str> = markdown.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("| **Name**"));
        assert!(lines[1].starts_with("|---"));
        assert!(lines[2].starts_with("| `APP_PORT` "));
        assert!(lines[2].contains("`8080`"));
        assert!(lines[2].contains("listen port"));
        assert!(lines[3].starts_with("| `DB_HOST` "));
        assert!(lines[4].starts_with("| `DB_PASSWORD` "));
        assert!(!lines[4].contains("hunter2"));
        assert_eq!(lines[2].matches(CHECK).count(), 1);
        assert_eq!(lines[4].matches(CHECK).count(), 1);

        let widths: Vec<usize> = lines.iter().map(|line| width(line)).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }
}
