use crate::render::Grid;

/// Quote only when the value holds a comma, quote or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Header line then one line per row, each terminated by `\n`.
pub fn to_csv(grid: &Grid) -> String {
    let mut out = String::new();
    for row in grid.text_rows() {
        let line: Vec<String> = row.iter().map(|v| escape_field(v)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Cell, GridRow};

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("$34.00"), "$34.00");
        assert_eq!(escape_field("Morgan Stanley, Goldman Sachs"), "\"Morgan Stanley, Goldman Sachs\"");
        assert_eq!(escape_field("5\" wide"), "\"5\"\" wide\"");
        assert_eq!(escape_field("a\nb"), "\"a\nb\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_to_csv() {
        let grid = Grid {
            headers: vec!["Company Name".into(), "Lead Bookrunners".into()],
            rows: vec![GridRow {
                key: "Rubrik".into(),
                logo_ticker: None,
                cells: vec![Cell::plain("Rubrik"), Cell::plain("Goldman Sachs, Barclays")],
            }],
            pinned_first_column: true,
            logo_column: None,
        };
        assert_eq!(
            to_csv(&grid),
            "Company Name,Lead Bookrunners\nRubrik,\"Goldman Sachs, Barclays\"\n"
        );
    }
}
