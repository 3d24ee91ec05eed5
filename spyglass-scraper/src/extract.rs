//! String-scanning extraction for server-list markup.
//!
//! The listing sites render plain server tables; scanning for the few
//! landmarks we need beats pulling in a full HTML parser. Markup that does
//! not carry those landmarks is an extraction error, not a skip: a layout
//! change should fail the scrape loudly.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("no server table in page markup")]
    MissingTable,

    #[error("malformed server row: {0}")]
    MalformedRow(&'static str),
}

/// One server row as it appears on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub name: String,
    /// Lowercased `host:port`; a missing port defaults to 25565
    pub address: String,
    /// Site-relative link to the server's detail page
    pub href: String,
}

/// Pull every server row out of a listing page.
pub fn extract_rows(html: &str) -> Result<Vec<ServerRow>, ExtractError> {
    let table = slice_between(html, "<tbody", "</tbody>").ok_or(ExtractError::MissingTable)?;

    let mut rows = Vec::new();
    let mut from = 0;
    while let Some((start, end)) = next_block(table, "<tr", "</tr>", from) {
        from = end;
        rows.push(parse_row(&table[start..end])?);
    }

    if rows.is_empty() {
        return Err(ExtractError::MissingTable);
    }
    Ok(rows)
}

/// Read the last page number from the pagination block. `None` when the
/// page carries no pagination at all.
pub fn max_page(html: &str) -> Option<u32> {
    let pagination = slice_between(html, "class=\"pagination\"", "</ul>")?;

    let mut last = None;
    let mut from = 0;
    while let Some(at) = pagination[from..].find("href=\"") {
        let start = from + at + 6;
        let end = pagination[start..].find('"')? + start;
        from = end;
        let href = &pagination[start..end];
        if let Some(page) = href.rsplit('/').next().and_then(|n| n.parse().ok()) {
            last = Some(page);
        }
    }
    last
}

fn parse_row(row: &str) -> Result<ServerRow, ExtractError> {
    let address = attr(row, "data-clipboard-text")
        .ok_or(ExtractError::MalformedRow("no copyable address"))?;

    let name_at = row
        .find("server-name")
        .ok_or(ExtractError::MalformedRow("no server-name cell"))?;
    let anchor_start = row[name_at..]
        .find("<a")
        .map(|i| i + name_at)
        .ok_or(ExtractError::MalformedRow("no name anchor"))?;
    let open_end = row[anchor_start..]
        .find('>')
        .map(|i| i + anchor_start + 1)
        .ok_or(ExtractError::MalformedRow("unclosed name anchor"))?;
    let close = row[open_end..]
        .find("</a>")
        .map(|i| i + open_end)
        .ok_or(ExtractError::MalformedRow("unterminated name anchor"))?;

    let href = attr(&row[anchor_start..open_end], "href")
        .unwrap_or_default()
        .to_string();
    let name = strip_tags(&row[open_end..close]);

    let mut address = address.to_lowercase();
    if !address.contains(':') {
        address.push_str(":25565");
    }

    Ok(ServerRow {
        name,
        address,
        href,
    })
}

/// Content between the first `open` tag and the next `close` marker.
fn slice_between<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let at = s.find(open)?;
    let after = s[at..].find('>')? + at + 1;
    let end = s[after..].find(close)? + after;
    Some(&s[after..end])
}

/// Byte span of the next `open`..`close` block at or after `from`.
fn next_block(s: &str, open: &str, close: &str, from: usize) -> Option<(usize, usize)> {
    let start = s.get(from..)?.find(open)? + from;
    let end = s[start..].find(close)? + start + close.len();
    Some((start, end))
}

/// First `name="..."` value in the fragment.
fn attr<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let start = fragment.find(&pattern)? + pattern.len();
    let end = fragment[start..].find('"')? + start;
    Some(&fragment[start..end])
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    out.trim().to_string()
}
