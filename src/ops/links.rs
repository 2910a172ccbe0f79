use std::sync::LazyLock;

use regex::Regex;

use crate::model::note::Note;

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]|]+)(?:\|[^\[\]]*)?\]\]").expect("valid link regex"));

/// Titles linked from `content` via `[[Title]]` or `[[Title|label]]`, in order
/// of first appearance, without duplicates.
pub fn extract_links(content: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cap in WIKI_LINK.captures_iter(content) {
        let title = cap[1].trim().to_string();
        if title.is_empty() {
            continue;
        }
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&title)) {
            out.push(title);
        }
    }
    out
}

fn same_title(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Notes whose content links to `target`'s title. A note never backlinks itself.
pub fn backlinks<'a>(notes: &'a [Note], target: &Note) -> Vec<&'a Note> {
    notes
        .iter()
        .filter(|n| n.id != target.id)
        .filter(|n| {
            extract_links(&n.content)
                .iter()
                .any(|t| same_title(t, &target.title))
        })
        .collect()
}

/// Resolve the outgoing links of `source` to existing notes. Links to titles
/// with no matching note are returned in the second list.
pub fn outgoing<'a>(notes: &'a [Note], source: &Note) -> (Vec<&'a Note>, Vec<String>) {
    let mut found = Vec::new();
    let mut dangling = Vec::new();
    for title in extract_links(&source.content) {
        match notes.iter().find(|n| same_title(&n.title, &title)) {
            Some(note) => found.push(note),
            None => dangling.push(title),
        }
    }
    (found, dangling)
}
