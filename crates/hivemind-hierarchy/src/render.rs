//! ASCII rendering of the tree. Pure presentation, deterministic for
//! the same tree and cursor.

use crate::tree::{HierarchyNode, HierarchyTree};

const MAX_CONTENT_WIDTH: usize = 55;

fn truncate(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_WIDTH {
        return content.to_string();
    }
    let cut: String = content.chars().take(MAX_CONTENT_WIDTH - 3).collect();
    format!("{cut}...")
}

fn render_node(
    node: &HierarchyNode,
    prefix: &str,
    connector: &str,
    cursor: Option<&str>,
    out: &mut String,
) {
    let cursor_mark = if cursor == Some(node.id.as_str()) {
        "  <- cursor"
    } else {
        ""
    };
    out.push_str(&format!(
        "{prefix}{connector}[{}] {} {}{}\n",
        node.level,
        node.status.marker(),
        truncate(&node.content),
        cursor_mark,
    ));

    let child_prefix = if connector.is_empty() {
        prefix.to_string()
    } else if connector.starts_with("\\") {
        format!("{prefix}    ")
    } else {
        format!("{prefix}|   ")
    };

    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let conn = if i + 1 == count { "\\-- " } else { "|-- " };
        render_node(child, &child_prefix, conn, cursor, out);
    }
}

/// Render the whole tree with `|--`/`\--` connectors and status markers.
pub fn to_ascii_tree(tree: &HierarchyTree) -> String {
    let Some(root) = &tree.root else {
        return "(empty hierarchy)".to_string();
    };
    let mut out = String::new();
    render_node(root, "", "", tree.cursor.as_deref(), &mut out);
    out.trim_end().to_string()
}

/// Markdown body for the active session file.
pub fn to_session_body(tree: &HierarchyTree) -> String {
    format!("## Hierarchy\n\n```text\n{}\n```", to_ascii_tree(tree))
}
