//! Link insertion as a pure text transformation.
//!
//! New links go at the end of the note's `## Related` section, or into a
//! new `## Related` section appended to the end of the note. Existing
//! lines are never reordered or removed, and line endings are preserved.

/// Heading of the section that collects inserted links.
pub const RELATED_HEADING: &str = "## Related";

/// Wiki-link text for a target note. Ambiguous titles are written as the
/// full id so the link resolves to the intended note.
pub fn link_markup(title: &str, id: &str, ambiguous: bool) -> String {
    if ambiguous {
        format!("[[{}]]", id)
    } else {
        format!("[[{}]]", title)
    }
}

/// Return `content` with `- {link}` added under `## Related`.
pub fn insert_related_link(content: &str, link: &str) -> String {
    let cr = if content.contains("\r\n") { "\r" } else { "" };
    let item = format!("- {}{}", link, cr);
    let mut lines: Vec<&str> = content.split('\n').collect();
    let heading = lines
        .iter()
        .position(|l| l.trim().eq_ignore_ascii_case(RELATED_HEADING));

    let Some(heading) = heading else {
        let nl = format!("{}\n", cr);
        let mut out = content.to_string();
        if !out.is_empty() {
            if !out.ends_with('\n') {
                out.push_str(&nl);
            }
            if !out.ends_with(&format!("\n{}", nl)) {
                out.push_str(&nl);
            }
        }
        out.push_str(RELATED_HEADING);
        out.push_str(&nl);
        out.push_str(&nl);
        out.push_str(&item);
        out.push('\n');
        return out;
    };

    let end = (heading + 1..lines.len())
        .find(|&i| is_section_break(lines[i]))
        .unwrap_or(lines.len());
    let last = (heading..end)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .unwrap_or(heading);

    if last == heading {
        lines.insert(last + 1, cr);
        lines.insert(last + 2, &item);
    } else {
        lines.insert(last + 1, &item);
    }
    lines.join("\n")
}

/// A level-1 or level-2 heading ends the Related section.
fn is_section_break(line: &str) -> bool {
    let t = line.trim_end();
    t == "#" || t == "##" || t.starts_with("# ") || t.starts_with("## ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_markup() {
        assert_eq!(link_markup("Rust", "thoughts/Rust", false), "[[Rust]]");
        assert_eq!(link_markup("Rust", "thoughts/Rust", true), "[[thoughts/Rust]]");
    }

    #[test]
    fn test_appends_new_section() {
        assert_eq!(
            insert_related_link("# Note\n\nBody", "[[X]]"),
            "# Note\n\nBody\n\n## Related\n\n- [[X]]\n"
        );
        assert_eq!(
            insert_related_link("Body\n", "[[X]]"),
            "Body\n\n## Related\n\n- [[X]]\n"
        );
        assert_eq!(insert_related_link("", "[[X]]"), "## Related\n\n- [[X]]\n");
    }

    #[test]
    fn test_extends_existing_section() {
        let before = "Intro\n\n## Related\n\n- [[A]]\n\n## Log\nentry\n";
        assert_eq!(
            insert_related_link(before, "[[X]]"),
            "Intro\n\n## Related\n\n- [[A]]\n- [[X]]\n\n## Log\nentry\n"
        );
    }

    #[test]
    fn test_subheadings_stay_inside_section() {
        let before = "## Related\n- [[A]]\n### People\n- [[B]]\n";
        assert_eq!(
            insert_related_link(before, "[[X]]"),
            "## Related\n- [[A]]\n### People\n- [[B]]\n- [[X]]\n"
        );
    }

    #[test]
    fn test_empty_section() {
        assert_eq!(
            insert_related_link("Body\n## Related\n", "[[X]]"),
            "Body\n## Related\n\n- [[X]]\n"
        );
    }

    #[test]
    fn test_crlf_preserved() {
        let before = "Body\r\n## Related\r\n- [[A]]\r\n";
        assert_eq!(
            insert_related_link(before, "[[X]]"),
            "Body\r\n## Related\r\n- [[A]]\r\n- [[X]]\r\n"
        );
    }

    #[test]
    fn test_crlf_new_section() {
        assert_eq!(
            insert_related_link("Body\r\n", "[[X]]"),
            "Body\r\n\r\n## Related\r\n\r\n- [[X]]\r\n"
        );
    }

    #[test]
    fn test_existing_content_is_kept() {
        let before = "---\ntitle: t\n---\n# T\n\nsome [[link]]\n";
        let after = insert_related_link(before, "[[X]]");
        assert!(after.starts_with(before));
    }
}
