//! Console rendering of message summaries.
//!
//! Fixed, numbered, human-readable blocks; no machine-readable mode.

use crate::graph::MessageSummary;

/// Renders one message as a numbered block. `index` is 1-based.
#[must_use]
pub fn render_message(index: usize, message: &MessageSummary) -> String {
    format!(
        "--- Email {index} ---\n\
         From:    {}\n\
         Subject: {}\n\
         Date:    {}\n\
         Preview: {}",
        message.sender, message.subject, message.received, message.preview
    )
}

/// Renders the whole list, blocks separated by blank lines.
#[must_use]
pub fn render_list(messages: &[MessageSummary]) -> String {
    if messages.is_empty() {
        return "No messages found.\n".to_string();
    }

    let blocks: Vec<String> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| render_message(i + 1, message))
        .collect();

    format!("{}\n", blocks.join("\n\n"))
}

/// Prints the list to standard output.
pub fn print_list(messages: &[MessageSummary]) {
    print!("{}", render_list(messages));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(n: &str) -> MessageSummary {
        MessageSummary {
            sender: format!("{n}@example.com"),
            subject: format!("subject {n}"),
            received: "2026-08-23T10:00:00Z".to_string(),
            preview: format!("preview {n}"),
        }
    }

    #[test]
    fn test_single_block_layout() {
        let rendered = render_message(1, &summary("alice"));
        assert_eq!(
            rendered,
            "--- Email 1 ---\n\
             From:    alice@example.com\n\
             Subject: subject alice\n\
             Date:    2026-08-23T10:00:00Z\n\
             Preview: preview alice"
        );
    }

    #[test]
    fn test_blocks_are_numbered_in_order() {
        let rendered = render_list(&[summary("a"), summary("b")]);

        let first = rendered.find("--- Email 1 ---").unwrap_or(usize::MAX);
        let second = rendered.find("--- Email 2 ---").unwrap_or(usize::MAX);
        assert!(first < second);
        assert!(rendered.contains("From:    a@example.com"));
        assert!(rendered.contains("From:    b@example.com"));
        assert!(rendered.ends_with("preview b\n"));
    }

    #[test]
    fn test_empty_fields_still_render() {
        let blank = MessageSummary {
            sender: String::new(),
            subject: String::new(),
            received: String::new(),
            preview: String::new(),
        };
        let rendered = render_message(3, &blank);
        assert!(rendered.starts_with("--- Email 3 ---\n"));
        assert!(rendered.contains("From:    \n"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(render_list(&[]), "No messages found.\n");
    }
}
