/// Drops anything between `<` and `>` and decodes the few entities rich-text
/// editors emit.
pub fn strip_html(input: &str) -> String {
    let mut result = String::new();
    let mut inside_tag = false;

    for c in input.chars() {
        if c == '<' {
            inside_tag = true;
        } else if c == '>' {
            inside_tag = false;
        } else if !inside_tag {
            result.push(c);
        }
    }

    result
        .trim()
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Greedy word wrap by character count.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            let projected = current_line.chars().count() + word.chars().count() + 1;
            if projected > max_chars && !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        }
        lines.push(current_line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// `"Maria  Santos"` -> `"Maria_Santos"`, used in attachment file names.
pub fn underscore_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        assert_eq!(strip_html("<p>Hello&nbsp;<b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("  plain  "), "plain");
    }

    #[test]
    fn wrap_text_respects_width_and_paragraphs() {
        let lines = wrap_text("one two three four\nfive", 9);
        assert_eq!(lines, vec!["one two", "three", "four", "five"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn file_names_use_underscores() {
        assert_eq!(underscore_whitespace("Maria  Dela Cruz"), "Maria_Dela_Cruz");
    }
}
