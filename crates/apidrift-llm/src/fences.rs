//! Markdown fence handling for model replies.

/// Extract the body of the first fenced code block in `text`.
///
/// The language tag on the opening fence is dropped. An unclosed fence
/// yields everything after it. Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after_open = &trimmed[open + 3..];
    let body = match after_open.find('\n') {
        Some(eol) => &after_open[eol + 1..],
        // Single-line block such as ```code```
        None => after_open,
    };

    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(
            strip_code_fences("  public class A {}\n"),
            "public class A {}"
        );
    }

    #[test]
    fn language_tag_is_dropped() {
        let reply = "```java\nimport java.util.List;\n\npublic class A {}\n```";
        assert_eq!(
            strip_code_fences(reply),
            "import java.util.List;\n\npublic class A {}"
        );
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let reply = "Here is the build file:\n```groovy\nplugins { id 'java' }\n```\nGood luck!";
        assert_eq!(strip_code_fences(reply), "plugins { id 'java' }");
    }

    #[test]
    fn only_the_first_block_is_kept() {
        let reply = "```java\nclass A {}\n```\n```java\nclass B {}\n```";
        assert_eq!(strip_code_fences(reply), "class A {}");
    }

    #[test]
    fn unclosed_fence_keeps_the_rest() {
        assert_eq!(strip_code_fences("```\nclass A {}"), "class A {}");
    }
}
