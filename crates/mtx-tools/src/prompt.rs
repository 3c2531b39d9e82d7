//! Prompt rendering and reply parsing for text-generation interpreters.

use crate::error::{ToolError, ToolResult};
use crate::interpreter::{InterpretRequest, ProposedChange};

/// Render the prompt sent to a text-generation service.
pub fn render_prompt(request: &InterpretRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You edit the short text fields of the page \"{}\".\n\n",
        request.page_id
    ));
    prompt.push_str("Current fields, one per line as path = JSON string:\n");
    for (path, value) in &request.content {
        let quoted = serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"));
        prompt.push_str(&format!("{path} = {quoted}\n"));
    }
    prompt.push_str(&format!("\nInstruction: {}\n\n", request.instruction.trim()));
    prompt.push_str(
        "Reply with only a JSON array. Each element is an object with \"path\", \
         \"expectedOldValue\" (the current value exactly as listed, or null for a new \
         field), \"newValue\" and a short \"rationale\". Use the listed paths; \
         leave unchanged fields out.\n",
    );
    prompt
}

/// Parse an interpreter reply into proposals.
///
/// Accepts a bare JSON array, or an array inside the first fenced code block
/// (with or without a `json` tag). Text around the array is ignored.
pub fn parse_proposals(reply: &str) -> ToolResult<Vec<ProposedChange>> {
    let body = fenced_block(reply).unwrap_or(reply);
    let start = body.find('[');
    let end = body.rfind(']');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(ToolError::Interpreter(
                "reply does not contain a JSON array".into(),
            ))
        }
    };
    serde_json::from_str(json)
        .map_err(|e| ToolError::Interpreter(format!("reply is not a list of changes: {e}")))
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    // Skip the language tag line.
    let rest = &rest[rest.find('\n')? + 1..];
    let close = rest.find("```")?;
    Some(&rest[..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_types::{FlatMap, PageId};

    #[test]
    fn prompt_lists_fields_and_instruction() {
        let mut content = FlatMap::new();
        content.insert("hero.heading".into(), "Say \"hi\"".into());
        content.insert("features.0.name".into(), "Fast".into());
        let prompt = render_prompt(&InterpretRequest {
            page_id: PageId::parse("home").unwrap(),
            instruction: "  Shorter headings  ".into(),
            content,
        });
        assert!(prompt.contains("page \"home\""));
        assert!(prompt.contains("hero.heading = \"Say \\\"hi\\\"\"\n"));
        assert!(prompt.contains("features.0.name = \"Fast\"\n"));
        assert!(prompt.contains("Instruction: Shorter headings\n"));
    }

    #[test]
    fn bare_array() {
        let changes = parse_proposals(
            r#"[{"path":"a","expectedOldValue":"x","newValue":"y","rationale":"r"}]"#,
        )
        .unwrap();
        assert_eq!(changes, vec![ProposedChange::new("a", Some("x"), "y").with_rationale("r")]);
    }

    #[test]
    fn fenced_block_with_prose() {
        let reply = "Here you go:\n```json\n[{\"path\":\"a\",\"expectedOldValue\":null,\"newValue\":\"y\"}]\n```\nDone [1].";
        let changes = parse_proposals(reply).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].expected_old_value, None);
    }

    #[test]
    fn empty_array_is_no_changes() {
        assert!(parse_proposals("[]").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_interpreter_error() {
        assert!(matches!(
            parse_proposals("I cannot help with that."),
            Err(ToolError::Interpreter(_))
        ));
        assert!(matches!(
            parse_proposals("[{\"nope\": 1}]"),
            Err(ToolError::Interpreter(_))
        ));
    }
}
