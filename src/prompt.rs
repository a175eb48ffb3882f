// Wraps the journal entry in the feedback prompt sent to the model
pub fn build_prompt(journal_entry: &str) -> String {
    format!(
        "A person wrote this journal entry:\n\n\"{journal_entry}\"\n\n\
         Please give supportive, kind mental health feedback, \
         suggesting 1–2 helpful coping ideas or reflections."
    )
}

const FENCE: &str = "```";

// Trims the model output, unwrapping it when the whole reply is one fenced block
pub fn clean_reply(raw: &str) -> String {
    let text = raw.trim();
    unfence(text).unwrap_or(text).trim().to_string()
}

// Opening and closing fence only come off together. The opening one may carry an
// info string like ```markdown
fn unfence(text: &str) -> Option<&str> {
    let inner = text.strip_prefix(FENCE)?.strip_suffix(FENCE)?;

    let body = match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(char::is_whitespace) => body,
        _ => inner,
    };

    // more fences inside means several blocks, not one wrapper
    if body.contains(FENCE) {
        return None;
    }
    Some(body)
}
