use serde::{Deserialize, Serialize};

// POST /gemini request body
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct JournalRequest {
    #[serde(rename = "journalEntry", default)]
    pub journal_entry: Option<String>,
}

impl JournalRequest {
    // The entry, if one was actually written
    pub fn entry(self) -> Option<String> {
        self.journal_entry.filter(|entry| !entry.trim().is_empty())
    }
}

// POST /gemini success body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ReplyResponse {
    pub reply: String,
}
