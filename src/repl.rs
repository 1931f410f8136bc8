/// A line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Load a new document, replacing the corpus
    Upload(String),
    Clear,
    Status,
    Quit,
    Question(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let lower = line.to_lowercase();

        match lower.as_str() {
            "" => return ReplCommand::Empty,
            "quit" | "exit" | "q" => return ReplCommand::Quit,
            "clear" => return ReplCommand::Clear,
            "status" => return ReplCommand::Status,
            _ => {}
        }

        if lower.starts_with("upload ") {
            let path = line.get("upload ".len()..).unwrap_or("").trim();
            if !path.is_empty() {
                return ReplCommand::Upload(path.to_string());
            }
        }

        ReplCommand::Question(line.to_string())
    }
}
