use strum::EnumString;

#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum Command {
    #[strum(serialize = "/start", serialize = "/help")]
    Help,
    #[strum(serialize = "/wake")]
    Wake,
    #[strum(serialize = "/wakeonly")]
    WakeOnly,
    #[strum(serialize = "/status")]
    Status,
    #[strum(serialize = "/check")]
    Check,
    #[strum(serialize = "/timing")]
    Timing,
    #[strum(serialize = "/ping")]
    Ping,
    #[strum(serialize = "/clear")]
    Clear,
    #[strum(default)]
    Unknown(String),
}

impl Command {
    /// Matches the trimmed text exactly; anything else is [Command::Unknown].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        text.parse()
            .unwrap_or_else(|_| Command::Unknown(text.to_string()))
    }
}
