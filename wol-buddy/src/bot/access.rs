use clap::Args;
use wake_crab::notify::Identity;

#[derive(Args, Clone, Debug)]
#[group(id = "access")]
pub struct Params {
    /// Identities allowed to talk to the bot, comma separated. Everyone else is turned away.
    #[arg(long, env = "ALLOWED_USERS", value_delimiter = ',', required = true)]
    pub allowed_users: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Whitelist {
    allowed: Vec<Identity>,
}

impl Whitelist {
    pub fn new(allowed: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allows(&self, who: &Identity) -> bool {
        self.allowed.contains(who)
    }
}

impl From<&Params> for Whitelist {
    fn from(params: &Params) -> Self {
        Self::new(
            params
                .allowed_users
                .iter()
                .map(|it| it.trim())
                .filter(|it| !it.is_empty())
                .map(Identity::new),
        )
    }
}
