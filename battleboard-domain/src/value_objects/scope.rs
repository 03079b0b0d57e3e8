// Grouping scope for per-battle rollups

use crate::entities::PlayerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Alliance,
    Guild,
}

impl Scope {
    pub fn key_of<'a>(&self, player: &'a PlayerSnapshot) -> &'a str {
        match self {
            Scope::Alliance => player.alliance_name.as_str(),
            Scope::Guild => player.guild_name.as_str(),
        }
    }
}
