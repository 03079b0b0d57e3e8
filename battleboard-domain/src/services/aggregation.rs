use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::entities::{
    AllianceInput,
    AllianceRollup,
    BattleDetail,
    GuildInput,
    GuildRollup,
    KillEvent,
    PlayerRollup,
    PlayerSnapshot,
};
use crate::value_objects::Scope;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleAggregate {
    pub alliances: Vec<AllianceRollup>,
    pub guilds: Vec<GuildRollup>,
    pub players: Vec<PlayerRollup>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub kills: i64,
    pub kill_fame: i64,
    pub deaths: i64,
    pub death_fame: i64,
}

pub fn aggregate_battle(
    alliances: &[AllianceInput],
    guilds: &[GuildInput],
    start_time: i64,
    kills: &[KillEvent],
) -> BattleAggregate {
    BattleAggregate {
        alliances: alliance_rollups(alliances, kills),
        guilds: guild_rollups(guilds, kills),
        players: player_rollups(start_time, kills),
    }
}

pub fn alliance_inputs(battle: &BattleDetail) -> Vec<AllianceInput> {
    let start_time = battle.start_time.timestamp_millis();
    battle
        .alliances
        .values()
        .map(|alliance| AllianceInput {
            alliance_id: alliance.id.clone(),
            name: alliance.name.clone(),
            start_time,
        })
        .collect()
}

pub fn guild_inputs(battle: &BattleDetail) -> Vec<GuildInput> {
    let start_time = battle.start_time.timestamp_millis();
    battle
        .guilds
        .values()
        .map(|guild| GuildInput {
            guild_id: guild.id.clone(),
            name: guild.name.clone(),
            alliance_id: guild.alliance_id.clone(),
            alliance_name: guild.alliance.clone(),
            start_time,
        })
        .collect()
}

pub fn dedupe_kills(kills: Vec<KillEvent>) -> Vec<KillEvent> {
    let mut seen = HashSet::new();
    kills
        .into_iter()
        .filter(|event| seen.insert(event.event_id))
        .collect()
}

pub fn alliance_rollups(inputs: &[AllianceInput], kills: &[KillEvent]) -> Vec<AllianceRollup> {
    let members = members_by_scope(kills, Scope::Alliance);
    let tallies = tally_by(kills, |player| Scope::Alliance.key_of(player));
    inputs
        .iter()
        .map(|input| {
            let roster = members.get(&input.name);
            let tally = tallies.get(&input.name).copied().unwrap_or_default();
            AllianceRollup {
                alliance_id: input.alliance_id.clone(),
                name: input.name.clone(),
                start_time: input.start_time,
                players: roster.map(|r| r.len() as i64).unwrap_or(0),
                kills: tally.kills,
                kill_fame: tally.kill_fame,
                deaths: tally.deaths,
                death_fame: tally.death_fame,
                average_ip: roster.map(|r| average_item_power(r.values())).unwrap_or(0.0),
            }
        })
        .collect()
}

pub fn guild_rollups(inputs: &[GuildInput], kills: &[KillEvent]) -> Vec<GuildRollup> {
    let members = members_by_scope(kills, Scope::Guild);
    let tallies = tally_by(kills, |player| Scope::Guild.key_of(player));
    inputs
        .iter()
        .map(|input| {
            let roster = members.get(&input.name);
            let tally = tallies.get(&input.name).copied().unwrap_or_default();
            GuildRollup {
                guild_id: input.guild_id.clone(),
                name: input.name.clone(),
                alliance_id: input.alliance_id.clone(),
                alliance_name: input.alliance_name.clone(),
                start_time: input.start_time,
                players: roster.map(|r| r.len() as i64).unwrap_or(0),
                kills: tally.kills,
                kill_fame: tally.kill_fame,
                deaths: tally.deaths,
                death_fame: tally.death_fame,
                average_ip: roster.map(|r| average_item_power(r.values())).unwrap_or(0.0),
            }
        })
        .collect()
}

pub fn player_rollups(start_time: i64, kills: &[KillEvent]) -> Vec<PlayerRollup> {
    let players = resolve_players(kills);
    let tallies = tally_by(kills, |player| player.name.as_str());
    let output = combat_output(kills);
    let battle_players = players.len() as i64;

    players
        .iter()
        .map(|(name, snapshot)| {
            let tally = tallies.get(name).copied().unwrap_or_default();
            let (damage, healing) = output.get(name).copied().unwrap_or((0.0, 0.0));
            PlayerRollup {
                player_id: snapshot.id.clone(),
                name: name.clone(),
                start_time,
                alliance_id: snapshot.alliance_id.clone(),
                alliance_name: snapshot.alliance_name.clone(),
                guild_id: snapshot.guild_id.clone(),
                guild_name: snapshot.guild_name.clone(),
                kills: tally.kills,
                kill_fame: tally.kill_fame,
                deaths: tally.deaths,
                death_fame: tally.death_fame,
                weapon: snapshot.main_hand_type().to_string(),
                average_ip: snapshot.average_item_power,
                damage,
                healing,
                battle_players,
            }
        })
        .collect()
}

/// Group members, killer and victim always win over participant snapshots.
pub fn resolve_players(kills: &[KillEvent]) -> IndexMap<String, PlayerSnapshot> {
    let mut players: IndexMap<String, PlayerSnapshot> = IndexMap::new();

    for event in kills {
        let authoritative = event
            .group_members
            .iter()
            .chain(std::iter::once(&event.killer))
            .chain(std::iter::once(&event.victim));
        for player in authoritative {
            if player.is_anonymous() {
                continue;
            }
            players.insert(player.name.clone(), player.clone());
        }
    }

    for event in kills {
        for player in &event.participants {
            if player.is_anonymous() || players.contains_key(&player.name) {
                continue;
            }
            players.insert(player.name.clone(), player.clone());
        }
    }

    players
}

pub fn members_by_scope(
    kills: &[KillEvent],
    scope: Scope,
) -> HashMap<String, IndexMap<String, PlayerSnapshot>> {
    let mut result: HashMap<String, IndexMap<String, PlayerSnapshot>> = HashMap::new();

    for event in kills {
        let everyone = event
            .group_members
            .iter()
            .chain(event.participants.iter())
            .chain(std::iter::once(&event.victim))
            .chain(std::iter::once(&event.killer));
        for player in everyone {
            let key = scope.key_of(player);
            if key.is_empty() || player.is_anonymous() {
                continue;
            }
            let roster = result.entry(key.to_string()).or_default();
            let replace = roster
                .get(&player.name)
                .map(|existing| existing.average_item_power < player.average_item_power)
                .unwrap_or(true);
            if replace {
                roster.insert(player.name.clone(), player.clone());
            }
        }
    }

    result
}

/// Kill, fame and death counters grouped by whatever `key` extracts from a
/// snapshot. Empty keys are never counted.
pub fn tally_by<F>(kills: &[KillEvent], key: F) -> HashMap<String, Tally>
where
    F: Fn(&PlayerSnapshot) -> &str,
{
    let mut result: HashMap<String, Tally> = HashMap::new();

    for event in kills {
        let killer = key(&event.killer);
        if !killer.is_empty() {
            result.entry(killer.to_string()).or_default().kills += 1;
        }

        for member in &event.group_members {
            let member_key = key(member);
            if member_key.is_empty() {
                continue;
            }
            result.entry(member_key.to_string()).or_default().kill_fame += member.kill_fame;
        }

        let victim = key(&event.victim);
        if !victim.is_empty() {
            let entry = result.entry(victim.to_string()).or_default();
            entry.deaths += 1;
            entry.death_fame += event.total_victim_kill_fame;
        }
    }

    result
}

pub fn combat_output(kills: &[KillEvent]) -> HashMap<String, (f64, f64)> {
    let mut result: HashMap<String, (f64, f64)> = HashMap::new();
    for event in kills {
        for participant in &event.participants {
            if participant.is_anonymous() {
                continue;
            }
            let entry = result.entry(participant.name.clone()).or_insert((0.0, 0.0));
            entry.0 += participant.damage_done;
            entry.1 += participant.support_healing_done;
        }
    }
    result
}

// zero item power means the feed did not report it
pub fn average_item_power<'a, I>(players: I) -> f64
where
    I: IntoIterator<Item = &'a PlayerSnapshot>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    for player in players {
        if player.average_item_power > 0.0 {
            count += 1;
            sum += player.average_item_power;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

pub fn top_alliances_by_participation(alliances: &[AllianceRollup]) -> String {
    join_by_participation(alliances.iter().map(|a| (a.name.as_str(), a.players)))
}

pub fn top_guilds_by_participation(guilds: &[GuildRollup]) -> String {
    join_by_participation(guilds.iter().map(|g| (g.name.as_str(), g.players)))
}

fn join_by_participation<'a, I>(entries: I) -> String
where
    I: Iterator<Item = (&'a str, i64)>,
{
    let mut ranked: Vec<(&str, i64)> = entries.filter(|(name, _)| !name.is_empty()).collect();
    // sort_by is stable, so equal counts keep encounter order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(", ")
}
