//! Field-by-field reconciliation of cached players against remote docs.
//!
//! Nothing here touches storage. Each function returns an explicit diff the
//! caller applies and persists.

use crate::models::{Cosmetics, Player, PlayerId, Region};
use crate::remote::{MasteryDoc, PlayerDoc};

/// How a cached player's identity differs from the remote doc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityDrift {
    None,
    /// Same username, different canonical id.
    IdMismatch { cached: PlayerId, remote: PlayerId },
    /// Same id, a different name.
    UsernameChange { old: String, new: String },
    /// Same id and name, different casing.
    CaseChange { old: String, new: String },
}

/// Classify drift in priority order: id, then username, then casing.
///
/// Ghost records have no id to compare and only drift by name.
pub fn identity_drift(cached: &Player, remote: &PlayerDoc) -> IdentityDrift {
    if let Some(id) = cached.id() {
        if id != &remote.player_id {
            return IdentityDrift::IdMismatch {
                cached: id.clone(),
                remote: remote.player_id.clone(),
            };
        }
    }

    if !cached.has_username(&remote.username) {
        return IdentityDrift::UsernameChange {
            old: cached.username.clone(),
            new: remote.username.clone(),
        };
    }

    if cached.username != remote.username {
        return IdentityDrift::CaseChange {
            old: cached.username.clone(),
            new: remote.username.clone(),
        };
    }

    IdentityDrift::None
}

/// One changed profile field with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    CurrentXp(u64),
    Cosmetics(Cosmetics),
    SocialUrl(Option<String>),
    DiscordId(String),
    Tags(Vec<String>),
    Status(Option<String>),
    Region(Region),
}

impl FieldChange {
    pub fn field(&self) -> &'static str {
        match self {
            FieldChange::CurrentXp(_) => "current_xp",
            FieldChange::Cosmetics(_) => "cosmetics",
            FieldChange::SocialUrl(_) => "social_url",
            FieldChange::DiscordId(_) => "discord_id",
            FieldChange::Tags(_) => "tags",
            FieldChange::Status(_) => "status",
            FieldChange::Region(_) => "region",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDiff {
    pub changes: Vec<FieldChange>,
}

impl ProfileDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.changes.iter().map(FieldChange::field).collect()
    }

    pub fn apply(&self, player: &mut Player) {
        for change in &self.changes {
            match change {
                FieldChange::CurrentXp(xp) => player.current_xp = Some(*xp),
                FieldChange::Cosmetics(cosmetics) => player.cosmetics = cosmetics.clone(),
                FieldChange::SocialUrl(url) => player.social_url = url.clone(),
                FieldChange::DiscordId(id) => player.discord_id = Some(id.clone()),
                FieldChange::Tags(tags) => player.tags = tags.clone(),
                FieldChange::Status(status) => player.status = status.clone(),
                FieldChange::Region(region) => player.region = *region,
            }
        }
    }
}

fn cosmetics_of(doc: &PlayerDoc) -> Cosmetics {
    Cosmetics {
        emoticon_id: doc.emoticon_id.clone(),
        logo_id: doc.logo_id.clone(),
        title_id: doc.title_id.clone(),
        nameplate_id: doc.nameplate_id.clone(),
    }
}

/// Discord binding change, if the doc carries a different id.
pub fn discord_change(player: &Player, doc: &PlayerDoc) -> Option<FieldChange> {
    let remote = doc.discord_id()?;
    if player.discord_id.as_deref() == Some(remote) {
        return None;
    }
    Some(FieldChange::DiscordId(remote.to_string()))
}

/// Every profile field the remote state disagrees on.
///
/// `mastery` and `region` are optional; when absent the matching fields are
/// left alone.
pub fn profile_diff(
    player: &Player,
    doc: &PlayerDoc,
    mastery: Option<&MasteryDoc>,
    region: Option<Region>,
) -> ProfileDiff {
    let mut changes = Vec::new();

    if let Some(mastery) = mastery {
        if player.current_xp != Some(mastery.current_level_xp) {
            changes.push(FieldChange::CurrentXp(mastery.current_level_xp));
        }
    }

    let cosmetics = cosmetics_of(doc);
    if player.cosmetics != cosmetics {
        changes.push(FieldChange::Cosmetics(cosmetics));
    }

    if player.social_url != doc.social_url {
        changes.push(FieldChange::SocialUrl(doc.social_url.clone()));
    }

    if let Some(change) = discord_change(player, doc) {
        changes.push(change);
    }

    if player.tags != doc.tags {
        changes.push(FieldChange::Tags(doc.tags.clone()));
    }

    if player.status != doc.player_status {
        changes.push(FieldChange::Status(doc.player_status.clone()));
    }

    if let Some(region) = region {
        if player.region != region {
            changes.push(FieldChange::Region(region));
        }
    }

    ProfileDiff { changes }
}
