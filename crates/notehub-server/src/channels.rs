//! Channel workflow: creation, joining by code, listing, details and
//! member removal.
//!
//! Member and note counts are recomputed on every read. Member entries are
//! snapshots taken at join time and are not refreshed afterwards.

use serde::Serialize;
use tracing::{debug, info, warn};

use notehub_shared::constants::CHANNEL_CODE_MAX_ATTEMPTS;
use notehub_shared::invite::is_valid_channel_code;
use notehub_shared::types::{ChannelId, UserId};
use notehub_store::{now_utc, Channel, ChannelMember, Database, StoreError};

use crate::accounts::find_user;
use crate::error::ServerError;
use crate::notes::ChannelNoteView;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
    pub code: String,
    pub created_by: String,
    pub member_count: usize,
    pub note_count: usize,
    /// Whether the requesting user is an admin of the channel.
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub code: String,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct ChannelDetails {
    pub channel: ChannelInfo,
    pub members: Vec<MemberView>,
    pub notes: Vec<ChannelNoteView>,
}

fn summarize(db: &Database, channel: Channel, is_admin: bool) -> Result<ChannelSummary, ServerError> {
    let (member_count, note_count) = db.channel_counts(channel.id)?;
    Ok(ChannelSummary {
        id: channel.id,
        name: channel.name,
        code: channel.code,
        created_by: channel.created_by,
        member_count,
        note_count,
        is_admin,
    })
}

fn find_channel(db: &Database, id: ChannelId) -> Result<Channel, ServerError> {
    match db.channel_by_id(id) {
        Ok(channel) => Ok(channel),
        Err(StoreError::NotFound) => Err(ServerError::ChannelNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Draw codes from `next_code` until one is not used by any channel.
pub fn generate_unique_code<F>(db: &Database, mut next_code: F) -> Result<String, ServerError>
where
    F: FnMut() -> String,
{
    for attempt in 1..=CHANNEL_CODE_MAX_ATTEMPTS {
        let code = next_code();
        if !db.channel_code_exists(&code)? {
            return Ok(code);
        }
        debug!(attempt, "Channel code collision, drawing again");
    }
    Err(ServerError::CodespaceExhausted)
}

pub fn create_channel<F>(
    db: &Database,
    name: &str,
    created_by: &str,
    next_code: F,
) -> Result<ChannelSummary, ServerError>
where
    F: FnMut() -> String,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("Channel name is required".into()));
    }

    let creator = find_user(db, created_by)?;
    let code = generate_unique_code(db, next_code)?;

    let channel = Channel {
        id: ChannelId::new(),
        name: name.to_string(),
        code,
        created_by: creator.email.clone(),
        created_at: now_utc(),
    };
    db.create_channel(&channel, &ChannelMember::from_user(&creator, true))?;
    db.add_joined_channel(creator.id, channel.id)?;

    info!(channel_id = %channel.id, code = %channel.code, creator = %creator.email, "Channel created");

    summarize(db, channel, true)
}

pub fn join_channel(db: &Database, code: &str, email: &str) -> Result<ChannelSummary, ServerError> {
    let user = find_user(db, email)?;

    let code = code.trim();
    if !is_valid_channel_code(code) {
        return Err(ServerError::ChannelNotFound);
    }
    let channel = match db.channel_by_code(code) {
        Ok(channel) => channel,
        Err(StoreError::NotFound) => return Err(ServerError::ChannelNotFound),
        Err(e) => return Err(e.into()),
    };

    let members = db.channel_members(channel.id)?;
    if members.iter().any(|m| m.email == user.email) {
        return Err(ServerError::AlreadyMember);
    }

    db.add_channel_member(channel.id, &ChannelMember::from_user(&user, false))?;
    db.add_joined_channel(user.id, channel.id)?;

    info!(channel_id = %channel.id, user = %user.email, "Joined channel");

    summarize(db, channel, false)
}

/// Channels the user has joined, in join order. Entries pointing at a
/// channel that no longer resolves are skipped.
pub fn list_user_channels(db: &Database, email: &str) -> Result<Vec<ChannelSummary>, ServerError> {
    let user = find_user(db, email)?;

    let mut summaries = Vec::new();
    for channel_id in db.joined_channels(user.id)? {
        let channel = match db.channel_by_id(channel_id) {
            Ok(channel) => channel,
            Err(StoreError::NotFound) => {
                warn!(%channel_id, user = %user.email, "Dangling joined channel");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let is_admin = db
            .channel_members(channel.id)?
            .iter()
            .any(|m| m.email == user.email && m.is_admin);
        summaries.push(summarize(db, channel, is_admin)?);
    }
    Ok(summaries)
}

pub fn channel_details(db: &Database, raw_id: &str) -> Result<ChannelDetails, ServerError> {
    let id = ChannelId::parse(raw_id).ok_or(ServerError::ChannelNotFound)?;
    let channel = find_channel(db, id)?;

    let members = db
        .channel_members(id)?
        .into_iter()
        .map(|m| MemberView {
            id: m.user_id,
            username: m.username,
            email: m.email,
            is_admin: m.is_admin,
        })
        .collect();

    let note_ids = db.channel_note_ids(id)?;
    let notes = db
        .notes_by_ids(&note_ids)?
        .into_iter()
        .map(ChannelNoteView::from)
        .collect();

    Ok(ChannelDetails {
        channel: ChannelInfo {
            id: channel.id,
            name: channel.name,
            code: channel.code,
            created_by: channel.created_by,
        },
        members,
        notes,
    })
}

/// Remove `target_user_id` from the channel on behalf of `requester_email`.
///
/// Only admins may remove members, and the channel's last admin cannot be
/// removed. Removing a user who is not a member succeeds without effect on
/// the member list.
pub fn remove_member(
    db: &Database,
    raw_channel_id: &str,
    raw_target_id: &str,
    requester_email: &str,
) -> Result<(), ServerError> {
    let channel_id = ChannelId::parse(raw_channel_id).ok_or(ServerError::ChannelNotFound)?;
    let channel = find_channel(db, channel_id)?;

    let members = db.channel_members(channel.id)?;
    let requester_is_admin = members
        .iter()
        .any(|m| m.email == requester_email && m.is_admin);
    if !requester_is_admin {
        warn!(channel_id = %channel.id, requester = requester_email, "Non-admin tried to remove a member");
        return Err(ServerError::Forbidden);
    }

    let target_id = UserId::parse(raw_target_id)
        .ok_or_else(|| ServerError::BadRequest("Invalid user id".into()))?;

    let target_is_admin = members.iter().any(|m| m.user_id == target_id && m.is_admin);
    let admin_count = members.iter().filter(|m| m.is_admin).count();
    if target_is_admin && admin_count <= 1 {
        return Err(ServerError::LastAdmin);
    }

    let removed = db.remove_channel_member(channel.id, target_id)?;
    db.remove_joined_channel(target_id, channel.id)?;

    info!(
        channel_id = %channel.id,
        target = %target_id,
        removed,
        "Member removed from channel"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notehub_shared::invite::generate_channel_code;
    use notehub_store::{NewUser, Note};
    use notehub_shared::types::NoteId;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (name, email) in [("alice", "a@x.org"), ("bob", "b@x.org"), ("carol", "c@x.org")] {
            db.create_user(&NewUser {
                username: name.into(),
                email: email.into(),
                password: "pw".into(),
                security_pass: "sec".into(),
            })
            .unwrap();
        }
        db
    }

    fn random_code() -> String {
        generate_channel_code(&mut rand::thread_rng())
    }

    #[test]
    fn test_create_channel() {
        let db = setup();
        let summary = create_channel(&db, "Study", "a@x.org", random_code).unwrap();

        assert!(is_valid_channel_code(&summary.code));
        assert!(summary.is_admin);
        assert_eq!(summary.member_count, 1);
        assert_eq!(summary.note_count, 0);
        assert_eq!(summary.created_by, "a@x.org");

        let alice = db.user_by_email("a@x.org").unwrap();
        assert_eq!(db.joined_channels(alice.id).unwrap(), vec![summary.id]);

        let members = db.channel_members(summary.id).unwrap();
        assert_eq!(members.len(), 1);
        assert!(members[0].is_admin);
    }

    #[test]
    fn test_create_channel_unknown_creator() {
        let db = setup();
        assert!(matches!(
            create_channel(&db, "Study", "nobody@x.org", random_code),
            Err(ServerError::UserNotFound)
        ));
    }

    #[test]
    fn test_create_channel_blank_name() {
        let db = setup();
        assert!(matches!(
            create_channel(&db, "   ", "a@x.org", random_code),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_codes_are_distinct() {
        let db = setup();
        let first = create_channel(&db, "One", "a@x.org", random_code).unwrap();
        let second = create_channel(&db, "Two", "a@x.org", random_code).unwrap();
        assert_ne!(first.code, second.code);
    }

    #[test]
    fn test_code_collision_redraws() {
        let db = setup();
        create_channel(&db, "One", "a@x.org", || "AAAAAAAAAA".to_string()).unwrap();

        let mut candidates = vec!["BBBBBBBBBB", "AAAAAAAAAA"];
        let code = generate_unique_code(&db, || candidates.pop().unwrap().to_string()).unwrap();
        assert_eq!(code, "BBBBBBBBBB");
    }

    #[test]
    fn test_codespace_exhausted() {
        let db = setup();
        create_channel(&db, "One", "a@x.org", || "AAAAAAAAAA".to_string()).unwrap();

        let mut draws = 0;
        let result = generate_unique_code(&db, || {
            draws += 1;
            "AAAAAAAAAA".to_string()
        });
        assert!(matches!(result, Err(ServerError::CodespaceExhausted)));
        assert_eq!(draws, CHANNEL_CODE_MAX_ATTEMPTS);
    }

    #[test]
    fn test_join_channel() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();

        let joined = join_channel(&db, &created.code, "b@x.org").unwrap();
        assert_eq!(joined.id, created.id);
        assert!(!joined.is_admin);
        assert_eq!(joined.member_count, 2);

        assert!(matches!(
            join_channel(&db, &created.code, "b@x.org"),
            Err(ServerError::AlreadyMember)
        ));
        assert_eq!(db.channel_members(created.id).unwrap().len(), 2);
    }

    #[test]
    fn test_join_errors() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();

        assert!(matches!(
            join_channel(&db, &created.code, "nobody@x.org"),
            Err(ServerError::UserNotFound)
        ));
        assert!(matches!(
            join_channel(&db, "ZZZZZZZZZZ", "b@x.org"),
            Err(ServerError::ChannelNotFound)
        ));
        assert!(matches!(
            join_channel(&db, "short", "b@x.org"),
            Err(ServerError::ChannelNotFound)
        ));
    }

    #[test]
    fn test_list_user_channels() {
        let db = setup();
        let own = create_channel(&db, "Mine", "a@x.org", random_code).unwrap();
        let other = create_channel(&db, "Theirs", "b@x.org", random_code).unwrap();
        join_channel(&db, &other.code, "a@x.org").unwrap();

        let list = list_user_channels(&db, "a@x.org").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, own.id);
        assert!(list[0].is_admin);
        assert_eq!(list[1].id, other.id);
        assert!(!list[1].is_admin);
        assert_eq!(list[1].member_count, 2);

        assert!(list_user_channels(&db, "c@x.org").unwrap().is_empty());
        assert!(matches!(
            list_user_channels(&db, "nobody@x.org"),
            Err(ServerError::UserNotFound)
        ));
    }

    #[test]
    fn test_channel_details() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();
        join_channel(&db, &created.code, "b@x.org").unwrap();

        let note = Note {
            id: NoteId::new(),
            file_name: "graphs.pdf".into(),
            file_url: "https://blobs.test/notes/1-graphs.pdf".into(),
            file_path: "notes/1-graphs.pdf".into(),
            regulation: "R20".into(),
            year: "2".into(),
            topic: "Graphs".into(),
            subject: "DS".into(),
            subject_code: "CS201".into(),
            description: String::new(),
            channel: created.id.to_string(),
            uploaded_by: "a@x.org".into(),
            uploaded_at: now_utc(),
        };
        db.insert_note(&note).unwrap();
        db.append_channel_note(created.id, note.id).unwrap();

        let details = channel_details(&db, &created.id.to_string()).unwrap();
        assert_eq!(details.channel.code, created.code);
        assert_eq!(details.members.len(), 2);
        assert_eq!(details.members[1].email, "b@x.org");
        assert_eq!(details.notes.len(), 1);
        assert_eq!(details.notes[0].title, "Graphs");

        assert!(matches!(
            channel_details(&db, "not-an-id"),
            Err(ServerError::ChannelNotFound)
        ));
        assert!(matches!(
            channel_details(&db, &ChannelId::new().to_string()),
            Err(ServerError::ChannelNotFound)
        ));
    }

    #[test]
    fn test_remove_member_by_admin() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();
        join_channel(&db, &created.code, "b@x.org").unwrap();
        let bob = db.user_by_email("b@x.org").unwrap();

        remove_member(&db, &created.id.to_string(), &bob.id.to_string(), "a@x.org").unwrap();

        assert_eq!(db.channel_members(created.id).unwrap().len(), 1);
        assert!(db.joined_channels(bob.id).unwrap().is_empty());
    }

    #[test]
    fn test_remove_member_by_non_admin() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();
        join_channel(&db, &created.code, "b@x.org").unwrap();
        join_channel(&db, &created.code, "c@x.org").unwrap();
        let carol = db.user_by_email("c@x.org").unwrap();

        assert!(matches!(
            remove_member(&db, &created.id.to_string(), &carol.id.to_string(), "b@x.org"),
            Err(ServerError::Forbidden)
        ));
        assert_eq!(db.channel_members(created.id).unwrap().len(), 3);
    }

    #[test]
    fn test_last_admin_cannot_be_removed() {
        let db = setup();
        let created = create_channel(&db, "Study", "a@x.org", random_code).unwrap();
        let alice = db.user_by_email("a@x.org").unwrap();

        assert!(matches!(
            remove_member(&db, &created.id.to_string(), &alice.id.to_string(), "a@x.org"),
            Err(ServerError::LastAdmin)
        ));
        assert_eq!(db.channel_members(created.id).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_member_unknown_channel() {
        let db = setup();
        let bob = db.user_by_email("b@x.org").unwrap();
        assert!(matches!(
            remove_member(&db, &ChannelId::new().to_string(), &bob.id.to_string(), "a@x.org"),
            Err(ServerError::ChannelNotFound)
        ));
    }
}
