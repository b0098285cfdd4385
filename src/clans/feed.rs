//! Clan activity feed
//!
//! The feed is an append-only list embedded in the clan document. Entries
//! and comments are never edited or removed; system entries carry no title
//! and no author. Entries are stored in insertion order and returned
//! newest-first; comments within an entry stay oldest-first.

use bson::{oid::ObjectId, DateTime};

use crate::db::schemas::{
    ActivityComment, ActivityEntry, ActivityKind, ClanDoc, COMMENT_MAX_CHARS,
    POST_CONTENT_MAX_CHARS, POST_TITLE_MAX_CHARS,
};
use crate::types::{ArtelError, Result};

/// Append a system-generated entry (clan created, member joined, edits).
pub fn push_system_entry(clan: &mut ClanDoc, kind: ActivityKind, content: &str) {
    clan.activity.push(ActivityEntry {
        id: ObjectId::new(),
        kind,
        title: None,
        content: content.to_string(),
        author_id: None,
        created_at: DateTime::now(),
        likes: 0,
        comments: Vec::new(),
    });
}

/// Append a member-authored post. Title and content are both required.
pub fn add_post(
    clan: &mut ClanDoc,
    author_id: ObjectId,
    title: &str,
    content: &str,
) -> Result<ObjectId> {
    let title = title.trim();
    let content = content.trim();

    if title.is_empty() {
        return Err(ArtelError::Validation("Заголовок обязателен".into()));
    }
    if title.chars().count() > POST_TITLE_MAX_CHARS {
        return Err(ArtelError::Validation("Заголовок слишком длинный".into()));
    }
    if content.is_empty() {
        return Err(ArtelError::Validation("Текст поста обязателен".into()));
    }
    if content.chars().count() > POST_CONTENT_MAX_CHARS {
        return Err(ArtelError::Validation("Текст поста слишком длинный".into()));
    }

    let id = ObjectId::new();
    clan.activity.push(ActivityEntry {
        id,
        kind: ActivityKind::Post,
        title: Some(title.to_string()),
        content: content.to_string(),
        author_id: Some(author_id),
        created_at: DateTime::now(),
        likes: 0,
        comments: Vec::new(),
    });
    Ok(id)
}

/// Append a comment under an existing activity entry.
pub fn add_comment(
    clan: &mut ClanDoc,
    activity_id: &ObjectId,
    author_id: ObjectId,
    content: &str,
) -> Result<ObjectId> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ArtelError::Validation("Текст комментария обязателен".into()));
    }
    if content.chars().count() > COMMENT_MAX_CHARS {
        return Err(ArtelError::Validation("Комментарий слишком длинный".into()));
    }

    let entry = clan
        .activity
        .iter_mut()
        .find(|a| &a.id == activity_id)
        .ok_or_else(|| ArtelError::NotFound("Запись не найдена".into()))?;

    let id = ObjectId::new();
    entry.comments.push(ActivityComment {
        id,
        author_id,
        content: content.to_string(),
        created_at: DateTime::now(),
    });
    Ok(id)
}

/// Feed in display order: newest entry first, by explicit timestamp sort.
pub fn newest_first(clan: &ClanDoc) -> Vec<&ActivityEntry> {
    let mut entries: Vec<&ActivityEntry> = clan.activity.iter().collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{AdmissionPolicy, ClanCategory};

    fn sample_clan() -> ClanDoc {
        ClanDoc::new(
            "Hikers".to_string(),
            "hikers".to_string(),
            "We hike".to_string(),
            ClanCategory::Sport,
            "Novosibirsk".to_string(),
            AdmissionPolicy::Open,
            ObjectId::new(),
        )
    }

    #[test]
    fn test_system_entry_has_no_author_or_title() {
        let mut clan = sample_clan();
        push_system_entry(&mut clan, ActivityKind::Change, "Клан обновлён");

        let entry = clan.activity.last().unwrap();
        assert_eq!(entry.kind, ActivityKind::Change);
        assert!(entry.title.is_none());
        assert!(entry.author_id.is_none());
        assert!(entry.comments.is_empty());
    }

    #[test]
    fn test_add_post() {
        let mut clan = sample_clan();
        let author = clan.leader_id;

        let id = add_post(&mut clan, author, "Поход в субботу", "Сбор в 9:00").unwrap();
        let entry = clan.activity.iter().find(|a| a.id == id).unwrap();
        assert_eq!(entry.kind, ActivityKind::Post);
        assert_eq!(entry.title.as_deref(), Some("Поход в субботу"));
        assert_eq!(entry.author_id, Some(author));
        assert_eq!(entry.likes, 0);
    }

    #[test]
    fn test_add_post_requires_title_and_content() {
        let mut clan = sample_clan();
        let author = clan.leader_id;

        assert!(matches!(
            add_post(&mut clan, author, "", "text"),
            Err(ArtelError::Validation(_))
        ));
        assert!(matches!(
            add_post(&mut clan, author, "title", "   "),
            Err(ArtelError::Validation(_))
        ));
        assert!(clan.activity.is_empty());
    }

    #[test]
    fn test_add_post_length_limits() {
        let mut clan = sample_clan();
        let author = clan.leader_id;
        let long_title = "а".repeat(POST_TITLE_MAX_CHARS + 1);

        assert!(matches!(
            add_post(&mut clan, author, &long_title, "text"),
            Err(ArtelError::Validation(_))
        ));
    }

    #[test]
    fn test_add_comment() {
        let mut clan = sample_clan();
        let author = clan.leader_id;
        let post_id = add_post(&mut clan, author, "Поход", "Сбор в 9:00").unwrap();

        let commenter = ObjectId::new();
        add_comment(&mut clan, &post_id, commenter, "Я приду").unwrap();

        let entry = clan.activity.iter().find(|a| a.id == post_id).unwrap();
        assert_eq!(entry.comments.len(), 1);
        assert_eq!(entry.comments[0].author_id, commenter);
        assert_eq!(entry.comments[0].content, "Я приду");
    }

    #[test]
    fn test_add_comment_unknown_entry_not_found() {
        let mut clan = sample_clan();
        assert!(matches!(
            add_comment(&mut clan, &ObjectId::new(), ObjectId::new(), "text"),
            Err(ArtelError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_comment_empty_rejected() {
        let mut clan = sample_clan();
        let leader_id = clan.leader_id;
        let post_id = add_post(&mut clan, leader_id, "Поход", "Сбор").unwrap();
        assert!(matches!(
            add_comment(&mut clan, &post_id, ObjectId::new(), "  "),
            Err(ArtelError::Validation(_))
        ));
    }

    #[test]
    fn test_comments_keep_insertion_order() {
        let mut clan = sample_clan();
        let leader_id = clan.leader_id;
        let post_id = add_post(&mut clan, leader_id, "Поход", "Сбор").unwrap();
        add_comment(&mut clan, &post_id, ObjectId::new(), "первый").unwrap();
        add_comment(&mut clan, &post_id, ObjectId::new(), "второй").unwrap();

        let entry = clan.activity.iter().find(|a| a.id == post_id).unwrap();
        assert_eq!(entry.comments[0].content, "первый");
        assert_eq!(entry.comments[1].content, "второй");
    }

    #[test]
    fn test_newest_first_ordering() {
        let mut clan = sample_clan();
        for i in 0..3 {
            clan.activity.push(ActivityEntry {
                id: ObjectId::new(),
                kind: ActivityKind::Post,
                title: None,
                content: format!("entry {}", i),
                author_id: None,
                created_at: DateTime::from_millis(1_700_000_000_000 + i),
                likes: 0,
                comments: Vec::new(),
            });
        }

        let ordered = newest_first(&clan);
        assert_eq!(ordered[0].content, "entry 2");
        assert_eq!(ordered[2].content, "entry 0");
    }
}
