//! CRUD operations for [`Note`] records.

use std::collections::HashMap;

use rusqlite::params;

use notehub_shared::types::NoteId;

use crate::database::{decode_ts, decode_uuid, encode_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::Note;

const NOTE_COLUMNS: &str = "id, file_name, file_url, file_path, regulation, year, topic, subject, \
                            subject_code, description, channel, uploaded_by, uploaded_at";

impl Database {
    pub fn insert_note(&self, note: &Note) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO notes ({NOTE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                note.id.to_string(),
                note.file_name,
                note.file_url,
                note.file_path,
                note.regulation,
                note.year,
                note.topic,
                note.subject,
                note.subject_code,
                note.description,
                note.channel,
                note.uploaded_by,
                encode_ts(&note.uploaded_at),
            ],
        )?;
        Ok(())
    }

    pub fn note_by_id(&self, id: NoteId) -> Result<Note> {
        self.conn()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id.to_string()],
                row_to_note,
            )
            .map_err(StoreError::from_lookup)
    }

    /// Every note, newest upload first.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY uploaded_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], row_to_note)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Resolve a list of note ids, keeping the order of `ids`. Ids with no
    /// matching record are skipped.
    pub fn notes_by_ids(&self, ids: &[NoteId]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id IN ({placeholders})"
        ))?;
        let keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let rows = stmt.query_map(rusqlite::params_from_iter(keys.iter()), row_to_note)?;

        let mut by_id = HashMap::with_capacity(ids.len());
        for row in rows {
            let note = row?;
            by_id.insert(note.id, note);
        }

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let id_str: String = row.get(0)?;
    let uploaded_str: String = row.get(12)?;

    Ok(Note {
        id: NoteId(decode_uuid(0, &id_str)?),
        file_name: row.get(1)?,
        file_url: row.get(2)?,
        file_path: row.get(3)?,
        regulation: row.get(4)?,
        year: row.get(5)?,
        topic: row.get(6)?,
        subject: row.get(7)?,
        subject_code: row.get(8)?,
        description: row.get(9)?,
        channel: row.get(10)?,
        uploaded_by: row.get(11)?,
        uploaded_at: decode_ts(12, &uploaded_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::database::now_utc;

    fn note(name: &str, uploaded_at: chrono::DateTime<Utc>) -> Note {
        Note {
            id: NoteId::new(),
            file_name: name.to_string(),
            file_url: format!("https://blobs.example/notes/{name}"),
            file_path: format!("notes/{name}"),
            regulation: "R2021".into(),
            year: "2".into(),
            topic: "Graphs".into(),
            subject: "Data Structures".into(),
            subject_code: "CS3301".into(),
            description: String::new(),
            channel: "none".into(),
            uploaded_by: "a@x.org".into(),
            uploaded_at,
        }
    }

    #[test]
    fn insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let n = note("unit1.pdf", now_utc());
        db.insert_note(&n).unwrap();
        assert_eq!(db.note_by_id(n.id).unwrap(), n);
        assert!(matches!(
            db.note_by_id(NoteId::new()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let now = now_utc();
        let old = note("old.pdf", now - Duration::hours(2));
        let mid = note("mid.pdf", now - Duration::hours(1));
        let new = note("new.pdf", now);

        db.insert_note(&mid).unwrap();
        db.insert_note(&new).unwrap();
        db.insert_note(&old).unwrap();

        let names: Vec<_> = db
            .list_notes()
            .unwrap()
            .into_iter()
            .map(|n| n.file_name)
            .collect();
        assert_eq!(names, vec!["new.pdf", "mid.pdf", "old.pdf"]);
    }

    #[test]
    fn resolve_ids_keeps_order_and_skips_missing() {
        let db = Database::open_in_memory().unwrap();
        let a = note("a.pdf", now_utc());
        let b = note("b.pdf", now_utc());
        db.insert_note(&a).unwrap();
        db.insert_note(&b).unwrap();

        let resolved = db.notes_by_ids(&[b.id, NoteId::new(), a.id]).unwrap();
        assert_eq!(resolved, vec![b, a]);
        assert!(db.notes_by_ids(&[]).unwrap().is_empty());
    }
}
