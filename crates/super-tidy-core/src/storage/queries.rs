use super::models::ManagedFile;
use super::sqlite::Database;
use super::RecordStore;
use crate::error::Error;
use crate::merge::PairLocks;
use crate::model::{Label, LabelId, LabelKind, ReferenceId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const LABEL_COLUMNS: &str = "id, kind, parent_id, text, usage_count, created_at";

fn label_from_row(row: &Row<'_>) -> Result<Label> {
    let kind: String = row.get(1)?;
    let parent_id: Option<i64> = row.get(2)?;
    let kind = match kind.as_str() {
        "tag" => LabelKind::Tag,
        "folder" => LabelKind::Folder { parent: parent_id },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown label kind '{}'", other).into(),
            ))
        }
    };
    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let usage_count: i64 = row.get(4)?;

    Ok(Label {
        id: LabelId(row.get(0)?),
        kind,
        text: row.get(3)?,
        usage_count: usage_count.max(0) as u64,
        created_at,
    })
}

fn parent_of(kind: &LabelKind) -> Option<i64> {
    match kind {
        LabelKind::Tag => None,
        LabelKind::Folder { parent } => *parent,
    }
}

impl Database {
    // ── Managed Files ────────────────────────────────────────────

    /// Register a file (or refresh its size) and return its id.
    pub fn upsert_file(&self, canonical_path: &str, file_size: i64, last_modified: i64) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO managed_file (canonical_path, file_size, last_modified) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(canonical_path) DO UPDATE SET \
                 file_size = excluded.file_size, \
                 last_modified = excluded.last_modified",
            params![canonical_path, file_size, last_modified],
        )?;
        conn.query_row(
            "SELECT id FROM managed_file WHERE canonical_path = ?1",
            params![canonical_path],
            |row| row.get(0),
        )
    }

    pub fn get_file(&self, file_id: i64) -> Result<Option<ManagedFile>> {
        self.connection()
            .query_row(
                "SELECT id, canonical_path, file_size, last_modified FROM managed_file WHERE id = ?1",
                params![file_id],
                |row| {
                    Ok(ManagedFile {
                        id: row.get(0)?,
                        canonical_path: row.get(1)?,
                        file_size: row.get(2)?,
                        last_modified: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    // ── Labels ───────────────────────────────────────────────────

    pub fn insert_label(&self, kind: &LabelKind, text: &str, created_at: DateTime<Utc>) -> Result<Label> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO label (kind, parent_id, text, usage_count, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![kind.as_str(), parent_of(kind), text, created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted {} label {} '{}'", kind.as_str(), id, text);
        Ok(Label {
            id: LabelId(id),
            kind: *kind,
            text: text.to_string(),
            usage_count: 0,
            created_at,
        })
    }

    /// Exact-text lookup within one kind.
    pub fn find_label(&self, kind: &LabelKind, text: &str) -> Result<Option<Label>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM label WHERE kind = ?1 AND parent_id IS ?2 AND text = ?3 \
                     ORDER BY id LIMIT 1",
                    LABEL_COLUMNS
                ),
                params![kind.as_str(), parent_of(kind), text],
                label_from_row,
            )
            .optional()
    }

    pub fn get_or_create_label(&self, kind: &LabelKind, text: &str) -> Result<Label> {
        match self.find_label(kind, text)? {
            Some(label) => Ok(label),
            None => self.insert_label(kind, text, Utc::now()),
        }
    }

    /// Link a file to a label, bumping the label's usage count.
    /// Returns false when the link already existed.
    pub fn attach_label(&self, file_id: i64, label: LabelId) -> Result<bool> {
        let conn = self.connection();
        let tx = conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO label_reference (label_id, subject_id) VALUES (?1, ?2)",
            params![label.0, file_id],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE label SET usage_count = usage_count + 1 WHERE id = ?1",
                params![label.0],
            )?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    pub fn get_label_count(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM label", [], |row| row.get(0))
    }
}

impl RecordStore for Database {
    fn pair_locks(&self) -> &PairLocks {
        &self.locks
    }

    fn all_labels(&self, kind: &LabelKind) -> Result<Vec<Label>, Error> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM label WHERE kind = ?1 AND parent_id IS ?2 ORDER BY id",
            LABEL_COLUMNS
        ))?;
        let labels = stmt
            .query_map(params![kind.as_str(), parent_of(kind)], label_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(labels)
    }

    fn label(&self, id: LabelId) -> Result<Option<Label>, Error> {
        let label = self
            .connection()
            .query_row(
                &format!("SELECT {} FROM label WHERE id = ?1", LABEL_COLUMNS),
                params![id.0],
                label_from_row,
            )
            .optional()?;
        Ok(label)
    }

    fn references_of(&self, label: LabelId) -> Result<Vec<ReferenceId>, Error> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT subject_id FROM label_reference WHERE label_id = ?1 ORDER BY subject_id",
        )?;
        let refs = stmt
            .query_map(params![label.0], |row| Ok(ReferenceId(row.get(0)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(refs)
    }

    fn repoint(&self, reference: ReferenceId, from: LabelId, to: LabelId) -> Result<(), Error> {
        let changed = self.connection().execute(
            "UPDATE label_reference SET label_id = ?1 WHERE label_id = ?2 AND subject_id = ?3",
            params![to.0, from.0, reference.0],
        )?;
        if changed == 0 {
            return Err(Error::Other(format!(
                "reference {} is not linked to label {}",
                reference.0, from
            )));
        }
        Ok(())
    }

    fn unlink(&self, reference: ReferenceId, label: LabelId) -> Result<(), Error> {
        self.connection().execute(
            "DELETE FROM label_reference WHERE label_id = ?1 AND subject_id = ?2",
            params![label.0, reference.0],
        )?;
        Ok(())
    }

    fn set_usage_count(&self, label: LabelId, usage_count: u64) -> Result<(), Error> {
        self.connection().execute(
            "UPDATE label SET usage_count = ?1 WHERE id = ?2",
            params![usage_count as i64, label.0],
        )?;
        Ok(())
    }

    fn delete(&self, label: LabelId) -> Result<(), Error> {
        let conn = self.connection();
        let deleted = conn.execute(
            "DELETE FROM label WHERE id = ?1 \
             AND NOT EXISTS (SELECT 1 FROM label_reference WHERE label_id = ?1)",
            params![label.0],
        )?;
        if deleted == 0 {
            let referenced: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM label_reference WHERE label_id = ?1)",
                params![label.0],
                |row| row.get(0),
            )?;
            if referenced {
                return Err(Error::Other(format!("label {} still has references", label)));
            }
        }
        debug!("Deleted label {}", label);
        Ok(())
    }
}
