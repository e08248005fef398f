//! Source bindings derived from note attribution.

use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::Result;
use crate::types::SourceBinding;

use super::NoteStore;

/// Insert a binding for every `(author, title)` pair not yet bound.
///
/// Returns the number of bindings added.
pub(super) fn derive_source_bindings(conn: &Connection) -> Result<usize> {
    let added = conn.execute(
        r#"
        INSERT OR IGNORE INTO source_bindings (speaker, title, source)
        SELECT author, title, MAX(publisher)
        FROM notes
        WHERE author IS NOT NULL AND title IS NOT NULL
        GROUP BY author, title
        "#,
        [],
    )?;
    Ok(added)
}

impl NoteStore {
    /// List all source bindings ordered by speaker, then title.
    pub fn list_source_bindings(&self) -> Result<Vec<SourceBinding>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, speaker, title, source FROM source_bindings ORDER BY speaker, title",
        )?;
        let bindings = stmt
            .query_map([], |row| {
                Ok(SourceBinding {
                    id: row.get(0)?,
                    speaker: row.get(1)?,
                    title: row.get(2)?,
                    source: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bindings)
    }

    /// Look up the binding for a `(speaker, title)` pair.
    pub fn find_source_binding(&self, speaker: &str, title: &str) -> Result<Option<SourceBinding>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, speaker, title, source FROM source_bindings WHERE speaker = ?1 AND title = ?2",
        )?;
        let mut rows = stmt.query(params![speaker, title])?;

        if let Some(row) = rows.next()? {
            Ok(Some(SourceBinding {
                id: row.get(0)?,
                speaker: row.get(1)?,
                title: row.get(2)?,
                source: row.get(3)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Bind attribution pairs added since the table was last derived.
    ///
    /// Existing bindings are left as they are.
    pub fn refresh_source_bindings(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let added = derive_source_bindings(&conn)?;
        debug!("Derived {} new source bindings", added);
        Ok(added)
    }
}
