// Database CRUD operations
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::db::{DbConnection, DbResult};
use super::models::{Artifact, ArtifactKind, ExerciseRecord, ExerciseSummary};
use crate::exercise::Source;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn time_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e: chrono::ParseError| conversion_error(idx, e.to_string()))
}

fn source_at(row: &Row, idx: usize) -> rusqlite::Result<Source> {
    let text: String = row.get(idx)?;
    Source::parse(&text).ok_or_else(|| conversion_error(idx, format!("unknown source {}", text)))
}

// ==================== EXERCISE QUERIES ====================

pub fn create_exercise(db: &DbConnection, record: &ExerciseRecord) -> DbResult<()> {
    let conn = db.lock();
    conn.execute(
        "INSERT INTO exercises (id, created_at, title, instrument, key, time_signature, difficulty, focus, bars, source, seed, params_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id,
            record.created_at.to_rfc3339(),
            record.title,
            record.instrument,
            record.key,
            record.time_signature,
            record.difficulty,
            record.focus,
            record.bars,
            record.source.as_str(),
            record.seed.map(|s| s as i64),
            record.params_json,
        ],
    )?;
    Ok(())
}

/// Get an exercise by ID
pub fn get_exercise(db: &DbConnection, id: &str) -> DbResult<Option<ExerciseRecord>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, created_at, title, instrument, key, time_signature, difficulty, focus, bars, source, seed, params_json
         FROM exercises WHERE id = ?1",
    )?;

    let record = stmt
        .query_row([id], |row| {
            Ok(ExerciseRecord {
                id: row.get(0)?,
                created_at: time_at(row, 1)?,
                title: row.get(2)?,
                instrument: row.get(3)?,
                key: row.get(4)?,
                time_signature: row.get(5)?,
                difficulty: row.get(6)?,
                focus: row.get(7)?,
                bars: row.get(8)?,
                source: source_at(row, 9)?,
                seed: row.get::<_, Option<i64>>(10)?.map(|s| s as u64),
                params_json: row.get(11)?,
            })
        })
        .optional()?;

    Ok(record)
}

/// List exercises, newest first, with artifact counts
pub fn list_exercises(db: &DbConnection) -> DbResult<Vec<ExerciseSummary>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT e.id, e.created_at, e.title, e.instrument, e.difficulty, e.source,
                COUNT(a.id) as artifact_count
         FROM exercises e
         LEFT JOIN artifacts a ON e.id = a.exercise_id
         GROUP BY e.id
         ORDER BY e.created_at DESC",
    )?;

    let exercises = stmt
        .query_map([], |row| {
            Ok(ExerciseSummary {
                id: row.get(0)?,
                created_at: time_at(row, 1)?,
                title: row.get(2)?,
                instrument: row.get(3)?,
                difficulty: row.get(4)?,
                source: source_at(row, 5)?,
                artifact_count: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(exercises)
}

/// Delete an exercise and (by cascade) its artifact rows. Returns false if it did not exist.
pub fn delete_exercise(db: &DbConnection, id: &str) -> DbResult<bool> {
    let conn = db.lock();
    let deleted = conn.execute("DELETE FROM exercises WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

// ==================== ARTIFACT QUERIES ====================

pub fn create_artifact(
    db: &DbConnection,
    exercise_id: &str,
    kind: ArtifactKind,
    path: String,
    sha256: String,
    bytes: i64,
) -> DbResult<Artifact> {
    let artifact = Artifact {
        id: Uuid::new_v4(),
        exercise_id: exercise_id.to_string(),
        kind,
        path,
        sha256,
        bytes,
    };

    let conn = db.lock();
    conn.execute(
        "INSERT INTO artifacts (id, exercise_id, kind, path, sha256, bytes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            artifact.id.to_string(),
            artifact.exercise_id,
            artifact.kind.as_str(),
            artifact.path,
            artifact.sha256,
            artifact.bytes,
        ],
    )?;

    Ok(artifact)
}

fn artifact_from_row(row: &Row) -> rusqlite::Result<Artifact> {
    let id: String = row.get(0)?;
    let kind: String = row.get(2)?;
    Ok(Artifact {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e.to_string()))?,
        exercise_id: row.get(1)?,
        kind: ArtifactKind::parse(&kind).ok_or_else(|| conversion_error(2, format!("unknown kind {}", kind)))?,
        path: row.get(3)?,
        sha256: row.get(4)?,
        bytes: row.get(5)?,
    })
}

pub fn list_artifacts(db: &DbConnection, exercise_id: &str) -> DbResult<Vec<Artifact>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, exercise_id, kind, path, sha256, bytes
         FROM artifacts WHERE exercise_id = ?1 ORDER BY kind",
    )?;

    let artifacts = stmt
        .query_map([exercise_id], artifact_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(artifacts)
}

pub fn find_artifact(db: &DbConnection, exercise_id: &str, kind: ArtifactKind) -> DbResult<Option<Artifact>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, exercise_id, kind, path, sha256, bytes
         FROM artifacts WHERE exercise_id = ?1 AND kind = ?2",
    )?;

    Ok(stmt
        .query_row(params![exercise_id, kind.as_str()], artifact_from_row)
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::open_in_memory;
    use chrono::{Duration, TimeZone};

    fn record(id: &str, minutes: i64) -> ExerciseRecord {
        ExerciseRecord {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes),
            title: "Scales Exercise in G".to_string(),
            instrument: "Flute".to_string(),
            key: "G".to_string(),
            time_signature: "3/4".to_string(),
            difficulty: "Beginner".to_string(),
            focus: "scales - major".to_string(),
            bars: 8,
            source: Source::Procedural,
            seed: Some(u64::MAX - 1),
            params_json: "{}".to_string(),
        }
    }

    #[test]
    fn test_exercise_crud() {
        let db = open_in_memory().unwrap();
        let r = record("ex-00000001", 0);
        create_exercise(&db, &r).unwrap();

        let loaded = get_exercise(&db, "ex-00000001").unwrap().unwrap();
        assert_eq!(loaded, r);
        assert!(get_exercise(&db, "ex-missing").unwrap().is_none());

        assert!(delete_exercise(&db, "ex-00000001").unwrap());
        assert!(!delete_exercise(&db, "ex-00000001").unwrap());
        assert!(get_exercise(&db, "ex-00000001").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_counts() {
        let db = open_in_memory().unwrap();
        create_exercise(&db, &record("ex-old", 0)).unwrap();
        create_exercise(&db, &record("ex-new", 5)).unwrap();
        create_artifact(&db, "ex-old", ArtifactKind::Midi, "a.mid".to_string(), "h".to_string(), 10).unwrap();
        create_artifact(&db, "ex-old", ArtifactKind::MusicXml, "a.xml".to_string(), "h".to_string(), 20).unwrap();

        let list = list_exercises(&db).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "ex-new");
        assert_eq!(list[0].artifact_count, 0);
        assert_eq!(list[1].artifact_count, 2);
    }

    #[test]
    fn test_artifacts_cascade() {
        let db = open_in_memory().unwrap();
        create_exercise(&db, &record("ex-1", 0)).unwrap();
        let midi = create_artifact(&db, "ex-1", ArtifactKind::Midi, "s.mid".to_string(), "abc".to_string(), 42).unwrap();

        assert_eq!(find_artifact(&db, "ex-1", ArtifactKind::Midi).unwrap(), Some(midi));
        assert!(find_artifact(&db, "ex-1", ArtifactKind::Audio).unwrap().is_none());
        assert_eq!(list_artifacts(&db, "ex-1").unwrap().len(), 1);

        delete_exercise(&db, "ex-1").unwrap();
        assert!(list_artifacts(&db, "ex-1").unwrap().is_empty());
    }

    #[test]
    fn test_artifact_requires_exercise() {
        let db = open_in_memory().unwrap();
        let result = create_artifact(&db, "ex-none", ArtifactKind::Midi, "x".to_string(), "h".to_string(), 1);
        assert!(result.is_err());
    }
}
