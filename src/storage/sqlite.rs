use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::models::{Assessment, Issue, Repository};

/// Flat snapshot store mirroring the Repository/Issue/Assessment entities,
/// keyed by their natural ids. The pipeline does not depend on it; a run's
/// ranked output is written here only when explicitly requested.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY,
                full_name TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                html_url TEXT NOT NULL,
                stars INTEGER NOT NULL,
                forks INTEGER NOT NULL,
                language TEXT,
                topics_json TEXT,
                license TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                pushed_at TEXT,
                open_issues_count INTEGER NOT NULL,
                has_issues INTEGER NOT NULL,
                archived INTEGER NOT NULL,
                disabled INTEGER NOT NULL,
                discovered_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issues (
                id INTEGER PRIMARY KEY,
                number INTEGER NOT NULL,
                repo_full_name TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT,
                html_url TEXT NOT NULL,
                state TEXT NOT NULL,
                labels_json TEXT,
                assignee TEXT,
                assignees_json TEXT,
                comments INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                author_association TEXT NOT NULL,
                status TEXT NOT NULL,
                discovered_at TEXT NOT NULL,
                processed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS assessments (
                issue_id INTEGER PRIMARY KEY REFERENCES issues(id),
                issue_number INTEGER NOT NULL,
                repo_full_name TEXT NOT NULL,
                complexity_score REAL NOT NULL,
                clarity_score REAL NOT NULL,
                scope_score REAL NOT NULL,
                feasibility_score REAL NOT NULL,
                overall_score REAL NOT NULL,
                is_doable INTEGER NOT NULL,
                confidence REAL NOT NULL,
                reasoning TEXT NOT NULL,
                estimated_effort_hours REAL,
                required_skills_json TEXT,
                potential_risks_json TEXT,
                assessed_at TEXT NOT NULL,
                model_used TEXT NOT NULL,
                assessment_version TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_issues_repo ON issues(repo_full_name);
            CREATE INDEX IF NOT EXISTS idx_assessments_repo ON assessments(repo_full_name);
            "#,
        )?;

        Ok(())
    }

    /// Persist one run's ranked output.
    pub fn save_snapshot(
        &self,
        repositories: &[Repository],
        issues: &[Issue],
        assessments: &[Assessment],
    ) -> Result<()> {
        for repo in repositories {
            self.save_repository(repo)?;
        }
        for issue in issues {
            self.save_issue(issue)?;
        }
        for assessment in assessments {
            self.save_assessment(assessment)?;
        }
        tracing::info!(
            "Snapshot saved: {} repositories, {} issues, {} assessments",
            repositories.len(),
            issues.len(),
            assessments.len()
        );
        Ok(())
    }

    pub fn save_repository(&self, repo: &Repository) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO repositories (
                id, full_name, name, description, html_url, stars, forks,
                language, topics_json, license, created_at, updated_at,
                pushed_at, open_issues_count, has_issues, archived, disabled,
                discovered_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ON CONFLICT(full_name) DO UPDATE SET
                stars = excluded.stars,
                forks = excluded.forks,
                open_issues_count = excluded.open_issues_count,
                updated_at = excluded.updated_at,
                pushed_at = excluded.pushed_at,
                archived = excluded.archived,
                disabled = excluded.disabled,
                discovered_at = excluded.discovered_at
            "#,
            params![
                repo.id,
                repo.full_name,
                repo.name,
                repo.description,
                repo.html_url,
                repo.stars,
                repo.forks,
                repo.language,
                serde_json::to_string(&repo.topics)?,
                repo.license,
                repo.created_at.to_rfc3339(),
                repo.updated_at.to_rfc3339(),
                repo.pushed_at.map(|t| t.to_rfc3339()),
                repo.open_issues_count,
                repo.has_issues,
                repo.archived,
                repo.disabled,
                repo.discovered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn save_issue(&self, issue: &Issue) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO issues (
                id, number, repo_full_name, title, body, html_url, state,
                labels_json, assignee, assignees_json, comments, created_at,
                updated_at, author_association, status, discovered_at,
                processed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                state = excluded.state,
                labels_json = excluded.labels_json,
                assignee = excluded.assignee,
                assignees_json = excluded.assignees_json,
                comments = excluded.comments,
                updated_at = excluded.updated_at,
                status = excluded.status,
                processed_at = excluded.processed_at
            "#,
            params![
                issue.id,
                issue.number,
                issue.repo_full_name,
                issue.title,
                issue.body,
                issue.html_url,
                issue.state,
                serde_json::to_string(&issue.labels)?,
                issue.assignee,
                serde_json::to_string(&issue.assignees)?,
                issue.comments,
                issue.created_at.to_rfc3339(),
                issue.updated_at.to_rfc3339(),
                issue.author_association,
                issue.status.as_str(),
                issue.discovered_at.to_rfc3339(),
                issue.processed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn save_assessment(&self, assessment: &Assessment) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO assessments (
                issue_id, issue_number, repo_full_name, complexity_score,
                clarity_score, scope_score, feasibility_score, overall_score,
                is_doable, confidence, reasoning, estimated_effort_hours,
                required_skills_json, potential_risks_json, assessed_at,
                model_used, assessment_version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT(issue_id) DO UPDATE SET
                complexity_score = excluded.complexity_score,
                clarity_score = excluded.clarity_score,
                scope_score = excluded.scope_score,
                feasibility_score = excluded.feasibility_score,
                overall_score = excluded.overall_score,
                is_doable = excluded.is_doable,
                confidence = excluded.confidence,
                reasoning = excluded.reasoning,
                estimated_effort_hours = excluded.estimated_effort_hours,
                required_skills_json = excluded.required_skills_json,
                potential_risks_json = excluded.potential_risks_json,
                assessed_at = excluded.assessed_at,
                model_used = excluded.model_used,
                assessment_version = excluded.assessment_version
            "#,
            params![
                assessment.issue_id,
                assessment.issue_number,
                assessment.repo_full_name,
                assessment.complexity_score,
                assessment.clarity_score,
                assessment.scope_score,
                assessment.feasibility_score,
                assessment.overall_score,
                assessment.is_doable,
                assessment.confidence,
                assessment.reasoning,
                assessment.estimated_effort_hours,
                serde_json::to_string(&assessment.required_skills)?,
                serde_json::to_string(&assessment.potential_risks)?,
                assessment.assessed_at.to_rfc3339(),
                assessment.model_used,
                assessment.assessment_version,
            ],
        )?;
        Ok(())
    }

    pub fn repository_count(&self) -> Result<u64> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn issue_count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn assessment_count(&self) -> Result<u64> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM assessments", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::tests::make_issue;
    use crate::models::repository::tests::make_repo;

    #[test]
    fn test_snapshot_roundtrip_counts() {
        let storage = Storage::in_memory().unwrap();

        let repos = vec![make_repo("a/b", 50), make_repo("c/d", 75)];
        let issues = vec![make_issue(1, &["bug"]), make_issue(2, &["enhancement"])];
        let assessments = vec![Assessment::fallback(&issues[0])];

        storage.save_snapshot(&repos, &issues, &assessments).unwrap();

        assert_eq!(storage.repository_count().unwrap(), 2);
        assert_eq!(storage.issue_count().unwrap(), 2);
        assert_eq!(storage.assessment_count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_on_natural_key() {
        let storage = Storage::in_memory().unwrap();

        let mut repo = make_repo("a/b", 50);
        storage.save_repository(&repo).unwrap();

        repo.stars = 60;
        storage.save_repository(&repo).unwrap();

        assert_eq!(storage.repository_count().unwrap(), 1);
        let stars: u32 = storage
            .conn
            .query_row(
                "SELECT stars FROM repositories WHERE full_name = 'a/b'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stars, 60);
    }
}
