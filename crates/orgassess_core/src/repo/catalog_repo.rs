//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide read-only lookups over tools, domains, categories and criteria.
//! - Load a whole tool hierarchy in catalog order for scoring.
//! - Seed the catalog from an import document (admin/CLI path only).
//!
//! # Invariants
//! - `CatalogRepository` never mutates catalog rows.
//! - Hierarchy order is `sort_order ASC, id ASC` at every level.

use super::{RepoError, RepoResult};
use crate::db::ensure_schema_ready;
use crate::model::catalog::{
    CatalogImport, Category, Criterion, CriterionId, CriterionRef, Domain, Tool, ToolId, ToolTree,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const CATALOG_TABLES: &[(&str, &[&str])] = &[
    ("tools", &["id", "name", "description", "sort_order"]),
    ("domains", &["id", "tool_id", "name", "sort_order"]),
    ("categories", &["id", "domain_id", "name", "sort_order"]),
    ("criteria", &["id", "category_id", "text", "sort_order"]),
];

/// Read-only catalog lookups consumed by the session manager.
pub trait CatalogRepository {
    /// Loads one tool header by id.
    fn get_tool(&self, id: ToolId) -> RepoResult<Option<Tool>>;
    /// Lists every tool in catalog order.
    fn list_tools(&self) -> RepoResult<Vec<Tool>>;
    /// Resolves one criterion with its owning category and tool.
    fn get_criterion(&self, id: CriterionId) -> RepoResult<Option<CriterionRef>>;
    /// Loads the full ordered hierarchy of one tool.
    fn load_tool_tree(&self, id: ToolId) -> RepoResult<Option<ToolTree>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, CATALOG_TABLES)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn get_tool(&self, id: ToolId) -> RepoResult<Option<Tool>> {
        let tool = self
            .conn
            .query_row(
                "SELECT id, name, description FROM tools WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Tool {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(tool)
    }

    fn list_tools(&self) -> RepoResult<Vec<Tool>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM tools ORDER BY sort_order ASC, id ASC;")?;
        let tools = stmt
            .query_map([], |row| {
                Ok(Tool {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tools)
    }

    fn get_criterion(&self, id: CriterionId) -> RepoResult<Option<CriterionRef>> {
        let criterion = self
            .conn
            .query_row(
                "SELECT cr.id, cr.category_id, d.tool_id
                 FROM criteria cr
                 JOIN categories c ON c.id = cr.category_id
                 JOIN domains d ON d.id = c.domain_id
                 WHERE cr.id = ?1;",
                [id],
                |row| {
                    Ok(CriterionRef {
                        id: row.get(0)?,
                        category_id: row.get(1)?,
                        tool_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(criterion)
    }

    fn load_tool_tree(&self, id: ToolId) -> RepoResult<Option<ToolTree>> {
        let Some(tool) = self.get_tool(id)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, c.id, c.name, cr.id, cr.text
             FROM domains d
             LEFT JOIN categories c ON c.domain_id = d.id
             LEFT JOIN criteria cr ON cr.category_id = c.id
             WHERE d.tool_id = ?1
             ORDER BY d.sort_order ASC, d.id ASC,
                      c.sort_order ASC, c.id ASC,
                      cr.sort_order ASC, cr.id ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut domains: Vec<Domain> = Vec::new();

        while let Some(row) = rows.next()? {
            let domain_id: i64 = row.get(0)?;
            if domains.last().map(|d| d.id) != Some(domain_id) {
                domains.push(Domain {
                    id: domain_id,
                    name: row.get(1)?,
                    categories: Vec::new(),
                });
            }
            let domain = domains
                .last_mut()
                .ok_or_else(|| RepoError::InvalidData("domain row lost".to_string()))?;

            let Some(category_id) = row.get::<_, Option<i64>>(2)? else {
                continue;
            };
            if domain.categories.last().map(|c| c.id) != Some(category_id) {
                domain.categories.push(Category {
                    id: category_id,
                    name: row.get(3)?,
                    criteria: Vec::new(),
                });
            }
            let category = domain
                .categories
                .last_mut()
                .ok_or_else(|| RepoError::InvalidData("category row lost".to_string()))?;

            if let Some(criterion_id) = row.get::<_, Option<i64>>(4)? {
                category.criteria.push(Criterion {
                    id: criterion_id,
                    text: row.get(5)?,
                });
            }
        }

        Ok(Some(ToolTree { tool, domains }))
    }
}

/// Seeds the catalog from an import document in one transaction.
///
/// Returns the ids of the created tools in document order. Document order
/// becomes `sort_order` at every level.
pub fn import_catalog(conn: &mut Connection, import: &CatalogImport) -> RepoResult<Vec<ToolId>> {
    ensure_schema_ready(conn, CATALOG_TABLES)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut tool_ids = Vec::with_capacity(import.tools.len());
    let mut criterion_count = 0usize;

    for (tool_order, tool) in import.tools.iter().enumerate() {
        tx.execute(
            "INSERT INTO tools (name, description, sort_order) VALUES (?1, ?2, ?3);",
            params![tool.name.trim(), tool.description.as_deref(), tool_order as i64],
        )?;
        let tool_id = tx.last_insert_rowid();

        for (domain_order, domain) in tool.domains.iter().enumerate() {
            tx.execute(
                "INSERT INTO domains (tool_id, name, sort_order) VALUES (?1, ?2, ?3);",
                params![tool_id, domain.name.trim(), domain_order as i64],
            )?;
            let domain_id = tx.last_insert_rowid();

            for (category_order, category) in domain.categories.iter().enumerate() {
                tx.execute(
                    "INSERT INTO categories (domain_id, name, sort_order) VALUES (?1, ?2, ?3);",
                    params![domain_id, category.name.trim(), category_order as i64],
                )?;
                let category_id = tx.last_insert_rowid();

                for (criterion_order, text) in category.criteria.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO criteria (category_id, text, sort_order) VALUES (?1, ?2, ?3);",
                        params![category_id, text.trim(), criterion_order as i64],
                    )?;
                    criterion_count += 1;
                }
            }
        }
        tool_ids.push(tool_id);
    }

    tx.commit()?;
    info!(
        "event=catalog_import module=repo status=ok tools={} criteria={}",
        tool_ids.len(),
        criterion_count
    );
    Ok(tool_ids)
}
