//! Collections: the document lifecycle over a pair of relational tables.
//!
//! Each collection owns two tables. `<name>__object` holds one row per
//! physical write (id, revision, committed flag, timestamps, serialized
//! document). `<name>__index` holds one `registry` row per document plus one
//! `value` row per indexable payload property, and is what filtered reads
//! join against.
//!
//! Writes are transactional: the uncommitted object row, the index rebuild,
//! the purge of older revisions and the commit flip travel to the engine as
//! a single `BEGIN IMMEDIATE`..`COMMIT` batch, so readers never observe a
//! half-indexed document.

use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connector::Connector;
use crate::document::{
    self, Document, FIELD_ID, FIELD_ORIGIN, FIELD_REVISION, FIELD_UPDATED, index_text,
    is_indexable_property,
};
use crate::engine::Engine;
use crate::error::{DocSqlError, DocSqlResult};
use crate::filter::{Filter, LogicOp};
use crate::statement::{StatementKind, render};

/// Fields the read templates already project; they never get an index join.
const STANDARD_COLUMNS: [&str; 4] = [FIELD_ID, "__type", "__collection", FIELD_ORIGIN];

/// System fields with neither a projected column nor index rows; filters
/// can neither compare on nor order by them.
const UNQUERYABLE_FIELDS: [&str; 2] = [FIELD_REVISION, FIELD_UPDATED];

/// Per-collection behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionOptions {
    /// Keep superseded revisions instead of purging them on every write.
    pub version_tracking: bool,
}

/// Outcome of a [`Collection::find_text`] dispatch.
///
/// Query text runs a filter and yields matches; anything else is treated as
/// an id lookup, which either finds the document or does not.
#[derive(Debug, Clone, PartialEq)]
pub enum FindResult {
    Matches(Vec<Document>),
    Lookup(Option<Document>),
}

/// A named set of documents plus the machinery to read and write them.
#[derive(Debug)]
pub struct Collection<E> {
    name: String,
    connector: Arc<Connector<E>>,
    options: CollectionOptions,
}

/// Filter compiled to the SQL fragments the read templates splice in.
struct CompiledFilter {
    columns: String,
    joins: String,
    groups: String,
    predicates: String,
    type_literal: String,
    order: String,
}

impl<E: Engine> Collection<E> {
    /// Validates the collection name and ensures its tables exist.
    pub(crate) async fn open(
        name: &str,
        connector: Arc<Connector<E>>,
        options: CollectionOptions,
    ) -> DocSqlResult<Self> {
        if !is_valid_identifier(name) {
            return Err(DocSqlError::Configuration(format!(
                "`{name}` is not a valid collection name"
            )));
        }
        let sql = render(StatementKind::CreateTables, &[("@collection", name)]);
        connector.execute(&sql).await?;
        Ok(Self {
            name: name.to_string(),
            connector,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> CollectionOptions {
        self.options
    }

    /// Stores a new document under a generated id.
    pub async fn insert(&self, payload: Value) -> DocSqlResult<Document> {
        self.upsert(document::generate_id(), payload).await
    }

    /// Stores a document under the given id, replacing the current revision
    /// if one exists.
    pub async fn update(&self, id: &str, payload: Value) -> DocSqlResult<Document> {
        if id.is_empty() {
            return Err(DocSqlError::InvalidDocument(
                "document id is empty".to_string(),
            ));
        }
        self.upsert(id.to_string(), payload).await
    }

    async fn upsert(&self, id: String, payload: Value) -> DocSqlResult<Document> {
        let Value::Object(payload) = payload else {
            return Err(DocSqlError::InvalidDocument(
                "document payload must be a JSON object".to_string(),
            ));
        };

        let revision = document::generate_revision();
        let updated = document::generate_timestamp();
        let origin = match self.origin_of(&id).await? {
            Some(origin) => origin,
            None => updated.clone(),
        };

        let doc = Document::stamp(id, revision, updated, origin, payload);
        let obj_text = serde_json::to_string(&doc.to_value())?;
        let batch = self.write_batch(&doc, &obj_text);
        self.connector.execute(&batch).await?;
        Ok(doc)
    }

    /// Removes a document and its index entries. Removing an unknown id is
    /// not an error.
    pub async fn delete(&self, id: &str) -> DocSqlResult<()> {
        let quoted_id = self.connector.quote(id);
        let mut batch = String::from("BEGIN IMMEDIATE;\n");
        batch.push_str(&render(
            StatementKind::DeleteIndexForId,
            &[("@collection", self.name.as_str()), ("@id", &quoted_id)],
        ));
        batch.push('\n');
        batch.push_str(&render(
            StatementKind::DeleteDocument,
            &[("@collection", self.name.as_str()), ("@id", &quoted_id)],
        ));
        batch.push_str("\nCOMMIT;");
        self.connector.execute(&batch).await?;
        Ok(())
    }

    /// The current committed revision of a document, if any.
    pub async fn find_by_id(&self, id: &str) -> DocSqlResult<Option<Document>> {
        let sql = render(
            StatementKind::GetCurrentDocument,
            &[
                ("@collection", self.name.as_str()),
                ("@id", &self.connector.quote(id)),
            ],
        );
        let rows = self.connector.query(&sql).await?;
        match rows.first().and_then(|row| row.get("obj")) {
            Some(text) => Ok(Some(Document::from_stored(text)?)),
            None => Ok(None),
        }
    }

    /// Every document matching the filter, in filter order.
    pub async fn find(&self, filter: &Filter) -> DocSqlResult<Vec<Document>> {
        let compiled = self.compile(filter)?;
        let sql = render(
            StatementKind::GetDocumentsByFilter,
            &[
                ("@collection", self.name.as_str()),
                ("@columns", &compiled.columns),
                ("@joins", &compiled.joins),
                ("@type", &compiled.type_literal),
                ("@filters", &compiled.predicates),
                ("@groups", &compiled.groups),
                ("@order", &compiled.order),
                ("@reverse", if filter.reverse { "DESC" } else { "ASC" }),
                ("@limit", &filter.length.to_string()),
                ("@offset", &filter.offset.to_string()),
            ],
        );
        let rows = self.connector.query(&sql).await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(id) = row.get(FIELD_ID) else { continue };
            if let Some(doc) = self.find_by_id(id).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    /// Dispatches on the text shape: decodable JSON query text runs as a
    /// filter, anything else (including text that merely looks like JSON
    /// but does not decode) is an id lookup. Decodable text that is not a
    /// valid filter is still a `FilterParse` error.
    pub async fn find_text(&self, text: &str) -> DocSqlResult<FindResult> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(text) {
                let filter = Filter::from_value(&value)?;
                return Ok(FindResult::Matches(self.find(&filter).await?));
            }
        }
        Ok(FindResult::Lookup(self.find_by_id(text).await?))
    }

    /// Number of documents matching the filter, or the whole collection
    /// when no filter is given. Pagination settings do not apply.
    pub async fn count(&self, filter: Option<&Filter>) -> DocSqlResult<u64> {
        let sql = match filter {
            None => render(
                StatementKind::GetDocumentCount,
                &[("@collection", self.name.as_str())],
            ),
            Some(filter) => {
                let compiled = self.compile(filter)?;
                render(
                    StatementKind::GetDocumentCountByFilter,
                    &[
                        ("@collection", self.name.as_str()),
                        ("@columns", &compiled.columns),
                        ("@joins", &compiled.joins),
                        ("@type", &compiled.type_literal),
                        ("@filters", &compiled.predicates),
                    ],
                )
            }
        };
        let rows = self.connector.query(&sql).await?;
        match rows.first().and_then(|row| row.get("total")) {
            Some(total) => total.parse::<u64>().map_err(|_| {
                DocSqlError::Engine(format!(
                    "count query returned a non-numeric total: {total}"
                ))
            }),
            None => Ok(0),
        }
    }

    async fn origin_of(&self, id: &str) -> DocSqlResult<Option<String>> {
        let sql = render(
            StatementKind::GetDocumentOrigin,
            &[
                ("@collection", self.name.as_str()),
                ("@id", &self.connector.quote(id)),
            ],
        );
        let rows = self.connector.query(&sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("origin"))
            .map(str::to_string))
    }

    /// The full write: uncommitted object row, index rebuild, revision
    /// purge (unless version tracking) and commit flip, in one batch.
    fn write_batch(&self, doc: &Document, obj_text: &str) -> String {
        let name = self.name.as_str();
        let id = self.connector.quote(doc.id());
        let revision = doc.revision().to_string();
        let updated = self.connector.quote(doc.updated());
        let origin = self.connector.quote(doc.origin());

        let mut batch = String::from("BEGIN IMMEDIATE;\n");
        batch.push_str(&render(
            StatementKind::InsertDocument,
            &[
                ("@collection", name),
                ("@id", &id),
                ("@revision", &revision),
                ("@committed", "0"),
                ("@updated", &updated),
                ("@origin", &origin),
                ("@obj", &self.connector.quote(obj_text)),
            ],
        ));
        batch.push('\n');
        batch.push_str(&render(
            StatementKind::DeleteIndexForId,
            &[("@collection", name), ("@id", &id)],
        ));
        batch.push('\n');
        // The registry entry is a bare existence marker, no prop or val.
        batch.push_str(&render(
            StatementKind::InsertIndexEntry,
            &[
                ("@collection", name),
                ("@type", &self.connector.quote("registry")),
                ("@prop", &self.connector.quote("")),
                ("@val", &self.connector.quote("")),
                ("@id", &id),
                ("@origin", &origin),
            ],
        ));
        batch.push('\n');
        for (prop, value) in doc.payload() {
            if !is_indexable_property(prop) {
                continue;
            }
            let Some(text) = index_text(value) else { continue };
            batch.push_str(&render(
                StatementKind::InsertIndexEntry,
                &[
                    ("@collection", name),
                    ("@type", &self.connector.quote("value")),
                    ("@prop", &self.connector.quote(prop)),
                    ("@val", &self.connector.quote(&text)),
                    ("@id", &id),
                    ("@origin", &origin),
                ],
            ));
            batch.push('\n');
        }
        if !self.options.version_tracking {
            batch.push_str(&render(
                StatementKind::DeleteDocumentExceptRevision,
                &[("@collection", name), ("@id", &id), ("@revision", &revision)],
            ));
            batch.push('\n');
        }
        batch.push_str(&render(
            StatementKind::CommitDocument,
            &[("@collection", name), ("@id", &id), ("@revision", &revision)],
        ));
        batch.push_str("\nCOMMIT;");
        batch
    }

    /// Compiles a filter into join, column and predicate fragments.
    ///
    /// Each distinct payload property gets one self-join on the index table
    /// under a positional alias. Standard columns never join; the ordering
    /// property joins even without a predicate so its column exists.
    fn compile(&self, filter: &Filter) -> DocSqlResult<CompiledFilter> {
        let mut props: Vec<&str> = Vec::new();
        for expr in &filter.expressions {
            let prop = expr.prop.as_str();
            if STANDARD_COLUMNS.contains(&prop) {
                if expr.comparison.is_some() {
                    return Err(DocSqlError::FilterParse(format!(
                        "cannot compare on system field `{prop}`"
                    )));
                }
                continue;
            }
            if UNQUERYABLE_FIELDS.contains(&prop) {
                return Err(DocSqlError::FilterParse(format!(
                    "system field `{prop}` is not queryable"
                )));
            }
            if !is_valid_identifier(prop) {
                return Err(DocSqlError::FilterParse(format!(
                    "`{prop}` is not a valid property name"
                )));
            }
            if !props.contains(&prop) {
                props.push(prop);
            }
        }

        let order = filter.order_by.as_str();
        if !STANDARD_COLUMNS.contains(&order) {
            if UNQUERYABLE_FIELDS.contains(&order) {
                return Err(DocSqlError::FilterParse(format!(
                    "cannot order by system field `{order}`"
                )));
            }
            if !is_valid_identifier(order) {
                return Err(DocSqlError::FilterParse(format!(
                    "`{order}` is not a valid order property"
                )));
            }
            if !props.contains(&order) {
                props.push(order);
            }
        }

        let mut aliases: HashMap<&str, String> = HashMap::new();
        let mut columns = String::new();
        let mut joins = String::new();
        let mut groups = String::new();
        for (position, prop) in props.iter().enumerate() {
            let alias = format!("ix{position}");
            let _ = write!(columns, ", {alias}.val AS {prop}");
            let _ = write!(groups, ", {prop}");
            let _ = write!(
                joins,
                "INNER JOIN {name}__index AS {alias} \
                 ON {alias}.id = A.id AND {alias}.prop = {prop_literal} ",
                name = self.name,
                prop_literal = self.connector.quote(prop),
            );
            aliases.insert(prop, alias);
        }

        let mut predicates = String::new();
        for expr in &filter.expressions {
            let (Some(comparison), Some(value)) = (expr.comparison, &expr.value) else {
                continue;
            };
            let alias = aliases.get(expr.prop.as_str()).ok_or_else(|| {
                DocSqlError::FilterParse(format!(
                    "property `{}` has no index join", expr.prop
                ))
            })?;
            let keyword = if predicates.is_empty() {
                ""
            } else {
                match expr.op {
                    LogicOp::Or => "OR ",
                    LogicOp::Where | LogicOp::And => "AND ",
                }
            };
            // Integer comparands compare numerically through the text
            // affinity of the val column.
            let term = if let Some(number) = value.as_i64() {
                format!(
                    "CAST({alias}.val AS INT) {} {number}",
                    comparison.as_sql()
                )
            } else {
                let Some(text) = index_text(value) else {
                    return Err(DocSqlError::FilterParse(format!(
                        "property `{}` compares against a non-scalar value",
                        expr.prop
                    )));
                };
                format!(
                    "{alias}.val {} {}",
                    comparison.as_sql(),
                    self.connector.quote(&text)
                )
            };
            let _ = write!(predicates, "{keyword}{term} ");
        }
        // Parenthesized so an OR branch cannot escape the type predicate.
        let predicates = if predicates.is_empty() {
            String::new()
        } else {
            format!("AND ({predicates}) ")
        };

        Ok(CompiledFilter {
            columns,
            joins,
            groups,
            predicates,
            type_literal: self.connector.quote(filter.index_type.as_sql()),
            order: order.to_string(),
        })
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
