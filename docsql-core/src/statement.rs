//! Statement template registry.
//!
//! A fixed mapping from operation to a parameterized SQL template with
//! `@placeholder` tokens. The mapping is immutable and populated ahead of
//! time (a `match` over [`StatementKind`]), so there is no first-access
//! initialization to race on.
//!
//! [`render`] performs literal text replacement, not parameter binding:
//! callers quote any value destined for a SQL literal position (via the
//! connector) before substituting it in. Replacement walks the template in
//! one pass and never rescans substituted output, so values may contain `@`
//! (or even placeholder-shaped text) freely, and substitution order does not
//! matter.

/// Named SQL operations the collection engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTables,
    DeleteDocument,
    DeleteDocumentExceptRevision,
    DeleteIndexForId,
    GetCurrentDocument,
    GetDocumentOrigin,
    GetDocumentsByFilter,
    GetDocumentCount,
    GetDocumentCountByFilter,
    InsertDocument,
    InsertIndexEntry,
    CommitDocument,
}

impl StatementKind {
    /// The raw template for this operation.
    pub const fn template(self) -> &'static str {
        match self {
            StatementKind::CreateTables => {
                "CREATE TABLE IF NOT EXISTS @collection__object (\
                 id TEXT NOT NULL, \
                 revision INTEGER NOT NULL, \
                 committed INTEGER NOT NULL, \
                 updated TEXT NOT NULL, \
                 origin TEXT NOT NULL, \
                 obj BLOB NOT NULL); \
                 CREATE TABLE IF NOT EXISTS @collection__index (\
                 type TEXT NOT NULL, \
                 prop TEXT NOT NULL, \
                 val TEXT NOT NULL, \
                 id TEXT NOT NULL, \
                 origin TEXT NOT NULL);"
            }
            StatementKind::DeleteDocument => {
                "DELETE FROM @collection__object WHERE id = @id;"
            }
            StatementKind::DeleteDocumentExceptRevision => {
                "DELETE FROM @collection__object \
                 WHERE id = @id AND NOT revision = @revision;"
            }
            StatementKind::DeleteIndexForId => {
                "DELETE FROM @collection__index WHERE id = @id;"
            }
            StatementKind::GetCurrentDocument => {
                "SELECT obj FROM @collection__object \
                 WHERE id = @id AND committed = 1 \
                 ORDER BY updated DESC LIMIT 1;"
            }
            // The origin column of the oldest committed row, so every write
            // of an id carries the same origin even after non-current rows
            // have been purged.
            StatementKind::GetDocumentOrigin => {
                "SELECT origin FROM @collection__object \
                 WHERE id = @id AND committed = 1 \
                 ORDER BY updated ASC LIMIT 1;"
            }
            StatementKind::GetDocumentsByFilter => {
                "SELECT A.id AS __id, A.type AS __type, A.origin AS __origin@columns \
                 FROM @collection__index AS A \
                 @joins\
                 WHERE A.type = @type @filters\
                 GROUP BY __id, __type, __origin@groups \
                 ORDER BY @order @reverse \
                 LIMIT @limit OFFSET @offset;"
            }
            StatementKind::GetDocumentCount => {
                "SELECT COUNT(*) AS total FROM @collection__index \
                 WHERE type = 'registry';"
            }
            StatementKind::GetDocumentCountByFilter => {
                "SELECT COUNT(*) AS total FROM (\
                 SELECT A.id AS __id@columns \
                 FROM @collection__index AS A \
                 @joins\
                 WHERE A.type = @type @filters\
                 GROUP BY __id) AS B;"
            }
            StatementKind::InsertDocument => {
                "INSERT INTO @collection__object \
                 (id, revision, committed, updated, origin, obj) \
                 VALUES (@id, @revision, @committed, @updated, @origin, @obj);"
            }
            StatementKind::InsertIndexEntry => {
                "INSERT INTO @collection__index (type, prop, val, id, origin) \
                 VALUES (@type, @prop, @val, @id, @origin);"
            }
            StatementKind::CommitDocument => {
                "UPDATE @collection__object SET committed = 1 \
                 WHERE id = @id AND revision = @revision;"
            }
        }
    }
}

/// Renders a template, substituting each `@name` placeholder with its value.
///
/// Substitutions carry the full token including the `@` sigil, e.g.
/// `("@collection", "people")`. Placeholders are matched against the
/// template only; substituted values are copied through verbatim and never
/// rescanned. Unmatched placeholders are left in place; a correct caller
/// supplies every token its template uses.
pub fn render(kind: StatementKind, substitutions: &[(&str, &str)]) -> String {
    let template = kind.template();
    let mut sql = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('@') {
        sql.push_str(&rest[..at]);
        let tail = &rest[at..];
        // Longest match, so a token can never shadow a longer one.
        let matched = substitutions
            .iter()
            .filter(|(token, _)| tail.starts_with(token))
            .max_by_key(|(token, _)| token.len());
        match matched {
            Some((token, value)) => {
                sql.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                sql.push('@');
                rest = &tail[1..];
            }
        }
    }
    sql.push_str(rest);
    sql
}
