use anyhow::Result;
use rusqlite::Connection;

pub const DB_PATH: &str = "data/msds.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            name         TEXT PRIMARY KEY,
            path         TEXT NOT NULL,
            page_count   INTEGER NOT NULL DEFAULT 0,
            status       TEXT NOT NULL CHECK(status IN ('ok','error')),
            error        TEXT,
            processed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document_sections (
            id          INTEGER PRIMARY KEY,
            doc_name    TEXT NOT NULL REFERENCES documents(name),
            section_key TEXT NOT NULL,
            strategy    TEXT NOT NULL,
            body        TEXT NOT NULL,
            UNIQUE(doc_name, section_key)
        );
        CREATE INDEX IF NOT EXISTS idx_sections_doc ON document_sections(doc_name);

        CREATE TABLE IF NOT EXISTS products (
            doc_name     TEXT PRIMARY KEY REFERENCES documents(name),
            product_name TEXT,
            company_name TEXT,
            address      TEXT
        );

        CREATE TABLE IF NOT EXISTS hazard_summaries (
            doc_name     TEXT PRIMARY KEY REFERENCES documents(name),
            signal_word  TEXT,
            h_codes      TEXT NOT NULL,
            p_codes_raw  TEXT NOT NULL,
            p_codes_flat TEXT NOT NULL,
            pictograms   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS composition_rows (
            id                INTEGER PRIMARY KEY,
            doc_name          TEXT NOT NULL REFERENCES documents(name),
            cas               TEXT NOT NULL,
            name              TEXT NOT NULL,
            concentration_raw TEXT NOT NULL,
            conc_type         TEXT,
            conc_min          REAL,
            conc_max          REAL,
            conc_repr         REAL,
            unit              TEXT,
            source_line       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_composition_doc ON composition_rows(doc_name);

        CREATE TABLE IF NOT EXISTS regulatory_items (
            id             INTEGER PRIMARY KEY,
            doc_name       TEXT NOT NULL REFERENCES documents(name),
            canonical_name TEXT NOT NULL,
            source_line    TEXT NOT NULL,
            score          REAL NOT NULL,
            present        INTEGER,
            UNIQUE(doc_name, canonical_name)
        );
        CREATE INDEX IF NOT EXISTS idx_regulatory_doc ON regulatory_items(doc_name);
        ",
    )?;
    Ok(())
}

// ── Row types ──

pub struct DocumentRow {
    pub name: String,
    pub path: String,
    pub page_count: usize,
    pub status: String,
    pub error: Option<String>,
    pub processed_at: String,
}

pub struct SectionRow {
    pub doc_name: String,
    pub section_key: String,
    pub strategy: String,
    pub body: String,
}

pub struct ProductRow {
    pub doc_name: String,
    pub product_name: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
}

pub struct HazardRow {
    pub doc_name: String,
    pub signal_word: Option<String>,
    /// JSON arrays of code strings.
    pub h_codes: String,
    pub p_codes_raw: String,
    pub p_codes_flat: String,
    pub pictograms: String,
}

pub struct CompositionRow {
    pub doc_name: String,
    pub cas: String,
    pub name: String,
    pub concentration_raw: String,
    pub conc_type: Option<String>,
    pub conc_min: Option<f64>,
    pub conc_max: Option<f64>,
    pub conc_repr: Option<f64>,
    pub unit: Option<String>,
    pub source_line: String,
}

pub struct RegulatoryRow {
    pub doc_name: String,
    pub canonical_name: String,
    pub source_line: String,
    pub score: f64,
    pub present: Option<bool>,
}

// ── Savers ──

pub fn save_documents(conn: &Connection, rows: &[DocumentRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO documents
             (name, path, page_count, status, error, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.name,
                r.path,
                r.page_count as i64,
                r.status,
                r.error,
                r.processed_at,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_sections(conn: &Connection, rows: &[SectionRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO document_sections (doc_name, section_key, strategy, body)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![r.doc_name, r.section_key, r.strategy, r.body])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_products(conn: &Connection, rows: &[ProductRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO products (doc_name, product_name, company_name, address)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.doc_name,
                r.product_name,
                r.company_name,
                r.address,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_hazards(conn: &Connection, rows: &[HazardRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO hazard_summaries
             (doc_name, signal_word, h_codes, p_codes_raw, p_codes_flat, pictograms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.doc_name,
                r.signal_word,
                r.h_codes,
                r.p_codes_raw,
                r.p_codes_flat,
                r.pictograms,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_composition(conn: &Connection, rows: &[CompositionRow]) -> Result<()> {
    use std::collections::BTreeSet;
    let tx = conn.unchecked_transaction()?;
    {
        // Re-processing a document replaces its rows wholesale.
        let docs: BTreeSet<&str> = rows.iter().map(|r| r.doc_name.as_str()).collect();
        let mut delete = tx.prepare("DELETE FROM composition_rows WHERE doc_name = ?1")?;
        for name in docs {
            delete.execute(rusqlite::params![name])?;
        }
        let mut stmt = tx.prepare(
            "INSERT INTO composition_rows
             (doc_name, cas, name, concentration_raw, conc_type, conc_min, conc_max,
              conc_repr, unit, source_line)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.doc_name,
                r.cas,
                r.name,
                r.concentration_raw,
                r.conc_type,
                r.conc_min,
                r.conc_max,
                r.conc_repr,
                r.unit,
                r.source_line,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_regulatory(conn: &Connection, rows: &[RegulatoryRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO regulatory_items
             (doc_name, canonical_name, source_line, score, present)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.doc_name,
                r.canonical_name,
                r.source_line,
                r.score,
                r.present,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Fetchers ──

pub fn fetch_document(conn: &Connection, name: &str) -> Result<Option<DocumentRow>> {
    let mut stmt = conn.prepare(
        "SELECT name, path, page_count, status, error, processed_at
         FROM documents WHERE name = ?1",
    )?;
    let mut rows = stmt.query_map(rusqlite::params![name], |row| {
        Ok(DocumentRow {
            name: row.get(0)?,
            path: row.get(1)?,
            page_count: row.get::<_, i64>(2)? as usize,
            status: row.get(3)?,
            error: row.get(4)?,
            processed_at: row.get(5)?,
        })
    })?;
    Ok(rows.next().transpose()?)
}

pub fn fetch_sections(conn: &Connection, name: &str) -> Result<Vec<SectionRow>> {
    let mut stmt = conn.prepare(
        "SELECT doc_name, section_key, strategy, body
         FROM document_sections WHERE doc_name = ?1 ORDER BY section_key",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![name], |row| {
            Ok(SectionRow {
                doc_name: row.get(0)?,
                section_key: row.get(1)?,
                strategy: row.get(2)?,
                body: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub documents: usize,
    pub ok: usize,
    pub errors: usize,
    pub sections: usize,
    pub composition_rows: usize,
    pub regulatory_items: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let documents: usize = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let ok: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE status = 'ok'",
        [],
        |r| r.get(0),
    )?;
    let sections: usize =
        conn.query_row("SELECT COUNT(*) FROM document_sections", [], |r| r.get(0))?;
    let composition_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM composition_rows", [], |r| r.get(0))?;
    let regulatory_items: usize =
        conn.query_row("SELECT COUNT(*) FROM regulatory_items", [], |r| r.get(0))?;
    Ok(Stats {
        documents,
        ok,
        errors: documents - ok,
        sections,
        composition_rows,
        regulatory_items,
    })
}
