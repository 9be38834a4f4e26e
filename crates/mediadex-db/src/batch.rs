//! Per-table batched inserts for high-throughput indexing.
//!
//! Each inserter buffers rows for one table and emits a multi-row INSERT
//! when the buffer reaches its threshold. Inserters can declare
//! dependencies on other inserters; a flush always drains the declared
//! dependencies first (transitively), so foreign keys hold at every
//! intermediate flush.
//!
//! The inserter never manages the owning transaction: a flush failure is
//! reported and rollback is the caller's job.

use std::cell::RefCell;
use std::rc::Rc;

use mediadex_common::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::db_err;

/// Shared handle to an inserter, used to declare it as a dependency of
/// another inserter on the same connection.
pub type SharedInserter<'conn> = Rc<RefCell<BatchInserter<'conn>>>;

/// Buffered multi-row inserter for a single table.
pub struct BatchInserter<'conn> {
    conn: &'conn Connection,
    table: String,
    columns: Vec<String>,
    batch_size: usize,
    or_ignore: bool,
    rows: Vec<Value>,
    current_count: usize,
    dependencies: Vec<SharedInserter<'conn>>,
}

impl<'conn> BatchInserter<'conn> {
    /// Create an inserter for `table` writing the given columns.
    pub fn new(
        conn: &'conn Connection,
        table: &str,
        columns: &[&str],
        batch_size: usize,
        or_ignore: bool,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::invalid_argument("batch inserter: empty table name"));
        }
        if columns.is_empty() {
            return Err(Error::invalid_argument(format!(
                "batch inserter for {}: no columns",
                table
            )));
        }
        if batch_size == 0 {
            return Err(Error::invalid_argument(format!(
                "batch inserter for {}: batch size must be positive",
                table
            )));
        }

        Ok(Self {
            conn,
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            batch_size,
            or_ignore,
            rows: Vec::with_capacity(batch_size * columns.len()),
            current_count: 0,
            dependencies: Vec::new(),
        })
    }

    /// Wrap this inserter in a shared handle so it can serve as a
    /// dependency of other inserters.
    pub fn into_shared(self) -> SharedInserter<'conn> {
        Rc::new(RefCell::new(self))
    }

    /// Declare inserters that must be flushed before this one.
    ///
    /// The dependency graph must be acyclic; a declared cycle is rejected
    /// here rather than discovered on the first recursive flush.
    pub fn set_dependencies(&mut self, deps: &[SharedInserter<'conn>]) -> Result<()> {
        let mut path = vec![self.table.clone()];
        for dep in deps {
            check_cycle(dep, &mut path)?;
        }
        self.dependencies = deps.to_vec();
        Ok(())
    }

    /// Table this inserter writes to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of buffered, unflushed rows.
    pub fn pending(&self) -> usize {
        self.current_count
    }

    /// Buffer one row. Flushes (dependencies first) when the buffer reaches
    /// the batch size.
    pub fn add(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::invalid_argument(format!(
                "batch inserter for {}: got {} values for {} columns",
                self.table,
                values.len(),
                self.columns.len()
            )));
        }

        self.rows.extend(values);
        self.current_count += 1;

        if self.current_count >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all buffered rows. Declared dependencies flush first, in
    /// declared order. An empty flush is a no-op and idempotent.
    pub fn flush(&mut self) -> Result<()> {
        for dep in &self.dependencies {
            dep.borrow_mut().flush()?;
        }

        if self.current_count == 0 {
            return Ok(());
        }

        let sql = self.insert_sql(self.current_count);
        self.conn
            .execute(&sql, params_from_iter(self.rows.iter()))
            .map_err(|e| db_err(&format!("flush batch into {}", self.table), e))?;

        self.rows.clear();
        self.current_count = 0;
        Ok(())
    }

    /// Flush any remaining rows. Equivalent to [`flush`](Self::flush).
    pub fn close(&mut self) -> Result<()> {
        self.flush()
    }

    /// Multi-row INSERT with exactly `row_count * columns` placeholders.
    fn insert_sql(&self, row_count: usize) -> String {
        let verb = if self.or_ignore {
            "INSERT OR IGNORE"
        } else {
            "INSERT"
        };
        let row = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let rows = vec![row; row_count].join(", ");
        format!(
            "{} INTO {} ({}) VALUES {}",
            verb,
            self.table,
            self.columns.join(", "),
            rows
        )
    }
}

fn check_cycle(node: &SharedInserter<'_>, path: &mut Vec<String>) -> Result<()> {
    let inserter = node.borrow();
    if path.contains(&inserter.table) {
        return Err(Error::invalid_argument(format!(
            "batch dependency cycle involving table {}",
            inserter.table
        )));
    }
    path.push(inserter.table.clone());
    for dep in &inserter.dependencies {
        check_cycle(dep, path)?;
    }
    path.pop();
    Ok(())
}
