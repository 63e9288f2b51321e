//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use parking_lot::Mutex;
use tabulon::{Connection, Cursor, DataType, Row, SqlType, Statement, entity};

entity! {
    table = ("", "person"),
    columns = PersonColumns,
    key = [id],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: i32,
        pub name: Option<String>,
        pub manager_id: Option<i32>,
    }
}

entity! {
    table = ("hr", "membership"),
    columns = MembershipColumns,
    key = [person_id, team_id],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Membership {
        pub person_id: i32,
        pub team_id: i32,
        pub role: Option<String>,
    }
}

/// Everything the recording capability was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Prepare(String),
    Bind(usize, DataType),
    Clear,
    Update,
    Query,
    CloseCursor,
    CloseStatement,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    results: VecDeque<Vec<Vec<DataType>>>,
    affected: u64,
    fail_execute: bool,
    fail_close: bool,
    fail_cursor_close: bool,
}

/// An in-memory capability recording every call and serving canned rows.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<State>>,
    product: String,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(product: &str) -> Self {
        Self {
            state: Arc::default(),
            product: product.to_string(),
        }
    }

    /// Queue the rows returned by the next query execution.
    pub fn push_rows(&self, rows: Vec<Vec<DataType>>) {
        self.state.lock().results.push_back(rows);
    }

    pub fn set_affected(&self, affected: u64) {
        self.state.lock().affected = affected;
    }

    pub fn fail_execute(&self) {
        self.state.lock().fail_execute = true;
    }

    pub fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }

    pub fn fail_cursor_close(&self) {
        self.state.lock().fail_cursor_close = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// The values bound, in call order.
    pub fn binds(&self) -> Vec<(usize, DataType)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Bind(index, value) => Some((index, value)),
                _ => None,
            })
            .collect()
    }

    /// The SQL of every prepared statement.
    pub fn prepared(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Prepare(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn record(&self, event: Event) {
        self.state.lock().events.push(event);
    }
}

impl Connection for Recorder {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        self.record(Event::Prepare(sql.to_string()));
        Ok(Box::new(RecordedStatement {
            recorder: self.clone(),
        }))
    }

    fn product_name(&self) -> Result<String> {
        if self.product.is_empty() {
            bail!("no product metadata");
        }
        Ok(self.product.clone())
    }
}

struct RecordedStatement {
    recorder: Recorder,
}

impl Statement for RecordedStatement {
    fn bind(&mut self, index: usize, value: DataType) -> Result<()> {
        self.recorder.record(Event::Bind(index, value));
        Ok(())
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.recorder.record(Event::Clear);
        Ok(())
    }

    fn execute_update(&mut self) -> Result<u64> {
        self.recorder.record(Event::Update);
        let state = self.recorder.state.lock();
        if state.fail_execute {
            bail!("execute failed");
        }
        Ok(state.affected)
    }

    fn execute_query(&mut self) -> Result<Box<dyn Cursor + '_>> {
        self.recorder.record(Event::Query);
        let mut state = self.recorder.state.lock();
        if state.fail_execute {
            bail!("execute failed");
        }
        let rows = state.results.pop_front().unwrap_or_default();
        Ok(Box::new(RecordedCursor {
            recorder: self.recorder.clone(),
            rows: rows.into(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.record(Event::CloseStatement);
        if self.recorder.state.lock().fail_close {
            bail!("close failed");
        }
        Ok(())
    }
}

struct RecordedCursor {
    recorder: Recorder,
    rows: VecDeque<Vec<DataType>>,
}

impl Cursor for RecordedCursor {
    fn next_row(&mut self) -> Result<Option<Box<dyn Row>>> {
        Ok(self.rows.pop_front().map(|values| Box::new(ValueRow(values)) as Box<dyn Row>))
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.record(Event::CloseCursor);
        if self.recorder.state.lock().fail_cursor_close {
            bail!("cursor close failed");
        }
        Ok(())
    }
}

/// A row of tagged values; reading a column as another type fails.
pub struct ValueRow(pub Vec<DataType>);

impl Row for ValueRow {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize, sql_type: SqlType) -> Result<DataType> {
        let value = index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .ok_or_else(|| anyhow!("no column {index}"))?;
        if value.sql_type() != sql_type {
            bail!("column {index} holds {} not {sql_type}", value.sql_type());
        }
        Ok(value.clone())
    }
}

/// A person row in table-field order.
pub fn person_row(id: i32, name: Option<&str>, manager_id: Option<i32>) -> Vec<DataType> {
    vec![id.into(), name.into(), manager_id.into()]
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assert that SQL contains all expected fragments in order, ignoring
/// differences in whitespace.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual = normalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment = normalize_sql(fragment);
        if fragment.is_empty() {
            continue;
        }
        match actual[search_start..].find(&fragment) {
            Some(pos) => search_start += pos + fragment.len(),
            None => panic!("expected SQL fragment `{fragment}` not found in `{actual}`"),
        }
    }
}
