//! Tables and table apis
//!
//! A [`Table`] is a schema: a named set of columns. A [`TableApi`] is one
//! filled instance of that schema (a "row" in spreadsheet terms). Table apis
//! can nest under a parent instance, forming a tree.

use chrono::{DateTime, Utc};

use crate::id::{TableApiId, TableId};

/// A user-defined table schema
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TableId::new(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// One filled instance of a table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableApi {
    pub id: TableApiId,
    pub table: TableId,
    /// Parent instance, if nested
    pub parent: Option<TableApiId>,
    pub created_at: DateTime<Utc>,
}

impl TableApi {
    pub fn new(table: TableId, parent: Option<TableApiId>) -> Self {
        Self {
            id: TableApiId::new(),
            table,
            parent,
            created_at: Utc::now(),
        }
    }

    /// Check if this instance is nested under another
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }
}
