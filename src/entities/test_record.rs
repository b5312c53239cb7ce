//! Test entity - Placeholder table used by the `testc` cog.
//!
//! Holds a single 64-bit integer that doubles as the primary key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Test database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test")]
pub struct Model {
    /// Stored value, unique per row
    #[sea_orm(primary_key, auto_increment = false)]
    pub test: i64,
}

/// The test table has no relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
