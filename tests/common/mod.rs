#![allow(dead_code)]

pub mod mocks;

use std::{fs, path::PathBuf};

use product_batch::{
    config::JobConfig,
    product_import::{connect, create_product_table},
};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub use mocks::MockWriter;

pub const PRODUCTS_CSV: &str = "1,Widget,A small widget,100
2,Gadget,A gadget,200
3,Gizmo,Tiny gizmo,50";

/// A scratch directory holding the input file and the database of one test.
pub struct Workspace {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

impl Workspace {
    pub async fn new() -> Workspace {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("products.db").display());
        let pool = connect(&url).await.unwrap();
        create_product_table(&pool).await.unwrap();
        Workspace { dir, pool }
    }

    pub fn write_input(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("Products.csv");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn config(&self, input: &str) -> JobConfig {
        JobConfig {
            input_path: self.write_input(input),
            database_url: format!("sqlite://{}", self.dir.path().join("products.db").display()),
            ..JobConfig::default()
        }
    }

    pub async fn products(&self) -> Vec<(i64, String, String, i64)> {
        sqlx::query_as("SELECT id, name, description, price FROM Product ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    pub async fn ids(&self) -> Vec<i64> {
        self.products().await.into_iter().map(|row| row.0).collect()
    }
}
