use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::utils::database::{json_column, new_id, now, to_json};
use crate::utils::enums::{RankCategory, Region};

pub const MAX_PREDICTIONS: i64 = 100;

/// Closing rank per reservation category. `None` means no seats in that category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoffRanks {
    #[serde(rename = "OC")]
    pub oc: Option<i64>,
    #[serde(rename = "BC")]
    pub bc: Option<i64>,
    #[serde(rename = "SC")]
    pub sc: Option<i64>,
    #[serde(rename = "ST")]
    pub st: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: Option<String>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: String,
    pub name: String,
    pub district: String,
    pub state: Region,
    pub cutoff_ranks: CutoffRanks,
    pub reviews: Vec<Review>,
}

/// A college as it appears in an import file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeImport {
    pub name: String,
    pub district: String,
    pub state: Region,
    #[serde(default)]
    pub cutoff_ranks: CutoffRanks,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl College {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<College> {
        Ok(College {
            id: row.get("id")?,
            name: row.get("name")?,
            district: row.get("district")?,
            state: row.get("state")?,
            cutoff_ranks: CutoffRanks {
                oc: row.get("cutoff_oc")?,
                bc: row.get("cutoff_bc")?,
                sc: row.get("cutoff_sc")?,
                st: row.get("cutoff_st")?,
            },
            reviews: json_column(row, "reviews")?,
        })
    }

    pub fn insert(conn: &Connection, college: &CollegeImport) -> rusqlite::Result<String> {
        let id = new_id();
        conn.execute(
            "INSERT INTO colleges (id, name, district, state, cutoff_oc, cutoff_bc, cutoff_sc,
                                   cutoff_st, reviews, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                college.name.trim(),
                college.district.trim(),
                college.state,
                college.cutoff_ranks.oc,
                college.cutoff_ranks.bc,
                college.cutoff_ranks.sc,
                college.cutoff_ranks.st,
                to_json(&college.reviews)?,
                now()
            ],
        )?;
        Ok(id)
    }

    /// Inserts every college in one transaction. Returns how many were written.
    pub fn import(conn: &mut Connection, colleges: &[CollegeImport]) -> rusqlite::Result<usize> {
        let tx = conn.transaction()?;
        for college in colleges {
            College::insert(&tx, college)?;
        }
        tx.commit()?;
        Ok(colleges.len())
    }

    /// Colleges in `state` (and `district`) whose closing rank for `category`
    /// is at least `rank`, lowest cutoff first.
    pub fn predict(
        conn: &Connection,
        rank: i64,
        category: RankCategory,
        state: Region,
        district: Option<&str>,
    ) -> rusqlite::Result<Vec<College>> {
        let column = category.cutoff_column();
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM colleges
             WHERE state = ?1 AND {column} IS NOT NULL AND {column} >= ?2
               AND (?3 IS NULL OR district = ?3)
             ORDER BY {column} ASC, name ASC
             LIMIT ?4"
        ))?;
        let rows = stmt.query_map(
            params![state, rank, district, MAX_PREDICTIONS],
            College::from_row,
        )?;
        rows.collect()
    }
}
