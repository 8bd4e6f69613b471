#![cfg(feature = "db")]
//! Raw import schema (`gis`) in PostGIS.
//!
//! Geometry leaves the database as GeoJSON text so the same record types serve
//! both sources.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::records::{
    GeometryCell, LineBushingRecord, NodeRecord, PrimaryLineRecord, RegionRecord, SubstationRecord,
    TransformerRecord,
};
use super::SourceStore;
use crate::domain::Role;

pub struct PgSource {
    pool: PgPool,
}

fn parse_geom(raw: Option<String>) -> Option<GeometryCell> {
    raw.as_deref().map(GeometryCell::parse)
}

#[derive(sqlx::FromRow)]
struct RegionRow {
    code: Option<String>,
    geom: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    power_status: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SubstationRow {
    generator_id: Option<String>,
    geom: Option<String>,
    phasing: Option<String>,
    description: Option<String>,
    voltage_rating_kv: Option<f64>,
    image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    bus_id: Option<String>,
    geom: Option<String>,
    description: Option<String>,
    nominal_voltage_kv: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct PrimaryLineRow {
    primary_line_id: Option<String>,
    geom: Option<String>,
    village: Option<String>,
    phasing: Option<String>,
    description: Option<String>,
    configuration: Option<String>,
    system_grounding_type: Option<String>,
    conductor_type: Option<String>,
    neutral_wire_type: Option<String>,
    earth_resistivity: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct TransformerRow {
    transformer_id: Option<String>,
    geom: Option<String>,
    description: Option<String>,
    installation_type: Option<String>,
    connection_code: Option<i32>,
    transformer_type: Option<String>,
    primary_voltage_rating_kv: Option<f64>,
    secondary_voltage_rating_kv: Option<f64>,
    image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LineBushingRow {
    line_bushing_id: Option<String>,
    geom: Option<String>,
    description: Option<String>,
    phasing: Option<String>,
    conductor_type: Option<String>,
}

const PRIMARY_LINE_COLUMNS: &str = r#"
    primary_line_id, ST_AsGeoJSON(geom) AS geom, village::text AS village, phasing,
    description, configuration, system_grounding_type, conductor_type,
    neutral_wire_type, earth_resistivity::int4 AS earth_resistivity
"#;

impl PgSource {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .context("connecting to source database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn primary_line(row: PrimaryLineRow) -> PrimaryLineRecord {
        PrimaryLineRecord {
            primary_line_id: row.primary_line_id,
            geom: parse_geom(row.geom),
            village: row.village,
            phasing: row.phasing,
            description: row.description,
            configuration: row.configuration,
            system_grounding_type: row.system_grounding_type,
            conductor_type: row.conductor_type,
            neutral_wire_type: row.neutral_wire_type,
            earth_resistivity: row.earth_resistivity,
        }
    }
}

#[async_trait]
impl SourceStore for PgSource {
    async fn regions(&self) -> Result<Vec<RegionRecord>> {
        let rows = sqlx::query_as::<_, RegionRow>(
            r#"
            SELECT id::text AS code, ST_AsGeoJSON(geom) AS geom, village, municipality,
                   electricity_status AS power_status
            FROM gis.franchise_area
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("scanning gis.franchise_area")?;

        Ok(rows
            .into_iter()
            .map(|r| RegionRecord {
                code: r.code,
                geom: parse_geom(r.geom),
                village: r.village,
                municipality: r.municipality,
                power_status: r.power_status,
            })
            .collect())
    }

    async fn substations(&self) -> Result<Vec<SubstationRecord>> {
        let rows = sqlx::query_as::<_, SubstationRow>(
            r#"
            SELECT generator_id, ST_AsGeoJSON(geom) AS geom, phasing, description,
                   voltage_rating_kv::float8 AS voltage_rating_kv, image
            FROM gis.power_station
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("scanning gis.power_station")?;

        Ok(rows
            .into_iter()
            .map(|r| SubstationRecord {
                generator_id: r.generator_id,
                geom: parse_geom(r.geom),
                phasing: r.phasing,
                description: r.description,
                voltage_rating_kv: r.voltage_rating_kv,
                image: r.image,
            })
            .collect())
    }

    async fn nodes(&self) -> Result<Vec<NodeRecord>> {
        let rows = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT bus_id, ST_AsGeoJSON(geom) AS geom, description,
                   nominal_voltage_kv::float8 AS nominal_voltage_kv
            FROM gis.bus
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("scanning gis.bus")?;

        Ok(rows
            .into_iter()
            .map(|r| NodeRecord {
                bus_id: r.bus_id,
                geom: parse_geom(r.geom),
                description: r.description,
                nominal_voltage_kv: r.nominal_voltage_kv,
                remarks: None,
            })
            .collect())
    }

    async fn primary_line_villages(&self) -> Result<Vec<Option<String>>> {
        let villages: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT DISTINCT village::text FROM gis.primary_line")
                .fetch_all(&self.pool)
                .await
                .context("listing primary line villages")?;
        Ok(villages.into_iter().map(|(v,)| v).collect())
    }

    async fn primary_lines_in_village(&self, village: Option<&str>) -> Result<Vec<PrimaryLineRecord>> {
        let sql = format!(
            "SELECT {PRIMARY_LINE_COLUMNS} FROM gis.primary_line \
             WHERE village::text IS NOT DISTINCT FROM $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, PrimaryLineRow>(&sql)
            .bind(village)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("scanning gis.primary_line for village {village:?}"))?;
        Ok(rows.into_iter().map(Self::primary_line).collect())
    }

    async fn transformers(&self) -> Result<Vec<TransformerRecord>> {
        let rows = sqlx::query_as::<_, TransformerRow>(
            r#"
            SELECT transformer_id, ST_AsGeoJSON(geom) AS geom, description, installation_type,
                   connection_code, transformer_type,
                   primary_voltage_rating_kv::float8 AS primary_voltage_rating_kv,
                   secondary_voltage_rating_kv::float8 AS secondary_voltage_rating_kv,
                   image
            FROM gis.distribution_transformer
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("scanning gis.distribution_transformer")?;

        Ok(rows
            .into_iter()
            .map(|r| TransformerRecord {
                transformer_id: r.transformer_id,
                geom: parse_geom(r.geom),
                description: r.description,
                installation_type: r.installation_type,
                connection_code: r.connection_code,
                transformer_type: r.transformer_type,
                primary_voltage_rating_kv: r.primary_voltage_rating_kv,
                secondary_voltage_rating_kv: r.secondary_voltage_rating_kv,
                image: r.image,
            })
            .collect())
    }

    async fn line_bushings(&self, role: Role) -> Result<Vec<LineBushingRecord>> {
        // Same precedence as Role::classify: a description naming both is primary.
        let filter = match role {
            Role::Primary => "description::text ILIKE '%PRIMARY%'",
            Role::Secondary => {
                "description::text ILIKE '%SECONDARY%' AND description::text NOT ILIKE '%PRIMARY%'"
            }
            Role::Unclassified => return Ok(Vec::new()),
        };
        let sql = format!(
            "SELECT line_bushing_id, ST_AsGeoJSON(geom) AS geom, description, phasing, conductor_type \
             FROM gis.line_bushing WHERE {filter} ORDER BY id"
        );
        let rows = sqlx::query_as::<_, LineBushingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("scanning gis.line_bushing for {role} bushings"))?;

        Ok(rows
            .into_iter()
            .map(|r| LineBushingRecord {
                line_bushing_id: r.line_bushing_id,
                geom: parse_geom(r.geom),
                description: r.description,
                phasing: r.phasing,
                conductor_type: r.conductor_type,
            })
            .collect())
    }

    async fn transformer_type_labels(&self) -> Result<Vec<String>> {
        let labels: Vec<(Option<String>,)> = sqlx::query_as(
            "SELECT DISTINCT transformer_type FROM gis.distribution_transformer \
             WHERE transformer_type IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing transformer types")?;
        Ok(super::distinct_labels(labels.into_iter().map(|(l,)| l)))
    }
}
