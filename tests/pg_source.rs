//! PostGIS source queries. Needs a disposable database with PostGIS available:
//!
//! `DATABASE_URL=postgres://... cargo test --features db -- --ignored`
//!
//! The test recreates the `gis` tables it reads.
#![cfg(feature = "db")]

use distgrid::domain::Role;
use distgrid::source::pg::PgSource;
use distgrid::source::{RowError, SourceStore};
use sqlx::postgres::PgPoolOptions;

const FIXTURE: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;
CREATE SCHEMA IF NOT EXISTS gis;
DROP TABLE IF EXISTS gis.primary_line, gis.line_bushing, gis.distribution_transformer;

CREATE TABLE gis.primary_line (
    id serial PRIMARY KEY,
    primary_line_id text,
    geom geometry(Geometry, 4326),
    village text,
    phasing text,
    description text,
    configuration text,
    system_grounding_type text,
    conductor_type text,
    neutral_wire_type text,
    earth_resistivity numeric
);

CREATE TABLE gis.line_bushing (
    id serial PRIMARY KEY,
    line_bushing_id text,
    geom geometry(LineString, 4326),
    description text,
    phasing text,
    conductor_type text
);

CREATE TABLE gis.distribution_transformer (
    id serial PRIMARY KEY,
    transformer_id text,
    geom geometry(Point, 4326),
    description text,
    installation_type text,
    connection_code int4,
    transformer_type text,
    primary_voltage_rating_kv numeric,
    secondary_voltage_rating_kv numeric,
    image text
);

INSERT INTO gis.primary_line (primary_line_id, geom, village, earth_resistivity) VALUES
    ('L1', ST_GeomFromText('LINESTRING(120.1 17.5, 120.2 17.5)', 4326), 'Bantay', 100),
    ('L2', ST_GeomFromText('LINESTRING(120.2 17.5, 120.3 17.5)', 4326), NULL, NULL),
    ('L3', ST_GeomFromText('LINESTRING(120.3 17.5, 120.4 17.5)', 4326), 'Bantay', NULL),
    ('L4', ST_GeomFromText('MULTILINESTRING((120.4 17.5, 120.5 17.5))', 4326), 'Caoayan', NULL);

INSERT INTO gis.line_bushing (line_bushing_id, geom, description) VALUES
    ('LB1', ST_GeomFromText('LINESTRING(0 0, 0 1)', 4326), 'Primary Line Bushing'),
    ('LB2', ST_GeomFromText('LINESTRING(0 1, 0 2)', 4326), 'secondary line bushing'),
    ('LB3', ST_GeomFromText('LINESTRING(0 2, 0 3)', 4326), 'primary/secondary tap'),
    ('LB4', ST_GeomFromText('LINESTRING(0 3, 0 4)', 4326), 'service drop');

INSERT INTO gis.distribution_transformer (transformer_id, geom, transformer_type) VALUES
    ('T1', ST_GeomFromText('POINT(0 1)', 4326), 'Pole 25kVA'),
    ('T2', ST_GeomFromText('POINT(0 2)', 4326), ' Pole 25kVA '),
    ('T3', ST_GeomFromText('POINT(0 3)', 4326), NULL);
"#;

async fn source() -> PgSource {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    sqlx::raw_sql(FIXTURE).execute(&pool).await.unwrap();
    PgSource::from_pool(pool)
}

fn keys<T>(records: &[T], key: impl Fn(&T) -> Option<&str>) -> Vec<String> {
    records.iter().filter_map(|r| key(r).map(str::to_string)).collect()
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with PostGIS"]
async fn test_gis_queries() {
    let src = source().await;

    // Village partitions, the unset village included.
    let mut villages = src.primary_line_villages().await.unwrap();
    villages.sort();
    assert_eq!(
        villages,
        vec![None, Some("Bantay".to_string()), Some("Caoayan".to_string())]
    );

    let bantay = src.primary_lines_in_village(Some("Bantay")).await.unwrap();
    assert_eq!(keys(&bantay, |r| r.key()), vec!["L1", "L3"]);
    assert_eq!(bantay[0].earth_resistivity, Some(100));
    let unset = src.primary_lines_in_village(None).await.unwrap();
    assert_eq!(keys(&unset, |r| r.key()), vec!["L2"]);
    let l1 = bantay[0].clone().into_row().unwrap();
    assert_eq!(l1.geom.0.len(), 2);

    // A geometry type the store cannot hold is reported with its type.
    let caoayan = src.primary_lines_in_village(Some("Caoayan")).await.unwrap();
    match caoayan[0].clone().into_row() {
        Err(RowError::MalformedGeometry(reason)) => assert!(reason.contains("MultiLineString")),
        other => panic!("unexpected result: {other:?}"),
    }

    // Bushing scans by role; a description naming both roles counts as primary.
    let primary = src.line_bushings(Role::Primary).await.unwrap();
    assert_eq!(keys(&primary, |r| r.key()), vec!["LB1", "LB3"]);
    let secondary = src.line_bushings(Role::Secondary).await.unwrap();
    assert_eq!(keys(&secondary, |r| r.key()), vec!["LB2"]);
    assert!(src.line_bushings(Role::Unclassified).await.unwrap().is_empty());

    assert_eq!(
        src.transformer_type_labels().await.unwrap(),
        vec!["Pole 25kVA".to_string()]
    );
}
