//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL/PostGIS disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test PGDATABASE=postgres cargo test --test postgres_integration -- --ignored
//! ```

use std::collections::BTreeSet;

use bytes::BytesMut;
use deadpool_postgres::Pool;
use geo::{LineString, Polygon};
use geocoder_pl::export::postgres::{self, CopyChunk};
use geocoder_pl::export::transaction::{ImportStatus, ProvinceImport};
use geocoder_pl::{create_pool, DatabaseConfig};
use sektor::bdot10k::outline_geojson;
use sektor::{
    AddressPoint, BoundingBox, Building, PhraseIndex, PointSource, SearchParams, SectorCode,
    SectorGrid, SuperpermTable,
};

/// Un schéma par test : les tests peuvent tourner en parallèle
async fn setup(schema: &str) -> Pool {
    let config = DatabaseConfig::from_env();
    let pool = create_pool(&config).await.expect("Failed to create pool");
    postgres::create_schema(&pool, schema, true)
        .await
        .expect("Failed to create schema");
    pool
}

fn grid() -> SectorGrid {
    SectorGrid::new(300, BoundingBox::default()).unwrap()
}

fn square(lon: f64, lat: f64, size: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (lon, lat),
            (lon + size, lat),
            (lon + size, lat + size),
            (lon, lat + size),
            (lon, lat),
        ]),
        vec![],
    )
}

fn building(id: i64, lon: f64, lat: f64, description: &str) -> Building {
    let outline = square(lon, lat, 0.0002);
    Building {
        id,
        sector_code: grid().sector_code(lat + 0.0001, lon + 0.0001),
        category: "budynki mieszkalne".into(),
        carto_name: String::new(),
        condition: "eksploatowany".into(),
        function: String::new(),
        storeys: 3.0,
        historic: false,
        description: description.into(),
        area: 450,
        centroid_lat: lat + 0.0001,
        centroid_lon: lon + 0.0001,
        geojson: outline_geojson(&outline),
        outline,
    }
}

fn point(id: i64, street: &str, number: &str, lon: f64, lat: f64) -> AddressPoint {
    AddressPoint {
        id,
        woj: "MALOPOLSKIE".into(),
        powiat: "KRAKOW".into(),
        gmina: "KRAKOW".into(),
        town: "Kraków".into(),
        subtown: String::new(),
        street: street.into(),
        number: number.into(),
        postcode: "31-019".into(),
        status: "istniejacy".into(),
        lon,
        lat,
        source: PointSource::Prg,
        valid: true,
        boundary_distance: 0.0,
        building_id: None,
        building_distance: 0.0,
        sector_code: Some(grid().sector_code(lat, lon)),
        extra_description: String::new(),
    }
}

async fn count(pool: &Pool, schema: &str, table: &str) -> i64 {
    let client = pool.get().await.unwrap();
    client
        .query_one(&format!("SELECT COUNT(*) FROM {}.{}", schema, table), &[])
        .await
        .unwrap()
        .get(0)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_schema_creation() {
    let schema = "geocoder_test_schema";
    let pool = setup(schema).await;
    let client = pool.get().await.unwrap();

    let rows = client
        .query(
            "SELECT table_name::text FROM information_schema.tables WHERE table_schema::text = $1",
            &[&schema],
        )
        .await
        .unwrap();
    let mut tables: Vec<String> = rows.iter().map(|r| r.get(0)).collect();
    tables.sort();
    assert_eq!(
        tables,
        vec![
            "_import_checksums",
            "address_points",
            "buildings",
            "sector_phrases",
            "unique_phrases"
        ]
    );

    // Idempotent sans --drop-schema
    postgres::create_schema(&pool, schema, false).await.unwrap();
    postgres::create_indexes(&pool, schema).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_input_checksums() {
    let schema = "geocoder_test_checksums";
    let pool = setup(schema).await;

    assert!(!postgres::is_input_already_imported(&pool, schema, "PRG_opolskie.ndjson", "abc")
        .await
        .unwrap());

    let mut client = pool.get().await.unwrap();
    let tx = client.transaction().await.unwrap();
    postgres::record_input_checksum(&tx, schema, "PRG_opolskie.ndjson", "abc").await.unwrap();
    tx.commit().await.unwrap();

    assert!(postgres::is_input_already_imported(&pool, schema, "PRG_opolskie.ndjson", "abc")
        .await
        .unwrap());
    assert!(!postgres::is_input_already_imported(&pool, schema, "PRG_opolskie.ndjson", "def")
        .await
        .unwrap());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_buildings_copy_and_candidates() {
    let schema = "geocoder_test_buildings";
    let pool = setup(schema).await;

    let buildings = vec![
        building(1, 19.9390, 50.0620, ""),
        building(2, 19.9400, 50.0625, "Kościół Mariacki"),
    ];
    let mut buf = BytesMut::new();
    let mut wkt = Vec::new();
    for b in &buildings {
        postgres::write_building_row(&mut buf, b, &mut wkt).unwrap();
    }

    let mut client = pool.get().await.unwrap();
    let tx = client.transaction().await.unwrap();
    assert_eq!(postgres::max_id(&tx, schema, "buildings").await.unwrap(), 0);
    let sql = postgres::copy_sql(schema, "buildings", postgres::BUILDING_COLUMNS);
    let chunk = CopyChunk {
        data: buf.freeze(),
        rows: 2,
    };
    let rows = postgres::copy_chunks(&tx, &sql, futures::stream::iter(vec![chunk]))
        .await
        .unwrap();
    assert_eq!(rows, 2);
    assert_eq!(postgres::max_id(&tx, schema, "buildings").await.unwrap(), 2);
    tx.commit().await.unwrap();

    let sectors: BTreeSet<SectorCode> = buildings.iter().map(|b| b.sector_code).collect();
    let mut candidates = postgres::load_candidates(&pool, schema, &sectors).await.unwrap();
    candidates.sort_by_key(|c| c.id);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[1].description, "Kościół Mariacki");
    assert_eq!(candidates[0].outline.exterior(), buildings[0].outline.exterior());
    assert!((candidates[0].centroid.x - buildings[0].centroid_lon).abs() < 1e-9);

    let elsewhere: BTreeSet<SectorCode> = [SectorCode::new(0, 0)].into_iter().collect();
    assert!(postgres::load_candidates(&pool, schema, &elsewhere).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_province_rollback_leaves_nothing() {
    let schema = "geocoder_test_rollback";
    let pool = setup(schema).await;

    let points = vec![point(1, "Floriańska", "1", 19.9397, 50.0625)];
    let chunks = postgres::point_chunks(&points, 10).unwrap();

    let mut client = pool.get().await.unwrap();
    let mut import = ProvinceImport::begin(&mut client, "MALOPOLSKIE").await.unwrap();
    let sql = postgres::copy_sql(schema, "address_points", postgres::POINT_COLUMNS);
    let rows = postgres::copy_chunks(import.transaction(), &sql, futures::stream::iter(chunks))
        .await
        .unwrap();
    import.record_points(rows);
    let outcome = import.rollback("simulated failure").await;

    assert_eq!(outcome.status, ImportStatus::RolledBack);
    assert_eq!(outcome.points_written, 0);
    assert_eq!(count(&pool, schema, "address_points").await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_phrase_index_persisted_and_searched() {
    let schema = "geocoder_test_phrases";
    let pool = setup(schema).await;
    let grid = grid();
    let superperms = SuperpermTable::default();

    // Deux voïvodies successives écrivent dans le même secteur
    let batches = vec![
        vec![point(1, "Floriańska", "1", 19.9397, 50.0625)],
        vec![point(2, "Floriańska", "7", 19.9398, 50.0626)],
    ];
    for points in &batches {
        let mut client = pool.get().await.unwrap();
        let mut import = ProvinceImport::begin(&mut client, "MALOPOLSKIE").await.unwrap();

        let unique = postgres::load_unique_phrases(&**import.transaction(), schema)
            .await
            .unwrap();
        let mut phrases = PhraseIndex::with_unique(&unique);
        for p in points {
            let sector = p.sector_code.unwrap();
            phrases.index_point(sector, p, &superperms);
        }

        let sql = postgres::copy_sql(schema, "address_points", postgres::POINT_COLUMNS);
        let chunks = postgres::point_chunks(points, 10).unwrap();
        let rows = postgres::copy_chunks(import.transaction(), &sql, futures::stream::iter(chunks))
            .await
            .unwrap();
        import.record_points(rows);

        let blobs = phrases.take_blobs();
        postgres::append_sector_phrases(import.transaction(), schema, &blobs)
            .await
            .unwrap();
        postgres::save_unique_phrases(import.transaction(), schema, phrases.unique_text())
            .await
            .unwrap();
        let outcome = import.commit().await.unwrap();
        assert_eq!(outcome.points_written, 1);
    }

    let blobs = postgres::load_sector_phrases(&pool, schema).await.unwrap();
    assert_eq!(blobs.len(), 1);
    let blob = blobs.values().next().unwrap();
    assert!(blob.contains("[1]\n"));
    assert!(blob.ends_with("[2]\n"));

    let client = pool.get().await.unwrap();
    let unique = postgres::load_unique_phrases(&**client, schema).await.unwrap();
    let index = PhraseIndex::from_parts(blobs, &unique);
    let params = SearchParams {
        start: grid.sector_code(52.2297, 21.0122),
        max_sectors: 400,
        limit: 5,
    };
    let ids = index.search(&grid, "Kraków, Floriańska 7", &params);
    assert_eq!(ids, vec![2]);

    let rows = postgres::fetch_points(&pool, schema, &ids).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].street, "Floriańska");
    assert_eq!(rows[0].number, "7");
    assert!(rows[0].to_string().starts_with("[2] Floriańska 7, 31-019"));
}
