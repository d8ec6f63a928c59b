//! Export vers PostgreSQL/PostGIS
//!
//! Tables : `buildings`, `address_points`, `sector_phrases`,
//! `unique_phrases` et `_import_checksums`. Les lignes sont envoyées par
//! `COPY ... FROM STDIN` au format CSV (`|`, quote `"`).

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use bytes::BytesMut;
use deadpool_postgres::{Pool, Transaction};
use futures::{SinkExt, Stream, StreamExt};
use geo::{Geometry, Point, Polygon};
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use sektor::{AddressPoint, Building, BuildingCandidate, SectorCode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// SRID des géométries persistées
pub const SRID: u32 = 4326;

/// Chunk CSV pré-formaté pour COPY
#[derive(Debug)]
pub struct CopyChunk {
    pub data: bytes::Bytes,
    pub rows: u64,
}

/// Colonnes de `buildings` dans l'ordre des lignes COPY
pub const BUILDING_COLUMNS: &[&str] = &[
    "id",
    "sector_code",
    "category",
    "carto_name",
    "condition",
    "function",
    "storeys",
    "historic",
    "description",
    "area",
    "centroid_lat",
    "centroid_lon",
    "geojson",
    "geom",
];

/// Colonnes de `address_points` dans l'ordre des lignes COPY
pub const POINT_COLUMNS: &[&str] = &[
    "id",
    "woj",
    "powiat",
    "gmina",
    "town",
    "subtown",
    "street",
    "number",
    "postcode",
    "status",
    "lat",
    "lon",
    "source",
    "valid",
    "boundary_distance",
    "building_id",
    "building_distance",
    "sector_code",
    "extra_description",
    "geom",
];

/// Crée le schéma et les tables
pub async fn create_schema(pool: &Pool, schema: &str, drop_existing: bool) -> Result<()> {
    let client = pool.get().await?;

    if drop_existing {
        client
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema), &[])
            .await
            .context("Failed to drop schema")?;
    }

    client
        .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema), &[])
        .await
        .context("Failed to create schema")?;

    // L'extension peut exister sans que l'utilisateur ait le droit de la créer
    match client
        .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
        .await
    {
        Ok(_) => {}
        Err(e) => {
            warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
            let exists = client
                .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                .await
                .context("Failed to check pg_extension")?
                .is_some();
            if !exists {
                return Err(anyhow::anyhow!(
                    "PostGIS extension is not installed and could not be created: {e}"
                ));
            }
        }
    }

    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {schema}.buildings (
            id BIGINT PRIMARY KEY,
            sector_code TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            carto_name TEXT NOT NULL DEFAULT '',
            condition TEXT NOT NULL DEFAULT '',
            function TEXT NOT NULL DEFAULT '',
            storeys DOUBLE PRECISION NOT NULL DEFAULT 0,
            historic BOOLEAN NOT NULL DEFAULT FALSE,
            description TEXT NOT NULL DEFAULT '',
            area BIGINT NOT NULL DEFAULT 0,
            centroid_lat DOUBLE PRECISION NOT NULL,
            centroid_lon DOUBLE PRECISION NOT NULL,
            geojson TEXT NOT NULL,
            geom geometry(Polygon, {srid})
        );
        CREATE TABLE IF NOT EXISTS {schema}.address_points (
            id BIGINT PRIMARY KEY,
            woj TEXT NOT NULL,
            powiat TEXT NOT NULL,
            gmina TEXT NOT NULL,
            town TEXT NOT NULL DEFAULT '',
            subtown TEXT NOT NULL DEFAULT '',
            street TEXT NOT NULL DEFAULT '',
            number TEXT NOT NULL DEFAULT '',
            postcode TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT '',
            lat DOUBLE PRECISION NOT NULL,
            lon DOUBLE PRECISION NOT NULL,
            source TEXT NOT NULL,
            valid BOOLEAN NOT NULL,
            boundary_distance DOUBLE PRECISION NOT NULL DEFAULT 0,
            building_id BIGINT,
            building_distance DOUBLE PRECISION NOT NULL DEFAULT 0,
            sector_code TEXT,
            extra_description TEXT NOT NULL DEFAULT '',
            geom geometry(Point, {srid})
        );
        CREATE TABLE IF NOT EXISTS {schema}.sector_phrases (
            sector_code TEXT PRIMARY KEY,
            phrases TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {schema}.unique_phrases (
            id INTEGER PRIMARY KEY,
            phrases TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {schema}._import_checksums (
            input_name TEXT PRIMARY KEY,
            checksum TEXT NOT NULL,
            imported_at TIMESTAMPTZ DEFAULT NOW()
        );
        "#,
        schema = schema,
        srid = SRID
    );

    client
        .batch_execute(&sql)
        .await
        .with_context(|| format!("Failed to create tables in schema {}", schema))?;

    Ok(())
}

/// Vérifie si un fichier d'entrée a déjà été importé (checksum identique)
pub async fn is_input_already_imported(
    pool: &Pool,
    schema: &str,
    input_name: &str,
    checksum: &str,
) -> Result<bool> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            &format!(
                "SELECT 1 FROM {}._import_checksums WHERE input_name = $1 AND checksum = $2",
                schema
            ),
            &[&input_name, &checksum],
        )
        .await?;

    Ok(row.is_some())
}

/// Enregistre le checksum d'un fichier, dans la transaction de son import
pub async fn record_input_checksum(
    tx: &Transaction<'_>,
    schema: &str,
    input_name: &str,
    checksum: &str,
) -> Result<()> {
    tx.execute(
        &format!(
            r#"
            INSERT INTO {}._import_checksums (input_name, checksum)
            VALUES ($1, $2)
            ON CONFLICT (input_name) DO UPDATE SET checksum = $2, imported_at = NOW()
            "#,
            schema
        ),
        &[&input_name, &checksum],
    )
    .await
    .context("Failed to record input checksum")?;

    Ok(())
}

/// Crée les index après import
pub async fn create_indexes(pool: &Pool, schema: &str) -> Result<()> {
    let client = pool.get().await?;

    let statements = [
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{s}_buildings_sector ON {s}.buildings (sector_code)",
            s = schema
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{s}_buildings_geom ON {s}.buildings USING GIST (geom)",
            s = schema
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{s}_points_sector ON {s}.address_points (sector_code)",
            s = schema
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{s}_points_building ON {s}.address_points (building_id)",
            s = schema
        ),
    ];

    for sql in &statements {
        client
            .execute(sql.as_str(), &[])
            .await
            .with_context(|| format!("Failed to create index: {}", sql))?;
    }

    info!(schema = %schema, "Indexes created");
    Ok(())
}

/// Commande COPY pour une table et ses colonnes
pub fn copy_sql(schema: &str, table: &str, columns: &[&str]) -> String {
    format!(
        "COPY {}.{} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER '|', QUOTE '\"', ESCAPE '\"', NULL '')",
        schema,
        table,
        columns.join(", ")
    )
}

/// Envoie des chunks CSV pré-formatés dans un COPY ouvert sur `tx`
///
/// Chaque chunk doit contenir des lignes terminées par `\n` et correspondre
/// exactement aux colonnes de `copy_sql`.
pub async fn copy_chunks<S>(tx: &Transaction<'_>, copy_sql: &str, chunks: S) -> Result<u64>
where
    S: Stream<Item = CopyChunk>,
{
    let copy_in = tx.copy_in(copy_sql).await.context("Failed to start COPY")?;
    let mut pinned = std::pin::pin!(copy_in);
    let mut chunks = std::pin::pin!(chunks);

    let mut total_rows: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        if chunk.data.is_empty() {
            continue;
        }
        pinned
            .as_mut()
            .send(chunk.data)
            .await
            .context("Failed to send COPY chunk")?;
        total_rows += chunk.rows;
    }

    pinned.close().await.context("Failed to finish COPY")?;
    debug!(rows = total_rows, "COPY finished");
    Ok(total_rows)
}

/// Adapte un récepteur de chunks (producteur sur un autre thread) en stream
pub fn receiver_stream(rx: mpsc::Receiver<CopyChunk>) -> impl Stream<Item = CopyChunk> {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|c| (c, rx)) })
}

/// Écrit un champ texte entre guillemets ; les retours à la ligne deviennent des espaces
pub fn push_csv_text_field(buf: &mut BytesMut, value: &str) {
    buf.extend_from_slice(b"\"");
    for b in value.as_bytes() {
        match *b {
            b'"' => buf.extend_from_slice(b"\"\""),
            b'\n' | b'\r' => buf.extend_from_slice(b" "),
            _ => buf.extend_from_slice(&[*b]),
        }
    }
    buf.extend_from_slice(b"\"");
}

fn push_display(buf: &mut BytesMut, value: impl std::fmt::Display) {
    buf.extend_from_slice(value.to_string().as_bytes());
}

fn push_bool(buf: &mut BytesMut, value: bool) {
    buf.extend_from_slice(if value { b"t" } else { b"f" });
}

/// Géométrie en EWKT (`SRID=4326;...`)
pub fn to_ewkt(geometry: &Geometry<f64>, wkt_buf: &mut Vec<u8>) -> Result<String> {
    wkt_buf.clear();
    {
        let mut writer = WktWriter::new(&mut *wkt_buf);
        geometry
            .process_geom(&mut writer)
            .context("Failed to convert geometry to WKT")?;
    }
    Ok(format!("SRID={};{}", SRID, String::from_utf8_lossy(wkt_buf)))
}

/// Ajoute la ligne COPY d'un bâtiment
pub fn write_building_row(buf: &mut BytesMut, building: &Building, wkt_buf: &mut Vec<u8>) -> Result<()> {
    let ewkt = to_ewkt(&Geometry::Polygon(building.outline.clone()), wkt_buf)?;

    push_display(buf, building.id);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &building.sector_code.to_string());
    for text in [
        &building.category,
        &building.carto_name,
        &building.condition,
        &building.function,
    ] {
        buf.extend_from_slice(b"|");
        push_csv_text_field(buf, text);
    }
    buf.extend_from_slice(b"|");
    push_display(buf, building.storeys);
    buf.extend_from_slice(b"|");
    push_bool(buf, building.historic);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &building.description);
    buf.extend_from_slice(b"|");
    push_display(buf, building.area);
    buf.extend_from_slice(b"|");
    push_display(buf, building.centroid_lat);
    buf.extend_from_slice(b"|");
    push_display(buf, building.centroid_lon);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &building.geojson);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &ewkt);
    buf.extend_from_slice(b"\n");
    Ok(())
}

/// Ajoute la ligne COPY d'un point adresse
pub fn write_point_row(buf: &mut BytesMut, point: &AddressPoint, wkt_buf: &mut Vec<u8>) -> Result<()> {
    let ewkt = to_ewkt(&Geometry::Point(Point::new(point.lon, point.lat)), wkt_buf)?;

    push_display(buf, point.id);
    for text in [
        &point.woj,
        &point.powiat,
        &point.gmina,
        &point.town,
        &point.subtown,
        &point.street,
        &point.number,
        &point.postcode,
        &point.status,
    ] {
        buf.extend_from_slice(b"|");
        push_csv_text_field(buf, text);
    }
    buf.extend_from_slice(b"|");
    push_display(buf, point.lat);
    buf.extend_from_slice(b"|");
    push_display(buf, point.lon);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, point.source.as_str());
    buf.extend_from_slice(b"|");
    push_bool(buf, point.valid);
    buf.extend_from_slice(b"|");
    push_display(buf, point.boundary_distance);
    buf.extend_from_slice(b"|");
    if let Some(id) = point.building_id {
        push_display(buf, id);
    }
    buf.extend_from_slice(b"|");
    push_display(buf, point.building_distance);
    buf.extend_from_slice(b"|");
    if let Some(code) = point.sector_code {
        push_csv_text_field(buf, &code.to_string());
    }
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &point.extra_description);
    buf.extend_from_slice(b"|");
    push_csv_text_field(buf, &ewkt);
    buf.extend_from_slice(b"\n");
    Ok(())
}

/// Découpe les points en chunks COPY de `rows_per_chunk` lignes
pub fn point_chunks(points: &[AddressPoint], rows_per_chunk: usize) -> Result<Vec<CopyChunk>> {
    let mut wkt_buf = Vec::with_capacity(64);
    let mut chunks = Vec::new();
    for batch in points.chunks(rows_per_chunk.max(1)) {
        let mut buf = BytesMut::with_capacity(batch.len() * 256);
        for point in batch {
            write_point_row(&mut buf, point, &mut wkt_buf)?;
        }
        chunks.push(CopyChunk {
            data: buf.freeze(),
            rows: batch.len() as u64,
        });
    }
    Ok(chunks)
}

/// Plus grand identifiant d'une table (0 si vide)
pub async fn max_id(tx: &Transaction<'_>, schema: &str, table: &str) -> Result<i64> {
    let row = tx
        .query_one(&format!("SELECT COALESCE(MAX(id), 0)::BIGINT FROM {}.{}", schema, table), &[])
        .await
        .with_context(|| format!("Failed to read max id of {}.{}", schema, table))?;
    Ok(row.get(0))
}

/// Convertit le contour GeoJSON persisté en polygone
pub fn parse_outline(geojson: &str) -> Result<Polygon<f64>> {
    let geometry: geojson::Geometry =
        serde_json::from_str(geojson).context("Invalid building GeoJSON")?;
    match geometry.value {
        geojson::Value::Polygon(rings) => rings
            .first()
            .and_then(|ring| crate::input::ring_to_polygon(ring))
            .context("Building outline has no valid ring"),
        _ => anyhow::bail!("Building GeoJSON is not a Polygon"),
    }
}

/// Charge les bâtiments candidats des secteurs demandés
pub async fn load_candidates(
    pool: &Pool,
    schema: &str,
    sectors: &BTreeSet<SectorCode>,
) -> Result<Vec<BuildingCandidate>> {
    if sectors.is_empty() {
        return Ok(Vec::new());
    }
    let client = pool.get().await?;
    let codes: Vec<String> = sectors.iter().map(|s| s.to_string()).collect();

    let rows = client
        .query(
            &format!(
                "SELECT id, description, centroid_lat, centroid_lon, sector_code, geojson \
                 FROM {}.buildings WHERE sector_code = ANY($1)",
                schema
            ),
            &[&codes],
        )
        .await
        .context("Failed to load candidate buildings")?;

    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.get(0);
        let sector: String = row.get(4);
        let geojson: String = row.get(5);
        let (sector_code, outline) = match (sector.parse::<SectorCode>(), parse_outline(&geojson)) {
            (Ok(code), Ok(outline)) => (code, outline),
            (Err(e), _) => {
                warn!(building = id, error = %e, "Skipping building with invalid sector code");
                continue;
            }
            (_, Err(e)) => {
                warn!(building = id, error = %e, "Skipping building with invalid outline");
                continue;
            }
        };
        candidates.push(BuildingCandidate {
            id,
            description: row.get(1),
            centroid: geo::Coord {
                x: row.get(3),
                y: row.get(2),
            },
            sector_code,
            outline,
        });
    }

    debug!(sectors = codes.len(), candidates = candidates.len(), "Candidates loaded");
    Ok(candidates)
}

/// Ajoute les blocs de phrases à la fin des blocs existants
pub async fn append_sector_phrases(
    tx: &Transaction<'_>,
    schema: &str,
    blobs: &BTreeMap<SectorCode, String>,
) -> Result<usize> {
    let stmt = tx
        .prepare(&format!(
            r#"
            INSERT INTO {s}.sector_phrases (sector_code, phrases) VALUES ($1, $2)
            ON CONFLICT (sector_code) DO UPDATE
            SET phrases = {s}.sector_phrases.phrases || EXCLUDED.phrases
            "#,
            s = schema
        ))
        .await
        .context("Failed to prepare phrase upsert")?;

    for (sector, text) in blobs {
        let code = sector.to_string();
        tx.execute(&stmt, &[&code, text])
            .await
            .with_context(|| format!("Failed to append phrases of sector {}", code))?;
    }
    Ok(blobs.len())
}

/// Charge tous les blocs de phrases
pub async fn load_sector_phrases(pool: &Pool, schema: &str) -> Result<BTreeMap<SectorCode, String>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT sector_code, phrases FROM {}.sector_phrases", schema),
            &[],
        )
        .await
        .context("Failed to load sector phrases")?;

    let mut blobs = BTreeMap::new();
    for row in rows {
        let code: String = row.get(0);
        match code.parse::<SectorCode>() {
            Ok(sector) => {
                blobs.insert(sector, row.get(1));
            }
            Err(e) => warn!(sector = %code, error = %e, "Ignoring phrase block"),
        }
    }
    Ok(blobs)
}

/// Chaîne des jetons uniques (vide si rien n'a encore été importé)
pub async fn load_unique_phrases(
    client: &impl tokio_postgres::GenericClient,
    schema: &str,
) -> Result<String> {
    let row = client
        .query_opt(
            &format!("SELECT phrases FROM {}.unique_phrases WHERE id = 1", schema),
            &[],
        )
        .await
        .context("Failed to load unique phrases")?;
    Ok(row.map(|r| r.get(0)).unwrap_or_default())
}

/// Remplace la chaîne des jetons uniques
pub async fn save_unique_phrases(tx: &Transaction<'_>, schema: &str, text: &str) -> Result<()> {
    tx.execute(
        &format!(
            r#"
            INSERT INTO {}.unique_phrases (id, phrases) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET phrases = EXCLUDED.phrases
            "#,
            schema
        ),
        &[&text],
    )
    .await
    .context("Failed to save unique phrases")?;
    Ok(())
}

/// Point adresse tel qu'affiché par la recherche
#[derive(Debug, Clone)]
pub struct PointRow {
    pub id: i64,
    pub town: String,
    pub street: String,
    pub number: String,
    pub postcode: String,
    pub gmina: String,
    pub lat: f64,
    pub lon: f64,
    pub source: String,
    pub valid: bool,
    pub building_id: Option<i64>,
    pub building_distance: f64,
    pub extra_description: String,
}

impl std::fmt::Display for PointRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let street = if self.street.is_empty() { &self.town } else { &self.street };
        write!(
            f,
            "[{}] {} {}, {} {} ({}) {:.6}, {:.6} [{}{}]",
            self.id,
            street,
            self.number,
            self.postcode,
            self.town,
            self.gmina,
            self.lat,
            self.lon,
            self.source,
            if self.valid { "" } else { ", outside gmina" }
        )?;
        if let Some(building) = self.building_id {
            write!(f, " building {} at {:.1} m", building, self.building_distance)?;
            if !self.extra_description.is_empty() {
                write!(f, " ({})", self.extra_description)?;
            }
        }
        Ok(())
    }
}

/// Charge les points adresse demandés, dans l'ordre de `ids`
pub async fn fetch_points(pool: &Pool, schema: &str, ids: &[i64]) -> Result<Vec<PointRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT id, town, street, number, postcode, gmina, lat, lon, source, valid, \
                 building_id, building_distance, extra_description \
                 FROM {}.address_points WHERE id = ANY($1)",
                schema
            ),
            &[&ids],
        )
        .await
        .context("Failed to fetch address points")?;

    let mut by_id: BTreeMap<i64, PointRow> = rows
        .into_iter()
        .map(|row| {
            let point = PointRow {
                id: row.get(0),
                town: row.get(1),
                street: row.get(2),
                number: row.get(3),
                postcode: row.get(4),
                gmina: row.get(5),
                lat: row.get(6),
                lon: row.get(7),
                source: row.get(8),
                valid: row.get(9),
                building_id: row.get(10),
                building_distance: row.get(11),
                extra_description: row.get(12),
            };
            (point.id, point)
        })
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};
    use sektor::PointSource;

    fn point() -> AddressPoint {
        AddressPoint {
            id: 12,
            woj: "MAZOWIECKIE".into(),
            powiat: "WARSZAWA".into(),
            gmina: "WARSZAWA".into(),
            town: "Warszawa".into(),
            subtown: String::new(),
            street: "Plac \"Defilad\"".into(),
            number: "1".into(),
            postcode: "00-901".into(),
            status: "istniejacy".into(),
            lon: 21.006725,
            lat: 52.231838,
            source: PointSource::Prg,
            valid: true,
            boundary_distance: 0.0,
            building_id: None,
            building_distance: 0.0,
            sector_code: Some(SectorCode::new(176, 190)),
            extra_description: "Pałac\nKultury".into(),
        }
    }

    #[test]
    fn test_push_csv_text_field() {
        let mut buf = BytesMut::new();
        push_csv_text_field(&mut buf, "a \"b\"\r\nc");
        assert_eq!(&buf[..], b"\"a \"\"b\"\"  c\"");
    }

    #[test]
    fn test_copy_sql() {
        let sql = copy_sql("geocoder", "buildings", &["id", "geom"]);
        assert_eq!(
            sql,
            "COPY geocoder.buildings (id, geom) FROM STDIN WITH (FORMAT csv, DELIMITER '|', QUOTE '\"', ESCAPE '\"', NULL '')"
        );
    }

    #[test]
    fn test_point_row() {
        let mut buf = BytesMut::new();
        let mut wkt = Vec::new();
        write_point_row(&mut buf, &point(), &mut wkt).unwrap();
        let row = std::str::from_utf8(&buf).unwrap();

        assert!(row.ends_with('\n'));
        let fields: Vec<&str> = row.trim_end().split('|').collect();
        assert_eq!(fields.len(), POINT_COLUMNS.len());
        assert_eq!(fields[0], "12");
        assert_eq!(fields[6], "\"Plac \"\"Defilad\"\"\"");
        assert_eq!(fields[12], "\"PRG\"");
        assert_eq!(fields[13], "t");
        // building_id absent → NULL
        assert_eq!(fields[15], "");
        assert_eq!(fields[17], "\"176_190\"");
        assert_eq!(fields[18], "\"Pałac Kultury\"");
        assert!(fields[19].starts_with("\"SRID=4326;POINT"));
    }

    #[test]
    fn test_building_row_and_outline() {
        let outline = Polygon::new(
            LineString::from(vec![(21.0, 52.0), (21.001, 52.0), (21.001, 52.001), (21.0, 52.0)]),
            vec![],
        );
        let building = Building {
            id: 7,
            sector_code: SectorCode::new(150, 190),
            category: "budynki mieszkalne".into(),
            carto_name: String::new(),
            condition: "eksploatowany".into(),
            function: "a | b".into(),
            storeys: 2.0,
            historic: false,
            description: String::new(),
            area: 1234,
            centroid_lat: 52.000333,
            centroid_lon: 21.000667,
            geojson: sektor::bdot10k::outline_geojson(&outline),
            outline: outline.clone(),
        };

        let mut buf = BytesMut::new();
        let mut wkt = Vec::new();
        write_building_row(&mut buf, &building, &mut wkt).unwrap();
        let row = std::str::from_utf8(&buf).unwrap();
        assert!(row.starts_with("7|\"150_190\"|\"budynki mieszkalne\"|\"\"|"));
        assert!(row.contains("|\"a | b\"|2|f|\"\"|1234|52.000333|21.000667|"));
        assert!(row.contains("\"SRID=4326;POLYGON"));

        let parsed = parse_outline(&building.geojson).unwrap();
        assert_eq!(parsed.exterior(), outline.exterior());
        assert!(parse_outline("{\"type\":\"Point\",\"coordinates\":[1,2]}").is_err());
    }

    #[test]
    fn test_point_chunks() {
        let points: Vec<AddressPoint> = (0..5)
            .map(|i| AddressPoint { id: i, ..point() })
            .collect();
        let chunks = point_chunks(&points, 2).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.rows).sum::<u64>(), 5);
        assert_eq!(chunks[2].rows, 1);
    }

    #[test]
    fn test_point_row_display() {
        let row = PointRow {
            id: 3,
            town: "Kraków".into(),
            street: "Floriańska".into(),
            number: "1".into(),
            postcode: "31-019".into(),
            gmina: "KRAKOW".into(),
            lat: 50.0625,
            lon: 19.9397,
            source: "OSM".into(),
            valid: true,
            building_id: Some(10),
            building_distance: 3.26,
            extra_description: "Kamienica".into(),
        };
        let text = row.to_string();
        assert!(text.starts_with("[3] Floriańska 1, 31-019 Kraków (KRAKOW)"));
        assert!(text.contains("[OSM]"));
        assert!(text.ends_with("building 10 at 3.3 m (Kamienica)"));
    }
}
