//! Définition et implémentation des commandes CLI
//!
//! - `import-buildings` : bâtiments BDOT10K → PostGIS
//! - `import-points` : points adresse PRG → PostGIS, vérification de gmina,
//!   bâtiment le plus proche et index d'adresses par secteur
//! - `search` : recherche textuelle dans l'index d'adresses

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bytes::BytesMut;
use clap::{Args, Subcommand};
use rayon::prelude::*;
use sektor::bdot10k::{derive_building, BuildingRecord, Dictionaries};
use sektor::containment::{group_by_region, resolve_province, select_mut};
use sektor::prg::{normalize_record, AddressRecord};
use sektor::{
    AddressPoint, ContainmentStats, CoordTransform, MatchStats, NearestBuildingMatcher, PhraseIndex,
    RegionIndex, SearchParams, SectorGrid, SuperpermTable,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::export::pool::DatabaseConfig;
use crate::export::postgres::{self, CopyChunk};
use crate::export::transaction::ProvinceImport;
use crate::geocoder::NominatimGeocoder;
use crate::input::{self, Records};
use crate::report::{ImportError, ImportReport};
use crate::reproject_lite::SmartReprojector;

/// Options de connexion PostgreSQL
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / geocoder)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl DatabaseArgs {
    /// Configuration issue de l'environnement, surchargée par les options
    pub fn to_config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::from_env();
        apply_database_overrides(&mut config, self.clone());
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import BDOT10K buildings (NDJSON) into PostGIS
    ImportBuildings {
        /// NDJSON file or directory of `*.ndjson` files
        #[arg(short, long)]
        path: PathBuf,

        /// Directory holding category.csv, carto_name.csv, condition.csv, function.csv
        #[arg(long)]
        dictionaries: PathBuf,

        /// Target PostgreSQL schema
        #[arg(long, default_value = "geocoder")]
        schema: String,

        /// Settings JSON file (défaut : preset poland)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Drop schema before import
        #[arg(long)]
        drop_schema: bool,

        /// Skip index creation at the end of the import
        #[arg(long)]
        skip_indexes: bool,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Import PRG address points (one NDJSON file per province) and match them to buildings
    ImportPoints {
        /// `PRG_*.ndjson` file or directory
        #[arg(short, long)]
        path: PathBuf,

        /// GeoJSON of administrative units (EPSG:4326, JPT_KOD_JE / JPT_NAZWA_)
        #[arg(long)]
        regions: PathBuf,

        /// Target PostgreSQL schema
        #[arg(long, default_value = "geocoder")]
        schema: String,

        /// Settings JSON file (défaut : preset poland)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Search address points by free text
    Search {
        /// Query, e.g. "Kraków, Floriańska 1"
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Start latitude (défaut : settings start_lat)
        #[arg(long)]
        lat: Option<f64>,

        /// Start longitude (défaut : settings start_lon)
        #[arg(long)]
        lon: Option<f64>,

        #[arg(long, default_value = "geocoder")]
        schema: String,

        /// Settings JSON file (défaut : preset poland)
        #[arg(long)]
        settings: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArgs,
    },
}

/// Exécute la commande import-buildings
#[allow(clippy::too_many_arguments)]
pub async fn cmd_import_buildings(
    path: &Path,
    dictionaries: &Path,
    schema: &str,
    settings_path: Option<&Path>,
    drop_schema: bool,
    skip_indexes: bool,
    report_path: Option<&Path>,
    db: &DatabaseArgs,
) -> Result<()> {
    let started_at = Instant::now();
    let settings = Settings::resolve(settings_path)?;
    let grid = settings.grid()?;

    // Entrées obligatoires : échec avant toute connexion
    let files = input::collect_inputs(path, "*.ndjson", Some(input::BDOT10K_URL))?;
    let dicts = Arc::new(input::load_dictionaries(dictionaries)?);
    let reprojector = SmartReprojector::new(settings.planar_epsg)?;

    info!(
        path = %path.display(),
        files = files.len(),
        schema = schema,
        "Starting building import"
    );

    println!("=== Import buildings ===");
    println!("Path: {}", path.display());
    println!("Files: {}", files.len());
    println!("Schema: {}", schema);
    println!("Reprojection: EPSG:{} ({})", settings.planar_epsg, reprojector.description());
    println!("Grid: {} × {} sectors", grid.size(), grid.size());
    println!("Coordinate precision: {} decimals", settings.coords_precision);
    println!("Batch size: {} rows", settings.db_save_freq);

    let db_config = db.to_config();
    println!(
        "Database: {}@{}:{}/{} (SSL: {:?})",
        db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
    );
    let pool = crate::export::pool::create_pool(&db_config).await?;
    crate::export::pool::test_connection(&pool).await?;
    println!("Connected to PostgreSQL");

    postgres::create_schema(&pool, schema, drop_schema).await?;
    println!("Schema ready");

    let mut report = ImportReport::new("import-buildings");
    let copy_sql = postgres::copy_sql(schema, "buildings", postgres::BUILDING_COLUMNS);

    for file in &files {
        let input_name = input_name(file);
        let checksum = checksum_in_background(file).await;

        if let Some(checksum) = &checksum {
            match postgres::is_input_already_imported(&pool, schema, &input_name, checksum).await {
                Ok(true) => {
                    println!("  {} already imported, skipping", input_name);
                    report.record_input_skipped();
                    continue;
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to check input status: {}", e),
            }
        }

        let file_path = file.clone();
        let Records { records, malformed } = tokio::task::spawn_blocking(move || {
            input::read_ndjson::<BuildingRecord>(&file_path, Some(input::BDOT10K_URL))
        })
        .await
        .context("Reader task failed")??;

        let mut client = pool.get().await.context("Failed to get connection from pool")?;
        let tx = client.transaction().await.context("Failed to begin transaction")?;
        let start_id = postgres::max_id(&tx, schema, "buildings").await?;

        let (chunk_tx, chunk_rx) = mpsc::channel::<CopyChunk>(16);
        let skipped = Arc::new(AtomicUsize::new(0));
        let producer = tokio::task::spawn_blocking({
            let dicts = Arc::clone(&dicts);
            let skipped = Arc::clone(&skipped);
            let planar_epsg = settings.planar_epsg;
            let precision = settings.coords_precision;
            let rows_per_chunk = settings.db_save_freq;
            let input_name = input_name.clone();
            move || {
                produce_building_chunks(
                    &records,
                    start_id,
                    rows_per_chunk,
                    &dicts,
                    &grid,
                    planar_epsg,
                    precision,
                    &input_name,
                    &skipped,
                    &chunk_tx,
                )
            }
        });

        let copied = postgres::copy_chunks(&tx, &copy_sql, postgres::receiver_stream(chunk_rx)).await;
        let produced = producer.await.context("Building task failed")?;

        let result: Result<u64> = match (copied, produced) {
            (Ok(rows), Ok(())) => {
                async {
                    if let Some(checksum) = &checksum {
                        postgres::record_input_checksum(&tx, schema, &input_name, checksum).await?;
                    }
                    tx.commit().await.context("Failed to commit buildings")?;
                    Ok(rows)
                }
                .await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match result {
            Ok(rows) => {
                let skipped = skipped.load(Ordering::Relaxed) + malformed;
                report.record_input_success();
                report.record_buildings(rows as usize, skipped);
                println!("  {}: {} buildings, {} skipped", input_name, rows, skipped);
                info!(input = %input_name, buildings = rows, skipped, "Buildings imported");
            }
            Err(e) => {
                warn!(input = %input_name, error = %e, "Building import failed");
                report.record_input_failure(&input_name, &format!("{:#}", e));
            }
        }
    }

    if !skip_indexes {
        postgres::create_indexes(&pool, schema).await?;
        println!("Indexes created");
    }

    report.set_duration(started_at.elapsed());
    report.finalize();

    println!("\n\n=== Summary ===");
    println!("{}", report.summary());
    println!("Duration: {:.2?}", started_at.elapsed());
    report.display();
    if let Some(path) = report_path {
        report.save_to_file(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Dérive les bâtiments en parallèle et envoie les chunks COPY
///
/// Identifiant = `start_id + rang dans le fichier + 1`. Un reprojector est
/// créé par thread de travail.
#[allow(clippy::too_many_arguments)]
fn produce_building_chunks(
    records: &[(usize, BuildingRecord)],
    start_id: i64,
    rows_per_chunk: usize,
    dicts: &Dictionaries,
    grid: &SectorGrid,
    planar_epsg: u32,
    precision: u32,
    input_name: &str,
    skipped: &AtomicUsize,
    sender: &mpsc::Sender<CopyChunk>,
) -> Result<()> {
    let rows_per_chunk = rows_per_chunk.max(1);
    records
        .par_chunks(rows_per_chunk)
        .enumerate()
        .try_for_each_init(
            || SmartReprojector::new(planar_epsg),
            |reprojector, (chunk_idx, chunk)| -> Result<()> {
                let reprojector = reprojector
                    .as_ref()
                    .map_err(|e| anyhow::anyhow!("Reprojector unavailable: {}", e))?;
                let first_id = start_id + (chunk_idx * rows_per_chunk) as i64 + 1;
                let chunk = building_chunk(
                    chunk, first_id, dicts, grid, reprojector, precision, input_name, skipped,
                )?;
                sender
                    .blocking_send(chunk)
                    .map_err(|_| anyhow::anyhow!("COPY stream closed"))
            },
        )
}

/// Chunk COPY d'une tranche d'enregistrements ; les enregistrements
/// invalides sont comptés dans `skipped`
#[allow(clippy::too_many_arguments)]
fn building_chunk<T: CoordTransform>(
    records: &[(usize, BuildingRecord)],
    first_id: i64,
    dicts: &Dictionaries,
    grid: &SectorGrid,
    transform: &T,
    precision: u32,
    input_name: &str,
    skipped: &AtomicUsize,
) -> Result<CopyChunk> {
    let mut buf = BytesMut::with_capacity(records.len() * 512);
    let mut wkt_buf = Vec::with_capacity(512);
    let mut rows = 0;

    for (offset, (line, record)) in records.iter().enumerate() {
        let id = first_id + offset as i64;
        match derive_building(id, record, dicts, grid, transform, precision) {
            Ok(building) => {
                let start_len = buf.len();
                if let Err(e) = postgres::write_building_row(&mut buf, &building, &mut wkt_buf) {
                    buf.truncate(start_len);
                    warn!(input = %input_name, line, error = %e, "Skipping building");
                    skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                rows += 1;
            }
            Err(e) => {
                warn!(input = %input_name, line, error = %e, "Skipping building");
                skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    Ok(CopyChunk {
        data: buf.freeze(),
        rows,
    })
}

/// Exécute la commande import-points
#[allow(clippy::too_many_arguments)]
pub async fn cmd_import_points(
    path: &Path,
    regions_path: &Path,
    schema: &str,
    settings_path: Option<&Path>,
    report_path: Option<&Path>,
    db: &DatabaseArgs,
) -> Result<()> {
    let started_at = Instant::now();
    let settings = Settings::resolve(settings_path)?;
    let grid = settings.grid()?;

    // Entrées obligatoires : échec avant toute connexion
    let files = input::collect_inputs(path, "PRG_*.ndjson", Some(input::PRG_URL))?;
    let regions = RegionIndex::from_units(input::load_regions(regions_path)?);
    let reprojector = SmartReprojector::new(settings.planar_epsg)?;
    let geocoder = NominatimGeocoder::new(&settings.geocoder)?;
    let matcher = NearestBuildingMatcher::new(grid, settings.match_config());
    let superperms = SuperpermTable::new(settings.superperm_max);

    info!(
        path = %path.display(),
        files = files.len(),
        regions = regions.len(),
        schema = schema,
        "Starting address point import"
    );

    println!("=== Import address points ===");
    println!("Path: {}", path.display());
    println!("Provinces: {}", files.len());
    println!("Administrative units: {}", regions.len());
    println!("Schema: {}", schema);
    println!("Reprojection: EPSG:{} ({})", settings.planar_epsg, reprojector.description());
    println!("Grid: {} × {} sectors", grid.size(), grid.size());
    println!(
        "Matching: max {} m, radius {}, top {}",
        settings.max_dist, settings.sector_radius, settings.top_num
    );
    println!("Geocoder: {} (max {} attempts)", settings.geocoder.url, settings.geocoder.max_attempts);

    let db_config = db.to_config();
    println!(
        "Database: {}@{}:{}/{} (SSL: {:?})",
        db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
    );
    let pool = crate::export::pool::create_pool(&db_config).await?;
    crate::export::pool::test_connection(&pool).await?;
    println!("Connected to PostgreSQL");

    postgres::create_schema(&pool, schema, false).await?;

    let mut report = ImportReport::new("import-points");
    let ctx = PointContext {
        pool: &pool,
        schema,
        settings: &settings,
        regions: &regions,
        reprojector: &reprojector,
        geocoder: &geocoder,
        matcher: &matcher,
        superperms: &superperms,
    };

    for file in &files {
        let input_name = input_name(file);
        let province = sektor::extract_province(file).unwrap_or_else(|| input_name.clone());
        let checksum = checksum_in_background(file).await;

        if let Some(checksum) = &checksum {
            match postgres::is_input_already_imported(&pool, schema, &input_name, checksum).await {
                Ok(true) => {
                    println!("  {} already imported, skipping", province);
                    report.record_input_skipped();
                    continue;
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to check input status: {}", e),
            }
        }

        let file_path = file.clone();
        let records = tokio::task::spawn_blocking(move || {
            input::read_ndjson::<AddressRecord>(&file_path, Some(input::PRG_URL))
        })
        .await
        .context("Reader task failed")??;

        let province_started_at = Instant::now();
        let prepared = match ctx.prepare_province(&province, &input_name, records, &mut report).await {
            Ok(prepared) => prepared,
            Err(e) => {
                let message = format!("{:#}", e);
                warn!(province = %province, error = %message, "Province preparation failed");
                report.record_input_failure(&input_name, &message);
                continue;
            }
        };

        // Transaction limitée à l'écriture : identifiants et index y sont fixés
        let mut client = pool.get().await.context("Failed to get connection from pool")?;
        let mut import = ProvinceImport::begin(&mut client, &province).await?;
        let result = ctx
            .write_province(&mut import, &input_name, prepared, checksum.as_deref())
            .await;

        match result {
            Ok(written) => {
                let outcome = import.commit().await?;
                report.record_points(&province, outcome.points_written as usize, written.dropped);
                report.record_containment(&province, &written.containment);
                report.record_matching(&province, &written.matching);
                report.record_input_success();
                println!(
                    "  {}: {} points, {} sectors ({:.2?})",
                    outcome.province,
                    outcome.points_written,
                    outcome.sectors_written,
                    province_started_at.elapsed()
                );
            }
            Err(e) => {
                let outcome = import.rollback(&format!("{:#}", e)).await;
                report.record_input_failure(&input_name, &outcome.errors.join("; "));
            }
        }
    }

    if !files.is_empty() {
        postgres::create_indexes(&pool, schema).await?;
    }

    report.set_duration(started_at.elapsed());
    report.finalize();

    println!("\n\n=== Summary ===");
    println!("{}", report.summary());
    println!("Duration: {:.2?}", started_at.elapsed());
    report.display();
    if let Some(path) = report_path {
        report.save_to_file(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Ressources partagées par les imports de voïvodies
struct PointContext<'a> {
    pool: &'a deadpool_postgres::Pool,
    schema: &'a str,
    settings: &'a Settings,
    regions: &'a RegionIndex,
    reprojector: &'a SmartReprojector,
    geocoder: &'a NominatimGeocoder,
    matcher: &'a NearestBuildingMatcher,
    superperms: &'a SuperpermTable,
}

/// Voïvodie vérifiée et appariée, en attente d'écriture
///
/// Les identifiants sont provisoires (`rang + 1`) jusqu'à l'ouverture de la
/// transaction d'écriture.
struct PreparedProvince {
    points: Vec<AddressPoint>,
    phrases: PhraseIndex,
    dropped: usize,
    containment: ContainmentStats,
    matching: MatchStats,
}

impl PointContext<'_> {
    /// Normalisation, vérification de gmina et appariement d'une voïvodie
    ///
    /// Aucune transaction n'est ouverte : les appels au géocodeur peuvent
    /// durer longtemps.
    async fn prepare_province(
        &self,
        province: &str,
        input_name: &str,
        records: Records<AddressRecord>,
        report: &mut ImportReport,
    ) -> Result<PreparedProvince> {
        let (mut points, dropped) = normalize_records(
            &records.records,
            0,
            self.reprojector,
            self.settings.coords_precision,
            input_name,
            report,
        );
        let dropped = dropped + records.malformed;
        info!(province = %province, points = points.len(), dropped, "Address points normalized");

        let containment = resolve_province(
            &mut points,
            self.regions,
            self.geocoder,
            self.reprojector,
            self.settings.coords_precision,
        )
        .await;
        info!(
            province = %province,
            inside = containment.inside,
            resolved = containment.resolved,
            invalid = containment.invalid,
            "Containment checked"
        );

        let client = self.pool.get().await.context("Failed to get connection from pool")?;
        let unique = postgres::load_unique_phrases(&**client, self.schema).await?;
        drop(client);
        let mut phrases = PhraseIndex::with_unique(&unique);
        let mut matching = MatchStats::default();

        for ((powiat, gmina), indices) in group_by_region(&points) {
            let sectors = self
                .matcher
                .required_sectors(indices.iter().map(|&i| &points[i]));
            let candidates = postgres::load_candidates(self.pool, self.schema, &sectors).await?;

            let stats = self.matcher.match_points(
                select_mut(&mut points, &indices),
                &candidates,
                self.reprojector,
                &mut phrases,
                self.superperms,
            );
            info!(
                powiat = %powiat,
                gmina = %gmina,
                points = stats.points,
                candidates = candidates.len(),
                assigned = stats.assigned,
                "Municipality matched"
            );
            matching.merge(&stats);
        }

        Ok(PreparedProvince {
            points,
            phrases,
            dropped,
            containment,
            matching,
        })
    }

    /// Écriture d'une voïvodie préparée dans la transaction `import`
    ///
    /// Le décalage des identifiants est lu dans la même transaction que
    /// l'écriture des points et de l'index.
    async fn write_province(
        &self,
        import: &mut ProvinceImport<'_>,
        input_name: &str,
        mut prepared: PreparedProvince,
        checksum: Option<&str>,
    ) -> Result<PreparedProvince> {
        let offset = postgres::max_id(import.transaction(), self.schema, "address_points").await?;
        apply_id_offset(&mut prepared.points, &mut prepared.phrases, offset);

        let copy_sql = postgres::copy_sql(self.schema, "address_points", postgres::POINT_COLUMNS);
        let chunks = postgres::point_chunks(&prepared.points, self.settings.db_save_freq)?;
        let rows = postgres::copy_chunks(import.transaction(), &copy_sql, futures::stream::iter(chunks)).await?;
        import.record_points(rows);

        let blobs = prepared.phrases.take_blobs();
        let sectors = postgres::append_sector_phrases(import.transaction(), self.schema, &blobs).await?;
        import.record_sectors(sectors);
        postgres::save_unique_phrases(import.transaction(), self.schema, prepared.phrases.unique_text()).await?;

        if let Some(checksum) = checksum {
            postgres::record_input_checksum(import.transaction(), self.schema, input_name, checksum).await?;
        }

        Ok(prepared)
    }
}

/// Décale les identifiants provisoires des points et de leurs lignes d'index
pub fn apply_id_offset(points: &mut [AddressPoint], phrases: &mut PhraseIndex, offset: i64) {
    for point in points.iter_mut() {
        point.id += offset;
    }
    phrases.shift_ids(offset);
}

/// Normalise les enregistrements PRG ; identifiant = `start_id + rang + 1`
///
/// Retourne les points retenus et le nombre d'enregistrements écartés.
pub fn normalize_records<T: CoordTransform>(
    records: &[(usize, AddressRecord)],
    start_id: i64,
    transform: &T,
    precision: u32,
    input_name: &str,
    report: &mut ImportReport,
) -> (Vec<AddressPoint>, usize) {
    let mut points = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (idx, (line, record)) in records.iter().enumerate() {
        let id = start_id + idx as i64 + 1;
        match normalize_record(id, record, transform, precision) {
            Ok(Some(point)) => points.push(point),
            Ok(None) => dropped += 1,
            Err(e) => {
                warn!(input = %input_name, line, error = %e, "Skipping address point");
                report.record_error(ImportError::record(
                    input_name,
                    format!("line {}", line),
                    e.to_string(),
                ));
                dropped += 1;
            }
        }
    }

    (points, dropped)
}

/// Exécute la commande search
#[allow(clippy::too_many_arguments)]
pub async fn cmd_search(
    query: &str,
    limit: usize,
    lat: Option<f64>,
    lon: Option<f64>,
    schema: &str,
    settings_path: Option<&Path>,
    db: &DatabaseArgs,
) -> Result<()> {
    let started_at = Instant::now();
    let settings = Settings::resolve(settings_path)?;
    let grid = settings.grid()?;

    let pool = crate::export::pool::create_pool(&db.to_config()).await?;
    let client = pool.get().await.context("Failed to get connection from pool")?;
    let unique = postgres::load_unique_phrases(&**client, schema).await?;
    drop(client);
    let blobs = postgres::load_sector_phrases(&pool, schema).await?;
    let index = PhraseIndex::from_parts(blobs, &unique);

    let start = grid.clamp(grid.sector_code(
        lat.unwrap_or(settings.start_lat),
        lon.unwrap_or(settings.start_lon),
    ));
    let params = SearchParams {
        start,
        max_sectors: settings.max_sectors,
        limit,
    };
    let ids = index.search(&grid, query, &params);
    info!(query = %query, start = %start, results = ids.len(), "Search finished");

    let rows = postgres::fetch_points(&pool, schema, &ids).await?;
    if rows.is_empty() {
        println!("No address found for \"{}\"", query);
    }
    for row in &rows {
        println!("{}", row);
    }
    println!("({} results in {:.2?})", rows.len(), started_at.elapsed());

    Ok(())
}

fn apply_database_overrides(config: &mut DatabaseConfig, args: DatabaseArgs) {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(database) = args.database {
        config.dbname = database;
    }
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ssl) = args.ssl {
        match ssl.parse() {
            Ok(mode) => config.ssl_mode = mode,
            Err(e) => warn!("{}", e),
        }
    }
}

fn input_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Checksum calculé hors du runtime ; `None` si le fichier est illisible
async fn checksum_in_background(path: &Path) -> Option<String> {
    let file = path.to_path_buf();
    match tokio::task::spawn_blocking(move || compute_file_checksum(&file)).await {
        Ok(Ok(cs)) => Some(cs),
        Ok(Err(e)) => {
            warn!("Failed to compute checksum for {}: {}", path.display(), e);
            None
        }
        Err(e) => {
            warn!("Checksum task failed for {}: {}", path.display(), e);
            None
        }
    }
}

fn compute_file_checksum(path: &Path) -> Result<String> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
