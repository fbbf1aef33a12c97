//! Commands behind the `catsync` binary.
//!
//! Each command wires the library crates together for one job and returns
//! what it produced, so the binary stays a thin argument parser.

use anyhow::{Context, Result};
use catsync_storage::{ExportTable, JsonSnapshotStore, SnapshotStore};
use catsync_sync::{
    BindingGrouping, CatalogClient, CatalogConfig, ChangeKind, ChangeSet, ChangeSetBuilder,
    ColumnPresenter, EntityConfig, SourceSettings, SyncEngine, SyncMode, SyncReport,
    TripleStoreClient, TripleStoreConfig, TripleStoreSource, WithdrawalPolicy, export_snapshot,
};
use catsync_variants::FallbackChains;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where snapshots and exports live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Dirs {
    /// Export file of a namespace: `<export-dir>/anilist-<namespace>.tsv`.
    #[must_use]
    pub fn export_path(&self, namespace: &str) -> PathBuf {
        self.export_dir.join(format!("anilist-{namespace}.tsv"))
    }

    fn store(&self) -> Result<JsonSnapshotStore> {
        JsonSnapshotStore::open(&self.data_dir)
            .with_context(|| format!("cannot open data directory {}", self.data_dir.display()))
    }
}

/// Arguments of one catalog update.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub entity: String,
    pub mode: SyncMode,
    pub page_offset: u32,
    /// Wall-clock limit on paging; `None` runs to completion.
    pub budget: Option<Duration>,
    pub catalog: CatalogConfig,
}

fn preset(entity: &str) -> Result<EntityConfig> {
    EntityConfig::preset(entity).with_context(|| {
        format!(
            "unknown entity type {entity:?}, expected one of {}",
            EntityConfig::PRESETS.join(", ")
        )
    })
}

/// Syncs one catalog entity type, then refreshes its export.
///
/// A degraded run is returned as a report, not an error. Export failures
/// are logged only: the snapshot has been persisted by then.
pub async fn update(
    dirs: &Dirs,
    options: &UpdateOptions,
    settings: SourceSettings,
) -> Result<SyncReport> {
    let entity = preset(&options.entity)?;
    let store = Arc::new(dirs.store()?);
    let client = CatalogClient::new(options.catalog.clone(), settings, &entity)?;
    let engine = SyncEngine::new(
        entity,
        Arc::new(client),
        store,
        Arc::new(FallbackChains::chinese()),
    );

    let report = match options.budget {
        Some(budget) => {
            engine
                .run_with_budget(options.mode, options.page_offset, budget)
                .await?
        }
        None => engine.run(options.mode, options.page_offset).await?,
    };
    log_report(&report);

    if report.is_done() {
        if let Err(e) = export(dirs, &options.entity) {
            warn!("Export of {} failed: {:#}", options.entity, e);
        }
    }
    Ok(report)
}

/// Merges Chinese titles from the triple store into the `wikidata`
/// snapshot.
pub async fn wikidata(dirs: &Dirs, config: TripleStoreConfig) -> Result<SyncReport> {
    let entity = EntityConfig::wikidata();
    let client = TripleStoreClient::new(config)?;
    let source = TripleStoreSource::new(
        entity.namespace.clone(),
        client,
        entity.query.clone(),
        BindingGrouping::default(),
    );
    let engine = SyncEngine::new(
        entity,
        Arc::new(source),
        Arc::new(dirs.store()?),
        Arc::new(FallbackChains::chinese()),
    );

    let report = engine.run(SyncMode::Full, 0).await?;
    log_report(&report);
    Ok(report)
}

/// Renders the stored snapshot of `entity` to its export file.
pub fn export(dirs: &Dirs, entity: &str) -> Result<PathBuf> {
    let presenter = ColumnPresenter::for_namespace(entity)
        .with_context(|| format!("no export layout for {entity}"))?;
    let snapshot = dirs.store()?.load(entity)?;
    let table = export_snapshot(&snapshot, &presenter)?;

    std::fs::create_dir_all(&dirs.export_dir)
        .with_context(|| format!("cannot create {}", dirs.export_dir.display()))?;
    let path = dirs.export_path(entity);
    table.write_file(&path)?;
    info!("Exported {} rows of {} to {}", table.len(), entity, path.display());
    Ok(path)
}

/// Diffs a fresh export against a downstream mirror and writes the
/// changeset to `output`.
pub fn changeset(
    export: &Path,
    mirror: &Path,
    output: &Path,
    id_column: &str,
) -> Result<ChangeSet> {
    let new = ExportTable::read_file(export, id_column)
        .with_context(|| format!("cannot read export {}", export.display()))?;
    let old = ExportTable::read_file(mirror, id_column)
        .with_context(|| format!("cannot read mirror {}", mirror.display()))?;

    let changes = ChangeSetBuilder::new(WithdrawalPolicy::default()).build(&new, &old)?;
    changes.to_table()?.write_file(output)?;

    info!(
        "Changeset {}: {} added, {} modified, {} withdrawn",
        output.display(),
        changes.ids(ChangeKind::Added).count(),
        changes.ids(ChangeKind::Modified).count(),
        changes.ids(ChangeKind::Withdrawn).count()
    );
    Ok(changes)
}

fn log_report(report: &SyncReport) {
    if report.is_done() {
        info!(
            "{} ({}): {} pages, {} added, {} updated, {} unchanged, {} kept, {} records",
            report.namespace,
            report.mode,
            report.pages,
            report.stats.added,
            report.stats.updated,
            report.stats.unchanged,
            report.stats.kept_prior,
            report.records
        );
    } else {
        warn!("{}: {:?}", report.namespace, report.outcome);
    }

    let hard = report.hard_warnings().count();
    if hard > 0 {
        warn!("{}: {} desynchronized records kept at their prior version", report.namespace, hard);
    }
    match serde_json::to_string(report) {
        Ok(json) => debug!("Report: {}", json),
        Err(e) => debug!("Report not serializable: {}", e),
    }
}
