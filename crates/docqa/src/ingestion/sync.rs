//! Upload folder synchronization
//!
//! Files can land in the upload directory without going through the upload
//! endpoint (copied in, FTP, ...). A sync compares the directory listing with
//! the processed-file ledger and ingests whatever is new or has changed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::LEDGER_FILENAME;
use crate::error::Result;
use crate::tracking::{FileStat, ProcessedLedger};
use crate::types::{
    FailedFile, FileType, PendingFileEntry, ProcessedFileEntry, SyncResponse, SyncStatusResponse,
};

use super::pipeline::IngestPipeline;

/// Error recorded for files that load to zero documents
pub const NO_DOCUMENTS_ERROR: &str = "No documents extracted";

/// Reconciles the upload directory with the ledger
pub struct FolderSync {
    upload_dir: PathBuf,
    pipeline: Arc<IngestPipeline>,
    ledger: Arc<ProcessedLedger>,
}

impl FolderSync {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        pipeline: Arc<IngestPipeline>,
        ledger: Arc<ProcessedLedger>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            pipeline,
            ledger,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ingest every supported file whose size or mtime differs from the ledger
    pub async fn run(&self) -> Result<SyncResponse> {
        let start = Instant::now();
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let entries = self.ledger.load().await;
        let files = self.scan().await?;

        let mut pending = Vec::new();
        let mut already_processed = 0;
        for path in &files {
            let stat = ProcessedLedger::file_info(path).await?;
            if ProcessedLedger::is_processed(path, &stat, &entries) {
                already_processed += 1;
            } else {
                pending.push(path.clone());
            }
        }

        tracing::info!(
            "Sync: {} files in {}, {} pending",
            files.len(),
            self.upload_dir.display(),
            pending.len()
        );

        let mut processed_files = Vec::new();
        let mut failed_files = Vec::new();
        for path in &pending {
            let name = file_name(path);
            match self.ingest_and_record(path).await {
                Ok(()) => processed_files.push(name),
                Err(error) => {
                    tracing::warn!("Sync failed for {}: {}", name, error);
                    failed_files.push(FailedFile { file: name, error });
                }
            }
        }

        let response = SyncResponse {
            status: "success".to_string(),
            total_files_in_folder: files.len(),
            new_files_processed: processed_files.len(),
            already_processed,
            failed: failed_files.len(),
            processed_files,
            failed_files,
            processing_time: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Sync complete: {} new, {} unchanged, {} failed in {:.2}s",
            response.new_files_processed,
            response.already_processed,
            response.failed,
            response.processing_time
        );
        Ok(response)
    }

    /// List processed and pending files without ingesting anything
    pub async fn status(&self) -> Result<SyncStatusResponse> {
        let entries = self.ledger.load().await;
        let files = self.scan().await?;

        let mut processed_files = Vec::new();
        let mut pending_files = Vec::new();
        for path in &files {
            let stat = ProcessedLedger::file_info(path).await?;
            let filename = file_name(path);
            if ProcessedLedger::is_processed(path, &stat, &entries) {
                let processed_at = entries
                    .get(&crate::tracking::ledger_key(path))
                    .map(|info| info.processed_at.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                processed_files.push(ProcessedFileEntry {
                    filename,
                    size: stat.size,
                    modified: stat.modified,
                    processed_at,
                });
            } else {
                pending_files.push(PendingFileEntry {
                    filename,
                    size: stat.size,
                    modified: stat.modified,
                });
            }
        }

        Ok(SyncStatusResponse {
            total_files: files.len(),
            processed_count: processed_files.len(),
            pending_count: pending_files.len(),
            processed_files,
            pending_files,
        })
    }

    /// Background ingestion of freshly uploaded files. Only successes are recorded.
    pub async fn ingest_uploaded(&self, paths: &[PathBuf]) {
        let start = Instant::now();
        let mut ok = 0;
        for (path, result) in self.pipeline.ingest_files(paths).await {
            match result {
                Ok(outcome) if outcome.documents > 0 => {
                    if let Err(e) = self.record(&path).await {
                        tracing::error!("Failed to record {}: {}", path.display(), e);
                        continue;
                    }
                    ok += 1;
                }
                Ok(_) => {
                    tracing::error!("Failed to process {}: {}", path.display(), NO_DOCUMENTS_ERROR)
                }
                // Logged by the pipeline
                Err(_) => {}
            }
        }
        tracing::info!(
            "Processed {}/{} uploaded files in {:?}",
            ok,
            paths.len(),
            start.elapsed()
        );
    }

    /// Ingest one file and record it. The error is the message reported to clients.
    async fn ingest_and_record(&self, path: &Path) -> std::result::Result<(), String> {
        let outcome = self
            .pipeline
            .ingest_file(path)
            .await
            .map_err(|e| e.to_string())?;
        if outcome.documents == 0 {
            return Err(NO_DOCUMENTS_ERROR.to_string());
        }

        self.record(path).await.map_err(|e| e.to_string())
    }

    /// Stat after ingestion so the record matches what is on disk now
    async fn record(&self, path: &Path) -> Result<()> {
        let stat: FileStat = ProcessedLedger::file_info(path).await?;
        self.ledger.record(path, stat).await;
        Ok(())
    }

    /// Supported files directly inside the upload directory, sorted by name
    async fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.upload_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if entry.file_name() == LEDGER_FILENAME {
                continue;
            }
            if FileType::from_path(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::DocumentSplitter;
    use crate::providers::mock::MockEmbedder;
    use crate::storage::MemoryVectorStore;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn folder_sync(dir: &Path) -> FolderSync {
        let pipeline = IngestPipeline::new(
            DocumentSplitter::new(200, 20).unwrap(),
            Arc::new(MockEmbedder::new(16)),
            Arc::new(MemoryVectorStore::new()),
        );
        FolderSync::new(
            dir,
            Arc::new(pipeline),
            Arc::new(ProcessedLedger::new(dir.join(LEDGER_FILENAME))),
        )
    }

    #[tokio::test]
    async fn test_sync_counts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("b.md"), "# Beta\n\nbody").unwrap();
        std::fs::write(dir.path().join("empty.csv"), "name,age\n").unwrap();
        std::fs::write(dir.path().join("skip.png"), [1u8]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "nested").unwrap();

        let sync = folder_sync(dir.path());
        let first = sync.run().await.unwrap();

        assert_eq!(first.status, "success");
        assert_eq!(first.total_files_in_folder, 3);
        assert_eq!(first.new_files_processed, 2);
        assert_eq!(first.already_processed, 0);
        assert_eq!(first.failed, 1);
        assert_eq!(first.processed_files, vec!["a.txt", "b.md"]);
        assert_eq!(first.failed_files[0].file, "empty.csv");
        assert_eq!(first.failed_files[0].error, NO_DOCUMENTS_ERROR);

        let second = sync.run().await.unwrap();
        assert_eq!(second.new_files_processed, 0);
        assert_eq!(second.already_processed, 2);
        assert_eq!(second.failed, 1);
    }

    #[tokio::test]
    async fn test_changed_file_is_resynced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "first").unwrap();

        let sync = folder_sync(dir.path());
        sync.run().await.unwrap();

        std::fs::write(&path, "first, but longer").unwrap();
        let later = SystemTime::now() + Duration::from_secs(10);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let result = sync.run().await.unwrap();
        assert_eq!(result.new_files_processed, 1);
        assert_eq!(result.already_processed, 0);
    }

    #[tokio::test]
    async fn test_status_lists_pending_then_processed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();

        let sync = folder_sync(dir.path());
        let before = sync.status().await.unwrap();
        assert_eq!(before.total_files, 1);
        assert_eq!(before.pending_count, 1);
        assert_eq!(before.pending_files[0].filename, "a.txt");
        assert_eq!(before.pending_files[0].size, 5);

        sync.run().await.unwrap();

        let after = sync.status().await.unwrap();
        assert_eq!(after.processed_count, 1);
        assert_eq!(after.pending_count, 0);
        assert!(!after.processed_files[0].processed_at.is_empty());
    }

    #[tokio::test]
    async fn test_missing_upload_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("uploads");

        let result = folder_sync(&uploads).run().await.unwrap();
        assert_eq!(result.total_files_in_folder, 0);
        assert!(uploads.is_dir());
    }

    #[tokio::test]
    async fn test_ingest_uploaded_records_only_successes() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, "hello").unwrap();
        std::fs::write(&bad, "not json").unwrap();

        let sync = folder_sync(dir.path());
        sync.ingest_uploaded(&[good.clone(), bad.clone()]).await;

        let status = sync.status().await.unwrap();
        assert_eq!(status.processed_count, 1);
        assert_eq!(status.processed_files[0].filename, "good.txt");
        assert_eq!(status.pending_files[0].filename, "bad.json");
    }
}
