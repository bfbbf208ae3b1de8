use conversion_service::config::ConversionConfig;
use conversion_service::startup::Application;
use reqwest::multipart;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for soffice: parses the same arguments and writes a file with
/// the right magic bytes into --outdir.
pub const FAKE_ENGINE: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --convert-to) target="$2"; shift 2 ;;
    --outdir) outdir="$2"; shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
ext="${target%%:*}"
name=$(basename "$input")
stem="${name%.*}"
case "$ext" in
  pdf) printf '%%PDF-1.4\n%% converted\n' > "$outdir/$stem.pdf" ;;
  *) { printf 'PK\003\004'; cat "$input"; } > "$outdir/$stem.$ext" ;;
esac
"#;

/// Like FAKE_ENGINE, but stalls on inputs named `slow-*`.
pub const SELECTIVE_SLOW_ENGINE: &str = r#"
for arg in "$@"; do
  case "$arg" in
    */slow-*) sleep 4 ;;
  esac
done
while [ $# -gt 0 ]; do
  case "$1" in
    --convert-to) target="$2"; shift 2 ;;
    --outdir) outdir="$2"; shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
ext="${target%%:*}"
name=$(basename "$input")
stem="${name%.*}"
printf '%%PDF-1.4\n' > "$outdir/$stem.$ext"
"#;

/// Holds every job long enough to back up the queue.
pub const STALLED_ENGINE: &str = "sleep 5\nexit 1\n";

pub const FAILING_ENGINE: &str = "echo 'engine crashed' >&2\nexit 81\n";

pub const DOCX_BYTES: &[u8] = &[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00];
pub const DOC_BYTES: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Font /F1 >> endobj\nBT (Hello) Tj ET\n";

pub struct TestOptions {
    pub engine: &'static str,
    pub workers_enabled: bool,
    pub worker_count: usize,
    pub queue_size: usize,
    pub task_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            engine: FAKE_ENGINE,
            workers_enabled: true,
            worker_count: 2,
            queue_size: 64,
            task_ttl_secs: 3600,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub client: reqwest::Client,
    // Dropped last: removes the scratch tree.
    _root: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let engine = write_engine(root.path(), options.engine);
        let upload_dir = root.path().join("uploads");

        let mut config = ConversionConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        config.storage.upload_dir = upload_dir.clone();
        config.storage.max_upload_bytes = options.max_upload_bytes;
        config.converter.soffice_path = engine.display().to_string();
        config.converter.timeout_secs = 10;
        config.worker.enabled = options.workers_enabled;
        config.worker.worker_count = options.worker_count;
        config.worker.queue_size = options.queue_size;
        config.worker.task_ttl_secs = options.task_ttl_secs;
        config.worker.sweep_interval_secs = 1;

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            upload_dir,
            client,
            _root: root,
        }
    }

    pub async fn upload(&self, path: &str, filename: &str, data: &[u8]) -> reqwest::Response {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(data.to_vec())
                .file_name(filename.to_string())
                .mime_str("application/octet-stream")
                .unwrap(),
        );

        self.client
            .post(format!("{}{}", self.address, path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Entries left in the scratch directory.
    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn write_engine(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-soffice");
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write engine");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod engine");
    path
}
