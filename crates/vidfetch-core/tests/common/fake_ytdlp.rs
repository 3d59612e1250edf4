//! Shell scripts standing in for yt-dlp.
//!
//! Scripts are run as `/bin/sh <script> <args...>`, so they never need the
//! executable bit and are never exec'd while still open for writing.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vidfetch_core::config::VidfetchConfig;
use vidfetch_core::runner::ProcessRunner;

/// Writes the destination named by `--output`, with `%(title)s` -> `clip`
/// and `%(ext)s` -> `mp4`, and reports progress along the way. Honours
/// `--no-overwrites` the way yt-dlp does: an existing file is reported and
/// left untouched.
pub const SUCCESS: &str = r#"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--output" ]; then out="$a"; fi
  prev="$a"
done
path=$(printf '%s' "$out" | sed -e 's/%(title)s/clip/' -e 's/%(ext)s/mp4/')
if [ -e "$path" ]; then
  echo "[download] $path has already been downloaded"
  exit 0
fi
echo "[download] Destination: $path"
echo "[download]  50.0% of 1.00KiB at 1.00KiB/s ETA 00:01"
mkdir -p "$(dirname "$path")"
printf 'first run' > "$path"
echo "[download] 100.0% of 1.00KiB at 1.00KiB/s ETA 00:00"
"#;

pub const FAILURE: &str = r#"
echo "[youtube] abc: Downloading webpage"
echo "ERROR: [youtube] abc: Video unavailable" >&2
exit 1
"#;

/// Reports some progress, then runs until killed.
pub const HANGS: &str = r#"
echo "[download]  23.5% of 10.00MiB at 2.00MiB/s ETA 00:05"
exec sleep 30
"#;

/// Takes a moment so several jobs overlap.
pub const SLOW: &str = r#"
echo "[download]  10.0% of 1.00MiB at 1.00MiB/s ETA 00:01"
sleep 0.4
echo "[download] 100.0% of 1.00MiB at 1.00MiB/s ETA 00:00"
"#;

pub struct FakeYtDlp {
    dir: TempDir,
    script: PathBuf,
}

impl FakeYtDlp {
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, body).unwrap();
        Self { dir, script }
    }

    /// Scratch directory the script lives in; also used as the output dir.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::with_binary("/bin/sh").leading_args([self.script_arg()])
    }

    pub fn script_arg(&self) -> String {
        self.script.to_string_lossy().into_owned()
    }

    /// Config with `workers` workers writing into the scratch directory.
    pub fn config(&self, workers: usize) -> VidfetchConfig {
        VidfetchConfig {
            max_concurrent: workers,
            output_dir: self.dir().join("downloads"),
            ..Default::default()
        }
    }
}
