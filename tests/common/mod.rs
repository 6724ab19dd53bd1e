//! Shared test support: a stub restic binary driven by files in its
//! directory, standing in for the real CLI at the subprocess seam.

// Not every test binary uses every helper.
#![allow(dead_code)]

use restic_exporter::config::ResticConfig;
use std::fs;
use std::path::PathBuf;

const SCRIPT: &str = r#"#!/bin/sh
dir="$(cd "$(dirname "$0")" && pwd)"
if [ -f "$dir/fail" ]; then
    echo "Fatal: unable to open repository" >&2
    exit 1
fi
if [ -f "$dir/hang" ]; then
    sleep 30
fi
for arg in "$@"; do
    case "$arg" in
        snapshots)
            cat "$dir/snapshots.json"
            exit 0
            ;;
        check)
            exit "$(cat "$dir/check_exit" 2>/dev/null || echo 0)"
            ;;
        locks)
            cat "$dir/locks" 2>/dev/null
            exit 0
            ;;
    esac
done
echo "unknown subcommand" >&2
exit 1
"#;

/// Listing with two well-formed snapshots.
pub const TWO_SNAPSHOTS: &str = r#"[
    {
        "id": "40dc152040ea9a91a4f1bc5bd8c133a73d151150a9ff1d4cb85ddffca7dbb9a2",
        "short_id": "40dc1520",
        "time": "2024-11-07T16:26:17+01:00",
        "hostname": "alpha",
        "tags": ["nightly", "etc"],
        "paths": ["/etc"],
        "summary": {"total_bytes_processed": 3671186}
    },
    {
        "id": "79766175d27d4a7f2a14d3b67e1b5c1e2c9e1c8e8a4b5e8e9f0a1b2c3d4e5f6a",
        "short_id": "79766175",
        "time": "2024-11-08T02:00:00+01:00",
        "hostname": "beta",
        "tags": ["weekly"],
        "paths": ["/home"],
        "summary": {"total_bytes_processed": 1073741824}
    }
]"#;

/// A stub restic binary in a private temp directory.
///
/// Behavior is controlled through files next to the script, so tests can
/// change what "restic" does between refresh cycles.
pub struct FakeRestic {
    dir: PathBuf,
}

impl FakeRestic {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "restic-exporter-test-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create stub dir");

        let script = dir.join("restic");
        fs::write(&script, SCRIPT).expect("write stub script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&script).expect("stub metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script, perms).expect("chmod stub");
        }

        let fake = Self { dir };
        fake.set_snapshots(TWO_SNAPSHOTS);
        fake.set_locks("");
        fake
    }

    pub fn config(&self) -> ResticConfig {
        ResticConfig {
            repository: "/srv/restic-test-repo".to_string(),
            password: "test-password".to_string(),
            binary: self.dir.join("restic").to_string_lossy().into_owned(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            command_timeout_seconds: 5,
        }
    }

    pub fn config_with_timeout(&self, seconds: u64) -> ResticConfig {
        let mut config = self.config();
        config.command_timeout_seconds = seconds;
        config
    }

    pub fn set_snapshots(&self, json: &str) {
        fs::write(self.dir.join("snapshots.json"), json).expect("write snapshots fixture");
    }

    pub fn set_locks(&self, lines: &str) {
        fs::write(self.dir.join("locks"), lines).expect("write locks fixture");
    }

    pub fn set_check_exit(&self, code: u32) {
        fs::write(self.dir.join("check_exit"), code.to_string()).expect("write check exit");
    }

    pub fn set_failing(&self, failing: bool) {
        let flag = self.dir.join("fail");
        if failing {
            fs::write(&flag, "").expect("write fail flag");
        } else {
            let _ = fs::remove_file(&flag);
        }
    }

    pub fn set_hanging(&self, hanging: bool) {
        let flag = self.dir.join("hang");
        if hanging {
            fs::write(&flag, "").expect("write hang flag");
        } else {
            let _ = fs::remove_file(&flag);
        }
    }
}

impl Drop for FakeRestic {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}
