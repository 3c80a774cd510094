use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated HOME, Go roots and a fake go tool for end-to-end runs.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
    pub home: PathBuf,
    pub tool: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let home = root.join("home");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(root.join("goroot/src")).expect("create goroot");
        fs::create_dir_all(root.join("gopath/src")).expect("create gopath");

        Self {
            _tmp: tmp,
            tool: root.join("fake-go"),
            root,
            home,
        }
    }

    /// Makes the fake tool answer `list` with `body` (a /bin/sh snippet).
    #[cfg(unix)]
    pub fn list_script(&self, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\nif [ \"$1\" != list ]; then exit 1; fi\n{body}\n"
        );
        fs::write(&self.tool, script).expect("write fake tool");
        fs::set_permissions(&self.tool, fs::Permissions::from_mode(0o755))
            .expect("chmod fake tool");
    }

    /// Writes `files` into a new package directory `name` under the env.
    pub fn package(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join("pkgs").join(name);
        fs::create_dir_all(&dir).expect("create package dir");
        for (file, content) in files {
            fs::write(dir.join(file), content).expect("write source file");
        }
        dir
    }

    pub fn gopath_package(&self, import_path: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join("gopath/src").join(import_path);
        fs::create_dir_all(&dir).expect("create gopath package");
        for (file, content) in files {
            fs::write(dir.join(file), content).expect("write source file");
        }
        dir
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("tagcount");
        cmd.env("HOME", &self.home)
            .env("GOROOT", self.root.join("goroot"))
            .env("GOPATH", self.root.join("gopath"))
            .env_remove("RUST_LOG")
            .current_dir(&self.root)
            .arg("--go")
            .arg(&self.tool);
        cmd
    }
}
