//! Integration tests for depvault

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn depvault() -> Command {
    let mut cmd = cargo_bin_cmd!("depvault");
    cmd.env_remove("DEPVAULT_CONFIG").env("CI", "1");
    cmd
}

mod cli_tests {
    use super::*;

    #[test]
    fn help_displays() {
        depvault()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency vault"));
    }

    #[test]
    fn version_displays() {
        depvault()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depvault"));
    }

    #[test]
    fn config_path_honours_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        depvault()
            .args(["--no-local", "--config"])
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();

        depvault()
            .args(["--no-local", "--config"])
            .arg(temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[dependencies]"))
            .stdout(predicate::str::contains("shared = false"));
    }

    #[test]
    fn config_set_then_show() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        depvault()
            .args(["--no-local", "--config"])
            .arg(&path)
            .args(["config", "set", "dependencies.shared", "true"])
            .assert()
            .success();

        depvault()
            .args(["--no-local", "--config"])
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shared = true"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let temp = TempDir::new().unwrap();

        depvault()
            .args(["--no-local", "--config"])
            .arg(temp.path().join("config.toml"))
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn completions_generate() {
        depvault()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("depvault"));
    }
}

mod shared_builds {
    use super::*;

    /// Index, project and config for a run of the CLI
    struct Fixture {
        _temp: TempDir,
        index: PathBuf,
        shared: PathBuf,
        project: PathBuf,
        config: PathBuf,
    }

    impl Fixture {
        fn new(shared: bool) -> Self {
            let temp = TempDir::new().unwrap();
            let index = temp.path().join("index");
            let shared_root = temp.path().join("shared");
            let project = temp.path().join("app");
            let config = temp.path().join("config.toml");

            write_crate(&index, "hello", "1.0.1", &["hello.ads", "hello.adb"]);
            write_crate(&index, "libhello", "1.0.0", &["libhello.ads"]);

            fs::create_dir_all(&project).unwrap();
            fs::write(
                project.join("depvault.toml"),
                r#"
[package]
name = "app"
version = "0.1.0"

[configuration.values.hello]
greeting_count = 2
"#,
            )
            .unwrap();
            fs::write(
                project.join("depvault.lock"),
                r#"
[[dependency]]
name = "hello"
version = "1.0.1"
origin = "filesystem"

[[dependency]]
name = "libhello"
version = "1.0.0"
origin = "filesystem"
"#,
            )
            .unwrap();

            fs::write(
                &config,
                format!(
                    "[dependencies]\nshared = {}\ndir = {:?}\nindex = {:?}\n",
                    shared,
                    shared_root.display().to_string(),
                    index.display().to_string()
                ),
            )
            .unwrap();

            Self {
                _temp: temp,
                index,
                shared: shared_root,
                project,
                config,
            }
        }

        fn cmd(&self) -> Command {
            let mut cmd = depvault();
            cmd.arg("--no-local").arg("--config").arg(&self.config);
            cmd
        }

        fn sync(&self) {
            self.cmd()
                .arg("sync")
                .arg("--project")
                .arg(&self.project)
                .assert()
                .success();
        }

        fn build_entries(&self, builds: &Path, prefix: &str) -> Vec<PathBuf> {
            fs::read_dir(builds)
                .unwrap()
                .map(|e| e.unwrap().path())
                .filter(|p| {
                    p.file_name()
                        .unwrap()
                        .to_string_lossy()
                        .starts_with(prefix)
                })
                .collect()
        }
    }

    fn write_crate(index: &Path, name: &str, version: &str, sources: &[&str]) {
        let dir = index.join(name).join(version);
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(
            dir.join("depvault.toml"),
            format!("[package]\nname = \"{}\"\nversion = \"{}\"\n", name, version),
        )
        .unwrap();
        for source in sources {
            fs::write(dir.join("src").join(source), "--  source\n").unwrap();
        }
    }

    #[test]
    fn sync_populates_shared_vault_and_builds() {
        let fx = Fixture::new(true);

        fx.sync();

        for entry in ["hello_1.0.1_filesystem", "libhello_1.0.0_filesystem"] {
            let path = fx.shared.join("vault").join(entry);
            assert!(path.join("depvault.toml").is_file(), "{} manifest", entry);
            assert!(path.join("depvault").join("complete_copy").is_file(), "{} marker", entry);
            assert!(fs::read_dir(path.join("src")).unwrap().count() > 0);
        }

        let builds = fx.shared.join("builds");
        let hello_builds = fx.build_entries(&builds, "hello_1.0.1_filesystem_");
        assert_eq!(hello_builds.len(), 1);
        let hello = &hello_builds[0];
        let hash = hello
            .file_name()
            .unwrap()
            .to_string_lossy()
            .trim_start_matches("hello_1.0.1_filesystem_")
            .to_string();
        assert_eq!(hash.len(), 64);
        assert!(hello.join("depvault.toml").is_file());
        assert!(hello.join("src").join("hello.adb").is_file());
        assert!(hello.join("depvault").join("complete_copy").is_file());

        let config_dir = hello.join("config");
        assert_eq!(fs::read_dir(&config_dir).unwrap().count(), 3);
        let ads = fs::read_to_string(config_dir.join("hello_config.ads")).unwrap();
        assert!(ads.contains("Greeting_Count : constant := 2;"));

        assert!(!fx.project.join("depvault").join("cache").exists());
        assert!(fx.index.join("hello").join("1.0.1").is_dir());
    }

    #[test]
    fn second_sync_reuses_entries() {
        let fx = Fixture::new(true);
        fx.sync();

        let marker = fx
            .shared
            .join("vault")
            .join("hello_1.0.1_filesystem")
            .join("depvault")
            .join("complete_copy");
        let first = fs::read_to_string(&marker).unwrap();

        // Removing the source proves the second run does not fetch again
        fs::remove_dir_all(&fx.index).unwrap();
        fx.sync();

        assert_eq!(fs::read_to_string(&marker).unwrap(), first);
        let builds = fx.shared.join("builds");
        assert_eq!(fx.build_entries(&builds, "hello_1.0.1_filesystem_").len(), 1);
    }

    #[test]
    fn local_mode_uses_project_cache() {
        let fx = Fixture::new(false);
        fx.sync();

        let cache = fx.project.join("depvault").join("cache");
        assert!(cache.join("vault").join("hello_1.0.1_filesystem").is_dir());
        assert_eq!(
            fx.build_entries(&cache.join("builds"), "libhello_1.0.0_filesystem_").len(),
            1
        );
        assert!(!fx.shared.exists());
    }

    #[test]
    fn build_dir_prints_distinct_paths_per_profile() {
        let fx = Fixture::new(true);

        let run = |profile: &str| {
            let output = fx
                .cmd()
                .args(["build-dir", "hello", "1.0.1", "--profile", profile])
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        };

        let dev = run("development");
        let release = run("release");

        assert_ne!(dev, release);
        assert!(Path::new(&dev).join("config").is_dir());
        assert!(Path::new(&release).join("config").is_dir());
        assert_eq!(run("release"), release);
    }

    #[test]
    fn fetch_unknown_dependency_fails() {
        let fx = Fixture::new(true);

        fx.cmd()
            .args(["fetch", "nothere", "0.1.0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to fetch"))
            .stderr(predicate::str::contains("Hint:"));

        let vault = fx.shared.join("vault");
        let entries: Vec<_> = fs::read_dir(&vault)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
                    .collect()
            })
            .unwrap_or_default();
        assert!(entries.is_empty());
    }

    #[test]
    fn cache_list_json_reports_entries() {
        let fx = Fixture::new(true);
        fx.sync();

        fx.cmd()
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"tier\": \"vault\""))
            .stdout(predicate::str::contains("hello_1.0.1_filesystem"))
            .stdout(predicate::str::contains("\"state\": \"complete\""));
    }

    #[test]
    fn stray_project_cache_is_reported_and_cleaned() {
        let fx = Fixture::new(true);
        let stray = fx.project.join("depvault").join("cache");
        fs::create_dir_all(stray.join("vault")).unwrap();

        fx.cmd()
            .arg("sync")
            .arg("--project")
            .arg(&fx.project)
            .assert()
            .success()
            .stdout(predicate::str::contains("Unused project-local cache"));

        fx.cmd()
            .args(["cache", "clean", "--legacy", "--yes", "--project"])
            .arg(&fx.project)
            .assert()
            .success();

        assert!(!stray.exists());
    }
}
