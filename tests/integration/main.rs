//! Integration tests for Flatter

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn flatter() -> Command {
        let mut cmd = cargo_bin_cmd!("flatter");
        cmd.env_remove("FLATTER_CONFIG")
            .env_remove("INPUT_MANIFESTS")
            .env_remove("GITHUB_STATE")
            .env_remove("GITHUB_OUTPUT");
        cmd
    }

    #[test]
    fn help_displays() {
        flatter()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Flatpak"));
    }

    #[test]
    fn version_displays() {
        flatter()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("flatter"));
    }

    #[test]
    fn key_of_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("org.example.App.json");
        fs::write(&manifest, "").unwrap();

        flatter()
            .arg("key")
            .arg(&manifest)
            .args(["--arch", "aarch64"])
            .assert()
            .success()
            .stdout(predicate::eq(
                "flatter-aarch64-e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n",
            ));
    }

    #[test]
    fn key_changes_with_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("org.example.App.yml");
        fs::write(&manifest, "app-id: org.example.App\n").unwrap();

        let first = flatter().arg("key").arg(&manifest).output().unwrap();
        fs::write(&manifest, "app-id: org.example.Apq\n").unwrap();
        let second = flatter().arg("key").arg(&manifest).output().unwrap();

        assert!(first.status.success());
        assert_ne!(first.stdout, second.stdout);
    }

    #[test]
    fn key_rejects_toml() {
        flatter()
            .args(["key", "org.example.App.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported manifest format"))
            .stderr(predicate::str::contains(".json, .yaml or .yml"));
    }

    #[test]
    fn main_requires_manifests() {
        flatter()
            .arg("main")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Input required and not supplied: manifests"));
    }

    #[test]
    fn config_show_from_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("flatter.toml");
        fs::write(&config, "manifests = [\"app.yml\"]\narch = \"aarch64\"\n").unwrap();

        flatter()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("arch = \"aarch64\""))
            .stdout(predicate::str::contains("cache-key = \"flatter\""));
    }

    #[test]
    fn config_path_from_env() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("flatter.toml");
        fs::write(&config, "manifests = [\"app.yml\"]\n").unwrap();

        flatter()
            .env("FLATTER_CONFIG", &config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("flatter.toml"));
    }

    #[test]
    fn missing_config_file() {
        flatter()
            .args(["--config", "/nonexistent/flatter.toml", "config"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }
}
