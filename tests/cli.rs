use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

/// A pnpm project laid out in a temp dir, with packages in its virtual store.
struct TestProject {
    dir: TempDir,
    binary_path: PathBuf,
}

impl TestProject {
    fn new(manifest: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("package.json"), manifest).unwrap();
        std::fs::write(
            dir.path().join("pnpm-lock.yaml"),
            "lockfileVersion: 5.4\npackages: {}\n",
        )
        .unwrap();
        Self {
            dir,
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_pnpm-cdx")),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the lockfile and one store manifest per `(name, version, license)`.
    fn with_packages(self, packages: &[(&str, &str, &str)]) -> Self {
        let mut lock = String::from("lockfileVersion: 5.4\npackages:\n");
        for (name, version, license) in packages {
            lock.push_str(&format!(
                "  /{}/{}:\n    resolution: {{integrity: sha1-...}}\n",
                name, version
            ));
            let store = format!("{}@{}", name.replace('/', "+"), version);
            let pkg_dir = self
                .path()
                .join("node_modules/.pnpm")
                .join(store)
                .join("node_modules")
                .join(name);
            std::fs::create_dir_all(&pkg_dir).unwrap();
            std::fs::write(
                pkg_dir.join("package.json"),
                json!({ "name": name, "version": version, "license": license }).to_string(),
            )
            .unwrap();
        }
        std::fs::write(self.path().join("pnpm-lock.yaml"), lock).unwrap();
        self
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(&self.binary_path)
            .args(args)
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("HOME", self.path())
            .output()
            .expect("Failed to run pnpm-cdx")
    }

    fn log(&self) -> String {
        std::fs::read_to_string(self.path().join("pnpm-cdx.log")).unwrap_or_default()
    }
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_gitlab_report_for_single_dependency() {
    let project = TestProject::new(r#"{"license":"MIT"}"#).with_packages(&[("left-pad", "1.3.0", "MIT")]);

    let output = project.run(&["gitlab"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({
            "pnpm-cdx-meta-format": "gitlab-license-report-2.1",
            "version": "2.1",
            "licenses": [
                {"id": "MIT", "name": "MIT License", "url": "https://spdx.org/licenses/MIT.html"}
            ],
            "dependencies": [
                {
                    "name": "left-pad",
                    "version": "1.3.0",
                    "package_manager": "pnpm",
                    "path": "package.json",
                    "licenses": ["MIT"]
                }
            ]
        })
    );
}

#[test]
fn test_bad_dependency_is_skipped_with_warning() {
    let project = TestProject::new(r#"{"license":"MIT"}"#).with_packages(&[
        ("left-pad", "1.3.0", "MIT"),
        ("broken", "0.0.1", "see LICENSE.txt"),
        ("@types/node", "18.11.9", "MIT"),
    ]);

    let output = project.run(&["gitlab", "."]);
    assert!(output.status.success());

    let report = stdout_json(&output);
    let deps = report["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 2);
    assert_eq!(deps[0]["name"], "@types/node");
    assert_eq!(deps[1]["name"], "left-pad");

    let log = project.log();
    assert_eq!(log.matches("No license information for /broken/0.0.1").count(), 1);
}

#[test]
fn test_dependency_without_license_is_reported_unlicensed() {
    let project = TestProject::new(r#"{"license":"MIT"}"#).with_packages(&[
        ("left-pad", "1.3.0", "MIT"),
        ("private-helper", "1.0.0", "MIT"),
        ("unicode-data", "2.0.0", "Unicode-DFS-2016"),
    ]);
    std::fs::write(
        project
            .path()
            .join("node_modules/.pnpm/private-helper@1.0.0/node_modules/private-helper/package.json"),
        r#"{"name":"private-helper","version":"1.0.0"}"#,
    )
    .unwrap();

    let output = project.run(&["gitlab"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = stdout_json(&output);
    let ids: Vec<_> = report["licenses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["MIT", "UNLICENSED", "Unicode-DFS-2016"]);
    assert_eq!(report["dependencies"][1]["name"], "private-helper");
    assert_eq!(report["dependencies"][1]["licenses"], json!(["UNLICENSED"]));
}

#[test]
fn test_output_file_and_manifest_path() {
    let project = TestProject::new("{}").with_packages(&[("ms", "2.1.3", "MIT OR Apache-2.0")]);
    let out = project.path().join("report.json");

    let output = project.run(&["gitlab", "package.json", "-o", out.to_str().unwrap(), "-q"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let ids: Vec<_> = report["licenses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["Apache-2.0", "MIT"]);
    assert_eq!(report["dependencies"][0]["licenses"], json!(["MIT", "Apache-2.0"]));
}

#[test]
fn test_unknown_license_id_fails() {
    let project =
        TestProject::new("{}").with_packages(&[("custom", "1.0.0", "(MPL-2.0 AND MY-LICENSE)")]);

    let output = project.run(&["gitlab"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown license id 'MY-LICENSE'"));
}

#[test]
fn test_missing_lockfile_fails() {
    let project = TestProject::new("{}");
    std::fs::remove_file(project.path().join("pnpm-lock.yaml")).unwrap();

    let output = project.run(&["gitlab"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pnpm-lock.yaml"));
}

#[test]
fn test_cyclonedx_is_not_supported() {
    let project = TestProject::new("{}");
    let output = project.run(&["cyclonedx"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported report format"));
}

#[test]
fn test_info_prints_record() {
    let project = TestProject::new("{}");
    let output = project.run(&["info", "Apache-2.0"]);
    assert!(output.status.success());
    let record = stdout_json(&output);
    assert_eq!(record["licenseId"], "Apache-2.0");
    assert_eq!(record["name"], "Apache License 2.0");

    let output = project.run(&["info", "MY-LICENSE"]);
    assert!(!output.status.success());
}

#[test]
fn test_license_data_directory() {
    let project = TestProject::new("{}").with_packages(&[("internal", "1.0.0", "LicenseRef-Acme")]);
    let data = project.path().join("licenses");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(
        data.join("LicenseRef-Acme.json"),
        r#"{"licenseId":"LicenseRef-Acme","name":"Acme Corp License","crossRef":[{"url":"https://acme.example/license"}]}"#,
    )
    .unwrap();

    let output = project.run(&["gitlab", "--license-data", data.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output)["licenses"],
        json!([{"id": "LicenseRef-Acme", "name": "Acme Corp License", "url": "https://acme.example/license"}])
    );
}
