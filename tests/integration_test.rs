// file: tests/integration_test.rs
// version: 2.0.1
// guid: c9d0e1f2-a3b4-4567-8890-3456789abcde

//! Integration tests for Pi Prepper

use mockito::{Matcher, Mock, Server, ServerGuard};
use pi_prepper::{
    cli::prompt::Console,
    config::ConfigLoader,
    disk::{DeviceDescriptor, DiskBackend},
    image::ImageAcquirer,
    network::NetworkDownloader,
    preparer::{Endpoints, PrepareOptions, Preparer},
    PrepperError, Result,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const FIRSTRUN: &str = "#!/bin/bash\nset +e\nrm -f /boot/firstrun.sh\nexit 0\n";
const TEMPLATE: &str = include_str!("../firstboot_template.sh");

/// Disk backend that records calls and mounts a plain directory
struct RecordingDisks {
    devices: Vec<DeviceDescriptor>,
    boot: PathBuf,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisks {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DiskBackend for RecordingDisks {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn required_commands(&self) -> Vec<&'static str> {
        vec![]
    }

    async fn list_removable_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        self.record("list".to_string());
        Ok(self.devices.clone())
    }

    async fn unmount_disk(&self, device: &str) -> Result<()> {
        self.record(format!("unmount_disk {}", device));
        Ok(())
    }

    async fn write_image(&self, image: &Path, device: &str) -> Result<()> {
        let name = image.file_name().unwrap().to_string_lossy().to_string();
        self.record(format!("write {} {}", name, device));
        Ok(())
    }

    async fn mount_boot_partition(&self, device: &str) -> Result<PathBuf> {
        self.record(format!("mount {}", device));
        Ok(self.boot.clone())
    }

    async fn unmount_partition(&self, _mount_point: &Path) -> Result<()> {
        self.record("unmount_partition".to_string());
        Ok(())
    }

    async fn set_indexing(&self, _mount_point: &Path, enabled: bool) -> Result<()> {
        self.record(format!("indexing {}", enabled));
        Ok(())
    }
}

struct Harness {
    server: ServerGuard,
    work: TempDir,
    boot: TempDir,
    calls: Arc<Mutex<Vec<String>>>,
    devices: Vec<DeviceDescriptor>,
    // Mocks are removed from the server when dropped
    mocks: Vec<Mock>,
}

impl Harness {
    async fn new() -> Self {
        let work = TempDir::new().unwrap();
        let boot = TempDir::new().unwrap();

        std::fs::write(
            work.path().join(".env"),
            "TAILNET_NAME=example.com\nOAUTH_CLIENT_ID=id\nOAUTH_CLIENT_SECRET=secret\n\
             PI_USER=pi\nPI_PASSWORD=raspberry\nWIFI_NETWORKS=\"home,secret1 office,secret2\"\n",
        )
        .unwrap();
        std::fs::write(work.path().join("firstboot_template.sh"), TEMPLATE).unwrap();
        // A decompressed image already present means no download and no xz.
        std::fs::write(work.path().join("raspios-lite.img"), b"image").unwrap();
        std::fs::write(boot.path().join("firstrun.sh"), FIRSTRUN).unwrap();

        Self {
            server: Server::new_async().await,
            work,
            boot,
            calls: Arc::new(Mutex::new(Vec::new())),
            devices: vec![
                DeviceDescriptor::new(
                    "/dev/disk4",
                    vec![
                        "Device Node: /dev/disk4".to_string(),
                        "Removable Media: Removable".to_string(),
                    ],
                ),
                DeviceDescriptor::new("/dev/disk5", vec!["Disk Size: 64.0 GB".to_string()]),
            ],
            mocks: Vec::new(),
        }
    }

    async fn mock_latest(&mut self) -> Mock {
        let image_url = format!("{}/images/raspios-lite.img.xz", self.server.url());
        let image = self
            .server
            .mock("GET", "/images/raspios-lite.img.xz")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;
        self.mocks.push(image);
        self.server
            .mock("GET", "/latest")
            .with_status(302)
            .with_header("location", &image_url)
            .create_async()
            .await
    }

    async fn mock_auth(&mut self, hits: usize) -> (Mock, Mock) {
        let token = self
            .server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::UrlEncoded("client_id".into(), "id".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"bearer-1"}"#)
            .expect(hits)
            .create_async()
            .await;
        let keys = self
            .server
            .mock("POST", "/tailnet/example.com/keys")
            .match_header("authorization", "Bearer bearer-1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "capabilities": {"devices": {"create": {"tags": ["tag:MyPis"]}}},
                "description": "Created for MyPis"
            })))
            .with_status(200)
            .with_body(r#"{"id":"k1","key":"tskey-auth-k1"}"#)
            .expect(hits)
            .create_async()
            .await;
        (token, keys)
    }

    fn preparer(&self, input: &str) -> Preparer<Cursor<String>, Vec<u8>> {
        let options = PrepareOptions {
            env_file: self.work.path().join(".env"),
            template: self.work.path().join("firstboot_template.sh"),
            work_dir: self.work.path().to_path_buf(),
            endpoints: Endpoints {
                latest_image_url: format!("{}/latest", self.server.url()),
                api_base_url: self.server.url(),
            },
            show_progress: false,
        };
        let backend = RecordingDisks {
            devices: self.devices.clone(),
            boot: self.boot.path().to_path_buf(),
            calls: Arc::clone(&self.calls),
        };

        Preparer::new(
            options,
            Box::new(backend),
            Console::new(Cursor::new(input.to_string()), Vec::new()),
        )
        .with_loader(ConfigLoader::isolated())
        .with_required_commands(vec![])
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn staged_script(&self) -> String {
        std::fs::read_to_string(self.boot.path().join("firstboot.sh")).unwrap()
    }
}

fn output_of(preparer: &Preparer<Cursor<String>, Vec<u8>>) -> String {
    String::from_utf8_lossy(preparer.console().output()).to_string()
}

#[tokio::test]
async fn test_full_run_flashes_and_stages_script() {
    let mut harness = Harness::new().await;
    let latest = harness.mock_latest().await;
    let (token, keys) = harness.mock_auth(1).await;

    let mut preparer = harness.preparer("pi-one\n1\nno\ny\n");
    let summary = preparer.run().await.unwrap();

    latest.assert_async().await;
    token.assert_async().await;
    keys.assert_async().await;

    assert_eq!(summary.hostname, "pi-one");
    assert_eq!(summary.device, "/dev/disk4");
    assert!(summary.flashed);
    assert_eq!(summary.image, harness.work.path().join("raspios-lite.img"));
    assert_eq!(summary.script, harness.boot.path().join("firstboot.sh"));

    assert_eq!(
        harness.calls(),
        vec![
            "list",
            "unmount_disk /dev/disk4",
            "write raspios-lite.img /dev/disk4",
            "mount /dev/disk4",
            "indexing false",
            "indexing true",
            "unmount_partition",
        ]
    );

    let output = output_of(&preparer);
    assert!(output.contains("Enter the hostname: "));
    assert!(output.contains("Choose your device:"));
    assert!(output.contains("1) /dev/disk4\nDevice Node: /dev/disk4\nRemovable Media: Removable\n"));
    assert!(output.contains("2) /dev/disk5\nDisk Size: 64.0 GB\n"));
    assert!(output.contains("Are you sure you want to flash to /dev/disk4?"));

    let firstrun = std::fs::read_to_string(harness.boot.path().join("firstrun.sh")).unwrap();
    assert_eq!(
        firstrun,
        "#!/bin/bash\nset +e\nrm -f /boot/firstrun.sh\n\n/boot/firstboot.sh\nexit 0\n"
    );
    assert!(!harness.work.path().join("firstboot.sh").exists());
}

#[tokio::test]
async fn test_script_carries_settings_and_wifi_in_order() {
    let mut harness = Harness::new().await;
    let _latest = harness.mock_latest().await;
    let _auth = harness.mock_auth(1).await;

    harness.preparer("pi-one\n2\nno\nyes\n").run().await.unwrap();

    let script = harness.staged_script();
    assert!(script.contains("NEW_HOSTNAME=\"pi-one\""));
    assert!(script.contains("PI_USER=\"pi\""));
    assert!(script.contains("PI_PASSWORD=\"raspberry\""));
    assert!(script.contains("tailscale up --authkey=\"tskey-auth-k1\""));
    assert!(!script.contains("{{"));

    let home = script.find("add_wifi \"home\" \"secret1\"").unwrap();
    let office = script.find("add_wifi \"office\" \"secret2\"").unwrap();
    assert!(home < office);
}

#[tokio::test]
async fn test_declined_confirmation_cancels_without_writes() {
    let mut harness = Harness::new().await;
    let _latest = harness.mock_latest().await;
    let (token, keys) = harness.mock_auth(0).await;

    for answer in ["n", "Y", ""] {
        let mut preparer = harness.preparer(&format!("pi-one\n1\nno\n{}\n", answer));
        let err = preparer.run().await.unwrap_err();

        assert!(err.is_cancellation(), "{:?} should cancel", answer);
        assert_eq!(err.exit_code(), 0);
        assert_eq!(err.to_string(), "SD card flashing cancelled.");
    }

    token.assert_async().await;
    keys.assert_async().await;
    assert!(harness.calls().iter().all(|call| call == "list"));
    assert!(!harness.boot.path().join("firstboot.sh").exists());
}

#[tokio::test]
async fn test_skip_flash_still_provisions() {
    let mut harness = Harness::new().await;
    let _latest = harness.mock_latest().await;
    let _auth = harness.mock_auth(1).await;

    let summary = harness.preparer("pi-two\n1\nYES\n").run().await.unwrap();

    assert!(!summary.flashed);
    let calls = harness.calls();
    assert!(!calls.iter().any(|call| call.starts_with("write") || call.starts_with("unmount_disk")));
    assert!(calls.contains(&"mount /dev/disk4".to_string()));
    assert!(harness.staged_script().contains("NEW_HOSTNAME=\"pi-two\""));
}

#[tokio::test]
async fn test_empty_hostname_is_rejected_before_any_work() {
    let mut harness = Harness::new().await;
    let latest = harness
        .server
        .mock("GET", "/latest")
        .expect(0)
        .create_async()
        .await;

    let err = harness.preparer("   \n").run().await.unwrap_err();

    assert!(matches!(err, PrepperError::ValidationError(_)));
    assert_eq!(err.to_string(), "Validation error: Hostname cannot be empty");
    latest.assert_async().await;
    assert!(harness.calls().is_empty());
}

#[tokio::test]
async fn test_bad_selection_is_rejected_without_writes() {
    let mut harness = Harness::new().await;
    let _latest = harness.mock_latest().await;
    let (_token, keys) = harness.mock_auth(0).await;

    for selection in ["0", "3", "-1", "disk4"] {
        let err = harness
            .preparer(&format!("pi-one\n{}\nno\ny\n", selection))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, PrepperError::InvalidSelection(_)), "{:?}", selection);
    }

    keys.assert_async().await;
    assert!(harness.calls().iter().all(|call| call == "list"));
}

#[tokio::test]
async fn test_no_removable_devices_is_an_error() {
    let mut harness = Harness::new().await;
    harness.devices.clear();
    let _latest = harness.mock_latest().await;

    let err = harness.preparer("pi-one\n1\n").run().await.unwrap_err();

    assert!(matches!(err, PrepperError::DeviceError(_)));
    assert!(err.to_string().contains("no removable devices found"));
}

#[tokio::test]
async fn test_missing_settings_file_fails() {
    let harness = Harness::new().await;
    std::fs::remove_file(harness.work.path().join(".env")).unwrap();

    let err = harness.preparer("pi-one\n").run().await.unwrap_err();

    assert!(matches!(err, PrepperError::ConfigError(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_missing_required_command_is_reported() {
    let harness = Harness::new().await;

    let err = harness
        .preparer("pi-one\n")
        .with_required_commands(vec!["definitely-not-a-real-command-xyz".to_string()])
        .run()
        .await
        .unwrap_err();

    match err {
        PrepperError::MissingCommands(missing) => {
            assert_eq!(missing, vec!["definitely-not-a-real-command-xyz"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(harness.calls().is_empty());
}

#[tokio::test]
async fn test_auth_failure_aborts_before_mounting() {
    let mut harness = Harness::new().await;
    let _latest = harness.mock_latest().await;
    let _token = harness
        .server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"message":"invalid client"}"#)
        .create_async()
        .await;

    let err = harness.preparer("pi-one\n1\nyes\n").run().await.unwrap_err();

    assert!(matches!(err, PrepperError::AuthError(_)));
    assert!(!harness.calls().iter().any(|call| call.starts_with("mount")));
}

#[tokio::test]
async fn test_uncompressed_image_is_downloaded_into_work_dir() {
    let mut server = Server::new_async().await;
    let work = TempDir::new().unwrap();
    let image_url = format!("{}/images/raspios-lite.img", server.url());

    let image = server
        .mock("GET", "/images/raspios-lite.img")
        .with_status(200)
        .with_body("IMAGEDATA")
        .expect(2)
        .create_async()
        .await;
    let _latest = server
        .mock("GET", "/latest")
        .with_status(302)
        .with_header("location", &image_url)
        .create_async()
        .await;

    let acquirer = ImageAcquirer::with_source(
        NetworkDownloader::new().without_progress_bar(),
        format!("{}/latest", server.url()),
        work.path(),
    );
    let path = acquirer.acquire().await.unwrap();

    assert_eq!(path, work.path().join("raspios-lite.img"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "IMAGEDATA");
    assert!(!work.path().join("raspios-lite.img.part").exists());
    image.assert_async().await;
}
