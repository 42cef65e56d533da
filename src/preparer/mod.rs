// file: src/preparer/mod.rs
// version: 1.0.0
// guid: 0d7c2b1e-6a3f-4f59-8e41-b95c2a7f3d60

//! End-to-end preparation of one SD card
//!
//! Runs the steps strictly in order: settings, template, required commands,
//! hostname, image, device, optional flash, join key, first-boot script.
//! The first failing step ends the run; nothing is rolled back.

use crate::cli::prompt::Console;
use crate::config::{validate_hostname, ConfigLoader};
use crate::disk::{format_device_menu, parse_selection, DiskBackend};
use crate::error::PrepperError;
use crate::image::{ImageAcquirer, LATEST_IMAGE_URL};
use crate::logging::with_step_span;
use crate::network::{AuthKeyIssuer, NetworkDownloader};
use crate::network::auth::API_BASE_URL;
use crate::provision::{BootScriptInstaller, ScriptTemplate, ScriptValues, DEFAULT_TEMPLATE};
use crate::utils::system::{SystemUtils, BASE_REQUIRED_COMMANDS};
use crate::Result;
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

pub const HOSTNAME_PROMPT: &str = "Enter the hostname: ";
pub const SELECTION_PROMPT: &str = "Enter the number of your choice: ";
pub const SKIP_FLASH_PROMPT: &str = "Do you want to skip flashing the SD card? (yes/no): ";
pub const CANCELLED_MESSAGE: &str = "SD card flashing cancelled.";

/// Remote endpoints used during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub latest_image_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            latest_image_url: LATEST_IMAGE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

/// Where a run reads its inputs and keeps its files
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub env_file: PathBuf,
    pub template: PathBuf,
    pub work_dir: PathBuf,
    pub endpoints: Endpoints,
    pub show_progress: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            work_dir: PathBuf::from("."),
            endpoints: Endpoints::default(),
            show_progress: true,
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub hostname: String,
    pub device: String,
    pub image: PathBuf,
    pub flashed: bool,
    /// The script's location on the boot partition
    pub script: PathBuf,
}

fn confirm_prompt(device: &str) -> String {
    format!(
        "Are you sure you want to flash to {}? This will erase all data on the device. (y/n): ",
        device
    )
}

/// Only an explicit, exact yes allows the destructive write
pub fn is_confirmed(answer: &str) -> bool {
    matches!(answer, "y" | "yes")
}

/// Skipping needs the full word, in any case
pub fn wants_skip(answer: &str) -> bool {
    answer.to_lowercase() == "yes"
}

/// Drives one interactive preparation
pub struct Preparer<R, W> {
    options: PrepareOptions,
    backend: Box<dyn DiskBackend>,
    console: Console<R, W>,
    loader: ConfigLoader,
    required_commands: Option<Vec<String>>,
}

impl<R: BufRead, W: Write> Preparer<R, W> {
    pub fn new(options: PrepareOptions, backend: Box<dyn DiskBackend>, console: Console<R, W>) -> Self {
        Self {
            options,
            backend,
            console,
            loader: ConfigLoader::new(),
            required_commands: None,
        }
    }

    /// Use another settings loader (e.g. one that ignores the process environment)
    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the list of commands checked before the run
    pub fn with_required_commands(mut self, commands: Vec<String>) -> Self {
        self.required_commands = Some(commands);
        self
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    /// Commands that must be on `PATH` for this backend
    pub fn required_commands(&self) -> Vec<String> {
        match &self.required_commands {
            Some(commands) => commands.clone(),
            None => BASE_REQUIRED_COMMANDS
                .iter()
                .chain(self.backend.required_commands().iter())
                .map(|cmd| cmd.to_string())
                .collect(),
        }
    }

    pub async fn run(&mut self) -> Result<PrepareSummary> {
        let config = self.loader.load(&self.options.env_file)?;
        let wifi_networks = config.wifi_credentials()?;
        debug!("Loaded settings: {:?}", config);

        let template = ScriptTemplate::load(&self.options.template).await?;

        let required = self.required_commands();
        SystemUtils::check_prerequisites(required.iter().map(String::as_str))?;

        let hostname = validate_hostname(&self.console.ask(HOSTNAME_PROMPT)?)?;

        let acquirer = self.acquirer();
        let image = with_step_span("acquire", || acquirer.acquire()).await?;

        let device = self.select_device().await?;

        let skip = wants_skip(&self.console.ask(SKIP_FLASH_PROMPT)?);
        if skip {
            info!("Skipping flash of {}", device);
        } else {
            self.flash(&image, &device).await?;
        }

        let issuer = AuthKeyIssuer::with_api_base(&self.options.endpoints.api_base_url);
        let join_key = with_step_span("auth", || {
            issuer.issue_key(
                &config.oauth_client_id,
                &config.oauth_client_secret,
                &config.tailnet_name,
            )
        })
        .await?;

        let script = template.render(&ScriptValues {
            auth_key: join_key.secret(),
            pi_user: config.pi_user.clone(),
            pi_password: config.pi_password.clone(),
            hostname: hostname.clone(),
            wifi_networks,
        })?;

        let installer = BootScriptInstaller::new(self.backend.as_ref(), &self.options.work_dir);
        let staged = with_step_span("provision", || installer.install(&device, &script)).await?;

        info!("{} is ready for {}", device, hostname);
        Ok(PrepareSummary {
            hostname,
            device,
            image,
            flashed: !skip,
            script: staged,
        })
    }

    fn acquirer(&self) -> ImageAcquirer {
        let mut downloader = NetworkDownloader::new();
        if !self.options.show_progress {
            downloader = downloader.without_progress_bar();
        }
        ImageAcquirer::with_source(
            downloader,
            &self.options.endpoints.latest_image_url,
            &self.options.work_dir,
        )
    }

    async fn select_device(&mut self) -> Result<String> {
        let mut devices = self.backend.list_removable_devices().await?;
        if devices.is_empty() {
            return Err(PrepperError::device("no removable devices found"));
        }
        debug!("{} backend found {} removable device(s)", self.backend.name(), devices.len());

        self.console.say("Choose your device:".bold())?;
        for line in format_device_menu(&devices) {
            self.console.say(line)?;
        }

        let index = parse_selection(&self.console.ask(SELECTION_PROMPT)?, devices.len())?;
        Ok(devices.swap_remove(index).path)
    }

    async fn flash(&mut self, image: &std::path::Path, device: &str) -> Result<()> {
        let answer = self.console.ask(&confirm_prompt(device))?;
        if !is_confirmed(&answer) {
            return Err(PrepperError::Cancelled(CANCELLED_MESSAGE.to_string()));
        }

        self.console.say("Flashing the SD card...".yellow())?;
        self.backend.unmount_disk(device).await?;
        self.backend.write_image(image, device).await?;
        info!("Wrote {} to {}", image.display(), device);
        Ok(())
    }
}
