// file: src/provision/mod.rs
// version: 1.0.0
// guid: 09ac4b30-fe16-44f4-8085-6d333a0a65d6

//! First-boot provisioning
//!
//! Renders the provisioning script and wires it into the boot partition so
//! the Pi runs it once on its first boot.

pub mod firstrun;
pub mod installer;
pub mod template;

pub use installer::{BootScriptInstaller, FIRSTRUN_NAME, SCRIPT_NAME};
pub use template::{ScriptTemplate, ScriptValues};

/// Template read when no other path is given
pub const DEFAULT_TEMPLATE: &str = "firstboot_template.sh";
