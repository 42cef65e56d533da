// file: src/provision/firstrun.rs
// version: 1.0.0
// guid: 33db5052-4b02-4330-aeff-53245f3f009c

//! Hooking the provisioning script into the image's own `firstrun.sh`

/// Statement the invocation is placed in front of
const EXIT_STATEMENT: &str = "exit 0";

/// Where the device sees its boot partition, newest layout first
const BOOT_MOUNTS: [&str; 2] = ["/boot/firmware", "/boot"];

/// Path the device uses to run `script_name` from its boot partition.
///
/// Bookworm mounts the boot partition at `/boot/firmware`; a `firstrun.sh`
/// that refers to that location gets the matching path.
pub fn invocation_path(firstrun: &str, script_name: &str) -> String {
    let mount = BOOT_MOUNTS
        .iter()
        .find(|mount| firstrun.contains(&format!("{}/", mount)))
        .unwrap_or(&"/boot");
    format!("{}/{}", mount, script_name)
}

/// Outcome of splicing the invocation into `firstrun.sh`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced {
    pub content: String,
    /// False when no `exit 0` was found and the call was appended instead
    pub before_exit: bool,
}

/// Insert a call to `invocation` in place of the first `exit 0`
pub fn splice_invocation(firstrun: &str, invocation: &str) -> Spliced {
    if firstrun.contains(EXIT_STATEMENT) {
        let replacement = format!("\n{}\n{}", invocation, EXIT_STATEMENT);
        return Spliced {
            content: firstrun.replacen(EXIT_STATEMENT, &replacement, 1),
            before_exit: true,
        };
    }

    let mut content = firstrun.to_string();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(invocation);
    content.push('\n');
    Spliced {
        content,
        before_exit: false,
    }
}
