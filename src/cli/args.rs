// file: src/cli/args.rs
// version: 2.0.0
// guid: f6a7b8c9-d0e1-4234-8567-0123456789ab

//! Command line argument definitions

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pi-prepper")]
#[command(about = "Flash Raspberry Pi OS to an SD card and join the Pi to a tailnet on first boot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, default_value = ".env", help = "Settings file with tailnet, account and Wi-Fi values")]
    pub env_file: String,

    #[arg(long, default_value = "firstboot_template.sh", help = "First boot script template")]
    pub template: String,

    #[arg(short, long, default_value = ".", help = "Directory for the downloaded image and generated script")]
    pub workdir: String,
}
