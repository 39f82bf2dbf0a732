use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    about = "Manage per-scene background variations stored in scene files",
    version
)]
pub struct Cli {
    /// Directory background paths are resolved against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub data_root: PathBuf,

    /// JSON settings file (identifiers, global element types, ...)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Act as a player instead of the GM
    #[arg(long)]
    pub player: bool,

    /// Answer every confirmation prompt with yes
    #[arg(long, short = 'y')]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the variations of a scene as JSON
    Show(SceneArgs),
    /// Rewrite legacy variation data in the current schema
    Migrate(SceneArgs),
    /// Add variations found next to the Default background
    Scan(SceneArgs),
    /// Make a variation active and swap elements accordingly
    Switch(SwitchArgs),
    /// Copy captured elements between variations
    Copy(CopyArgs),
    /// Drop the captured elements of a variation
    Reset(IndexArgs),
    /// Delete a variation
    Delete(IndexArgs),
}

#[derive(Args, Debug)]
pub struct SceneArgs {
    /// Scene JSON file
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Index of the variation to activate (0 is Default)
    #[arg(value_name = "INDEX")]
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    #[arg(value_name = "INDEX")]
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Source variation index
    #[arg(long)]
    pub from: usize,

    /// Target variation index
    #[arg(long)]
    pub to: usize,

    /// Comma separated element types to copy (walls, lights, ...)
    #[arg(long, value_name = "LIST", default_value = "lights,sounds,tiles,walls,regions,notes")]
    pub types: String,

    /// Empty every type that is not copied on the target
    #[arg(long)]
    pub reset_unselected: bool,
}
