use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model to request from OpenRouter (overrides RECIPE_MODEL)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Path of the JSON recipe store (overrides RECIPE_STORE_PATH)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a draft recipe from ingredients
    Generate {
        /// Ingredient to use; repeat for several
        #[arg(short, long = "ingredient", required = true)]
        ingredients: Vec<String>,

        /// Dietary restriction; repeat for several
        #[arg(short, long = "diet")]
        dietary_restrictions: Vec<String>,

        #[arg(short, long)]
        cuisine: Option<String>,

        /// Print text as it arrives, followed by the final JSON frame
        #[arg(long)]
        stream: bool,
    },
    /// Save a draft read from a JSON file
    Save {
        #[arg(short, long)]
        file: PathBuf,
    },
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: String,
    },
    /// Preview a revision of a stored recipe
    Chat {
        id: String,
        message: String,

        /// Also write the modified recipe to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Apply an accepted revision from a JSON file and notify viewers
    Apply {
        id: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    Rate {
        id: String,
        rating: u8,
    },
    Delete {
        id: String,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
