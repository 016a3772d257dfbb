//! Ensemble CLI - inspect packages and try actor assignments.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ensemble_core::fragment::Fragment;
use ensemble_core::transform::Coordinate;
use ensemble_registry::prelude::*;

mod fragments;

/// Ensemble - content registry for multi-actor scenes
#[derive(Parser)]
#[command(name = "ensemble")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Registry configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the packages and scenes found at a path
    Inspect {
        /// Package file or directory of packages
        path: PathBuf,
    },

    /// Assign actors to the roles of a scene
    Assign {
        /// Package file or directory of packages
        path: PathBuf,

        /// Scene id
        scene: String,

        /// Actors as `[race:]m|f|h[+sub][+unc]` or raw fragment bits
        #[arg(required = true)]
        fragments: Vec<String>,

        /// Never relax female actors to male
        #[arg(long)]
        no_fallback: bool,
    },

    /// Print the longest or shortest route from a stage
    Path {
        /// Package file or directory of packages
        path: PathBuf,

        /// Scene id
        scene: String,

        /// Stage id, the start stage when omitted
        #[arg(short, long)]
        stage: Option<String>,

        /// Follow the shortest route instead of the longest
        #[arg(long)]
        shortest: bool,
    },

    /// Print placement instructions for a stage as JSON
    Plan {
        /// Package file or directory of packages
        path: PathBuf,

        /// Scene id
        scene: String,

        /// Stage id, the start stage when omitted
        stage: Option<String>,

        /// Center coordinate as `x,y,z,rotation`
        #[arg(long, default_value = "0,0,0,0")]
        at: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => RegistryConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RegistryConfig::default(),
    };

    match cli.command {
        Commands::Inspect { path } => inspect(&open(config, &path)?),
        Commands::Assign {
            path,
            scene,
            fragments,
            no_fallback,
        } => {
            let library = open(config, &path)?;
            assign_cmd(&library, &scene, &fragments, !no_fallback)
        }
        Commands::Path {
            path,
            scene,
            stage,
            shortest,
        } => {
            let library = open(config, &path)?;
            path_cmd(&library, &scene, stage.as_deref(), shortest)
        }
        Commands::Plan {
            path,
            scene,
            stage,
            at,
        } => {
            let library = open(config, &path)?;
            plan_cmd(&library, &scene, stage.as_deref(), &at)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn open(config: RegistryConfig, path: &Path) -> Result<Library> {
    let mut library = Library::new(config);
    if path.is_dir() {
        let summary = library
            .load_directory(path)
            .with_context(|| format!("scanning {}", path.display()))?;
        for (file, err) in &summary.failed {
            eprintln!("skipped {}: {err}", file.display());
        }
    } else {
        library
            .load_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    debug!(
        path = %path.display(),
        packages = library.packages().len(),
        scenes = library.scene_count(),
        "library ready"
    );
    Ok(library)
}

fn find_scene<'a>(library: &'a Library, id: &str) -> Result<&'a Scene> {
    match library.scene(id) {
        Some(scene) => Ok(scene.as_ref()),
        None => bail!("no scene with id {id:?}"),
    }
}

fn find_stage<'a>(scene: &'a Scene, key: Option<&str>) -> Result<&'a Stage> {
    let key = key.unwrap_or("");
    scene
        .stage_by_key(key)
        .with_context(|| format!("scene {} has no stage {key:?}", scene.id()))
}

fn inspect(library: &Library) -> Result<()> {
    for package in library.packages() {
        println!(
            "{} by {} [{}] ({} scenes)",
            package.name(),
            package.author(),
            package.fingerprint().to_hex(),
            package.scenes().len()
        );
        for scene in package.scenes() {
            let roles: Vec<String> = scene
                .slots()
                .iter()
                .map(|slot| format!("{}:{:?}", slot.race.name(), slot.sex))
                .collect();
            println!(
                "  {} {:?} stages={} roles=[{}]{}",
                scene.id(),
                scene.name(),
                scene.stages().len(),
                roles.join(", "),
                if scene.uses_furniture() { " furniture" } else { "" }
            );
        }
    }
    Ok(())
}

fn assign_cmd(library: &Library, id: &str, args: &[String], fallback: bool) -> Result<()> {
    let scene = find_scene(library, id)?;
    let actors = args
        .iter()
        .map(|arg| Ok((arg.as_str(), fragments::parse(arg)?)))
        .collect::<Result<Vec<(&str, Fragment)>>>()?;

    let Some(found) = scene.assign_actors(&actors, fallback) else {
        bail!("no assignment of {} actor(s) fits scene {id}", actors.len());
    };
    for line in role_lines(&found, &actors) {
        println!("{line}");
    }
    Ok(())
}

/// One line per role, naming the actor placed there by input position.
fn role_lines(found: &Assignment<&str>, actors: &[(&str, Fragment)]) -> Vec<String> {
    let mut by_role: Vec<Option<usize>> = vec![None; found.by_slot().len()];
    for i in 0..actors.len() {
        if let Some(slot) = found.slot_of(i) {
            by_role[slot] = Some(i);
        }
    }
    by_role
        .iter()
        .enumerate()
        .map(|(slot, actor)| match *actor {
            Some(i) => format!(
                "role {slot}: {}{}",
                actors[i].0,
                if found.degendered().contains(&i) { " (as male)" } else { "" }
            ),
            None => format!("role {slot}: -"),
        })
        .collect()
}

fn path_cmd(library: &Library, id: &str, stage: Option<&str>, shortest: bool) -> Result<()> {
    let scene = find_scene(library, id)?;
    let src = find_stage(scene, stage)?;
    let route = if shortest {
        scene.shortest_route(src)
    } else {
        scene.longest_path(src)
    };
    let ids: Vec<&str> = route.iter().map(|s| s.id()).collect();
    println!("{}", ids.join(" -> "));
    Ok(())
}

fn plan_cmd(library: &Library, id: &str, stage: Option<&str>, at: &str) -> Result<()> {
    let scene = find_scene(library, id)?;
    let stage = find_stage(scene, stage)?;
    let values = at
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("bad coordinate {at:?}"))?;
    let Some(mut center) = Coordinate::from_slice(&values) else {
        bail!("coordinate needs four values, got {}", values.len());
    };
    scene.apply_scene_offset(&mut center);
    let plan = scene.plan_stage(stage, center);
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
