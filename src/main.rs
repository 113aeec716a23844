use anyhow::{anyhow, Context, Result};
use gather_tiled::cli::{CliArgs, Command, USAGE};
use gather_tiled::config::ImportConfig;
use gather_tiled::remote::RemoteClient;
use gather_tiled::{import_with_cache, HttpFetcher, ImportOptions, MapDocument};
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = match CliArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[gather_tiled] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        eprintln!("[gather_tiled] error: {err:?}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let mut config = match &args.config_path {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::default(),
    };
    if !args.overrides.is_empty() {
        info!("CLI overrides applied: {}", args.overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&args.overrides);
    config.validate()?;

    match args.command {
        Command::Help => {
            print!("{USAGE}");
            Ok(())
        }
        Command::Import { map_path, output_dir, verify } => {
            let bytes =
                fs::read(&map_path).with_context(|| format!("failed to read '{}'", map_path.display()))?;
            let map = MapDocument::parse(&bytes).with_context(|| format!("'{}'", map_path.display()))?;
            let name = map_path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("map").to_string();
            convert(&config, &map, &output_dir, name, verify)
        }
        Command::RemoteImport { space_id, map_id, output_dir, verify } => {
            let mut fetcher = HttpFetcher::new(config.request_timeout())?;
            let api_key = require_api_key(&config)?;
            let map = RemoteClient::new(&config.api_base_url, &api_key, &mut fetcher).get_map(&space_id, &map_id)?;
            convert(&config, &map, &output_dir, sanitize_name(&map_id), verify)
        }
        Command::Spaces => {
            let mut fetcher = HttpFetcher::new(config.request_timeout())?;
            let api_key = require_api_key(&config)?;
            for space in RemoteClient::new(&config.api_base_url, &api_key, &mut fetcher).list_spaces()? {
                println!("{}\t{}", space.id, space.name.unwrap_or_default());
            }
            Ok(())
        }
        Command::Maps { space_id } => {
            let mut fetcher = HttpFetcher::new(config.request_timeout())?;
            let api_key = require_api_key(&config)?;
            for map in RemoteClient::new(&config.api_base_url, &api_key, &mut fetcher).list_maps(&space_id)? {
                println!("{}\t{}", map.id, map.name.unwrap_or_default());
            }
            Ok(())
        }
    }
}

fn convert(config: &ImportConfig, map: &MapDocument, output_dir: &Path, name: String, verify: bool) -> Result<()> {
    let cache_root = config.absolute_cache_root()?;
    let mut fetcher = HttpFetcher::new(config.request_timeout())?;
    let options = ImportOptions { tile_px: config.tile_px, output_dir: output_dir.to_path_buf(), name, verify };
    let summary = import_with_cache(&cache_root, &config.cache_index_name, &mut fetcher, map, &options)?;

    println!("Wrote {}", summary.map_path.display());
    if let Some(atlas_path) = &summary.atlas_path {
        println!("Wrote {}", atlas_path.display());
    }
    if let Some((width, height)) = summary.grid_size {
        println!("Background: {width}x{height} cells, {} unique tiles", summary.unique_tiles);
    }
    println!("Objects: {} placed, {} distinct sprites", summary.objects, summary.object_sprites);
    println!("Cache: {} assets indexed in {}", summary.cached_assets, cache_root.display());
    if summary.verified == Some(false) {
        return Err(anyhow!("atlas reconstruction does not match the background image"));
    }
    Ok(())
}

fn require_api_key(config: &ImportConfig) -> Result<String> {
    config
        .resolve_api_key()
        .ok_or_else(|| anyhow!("an API key is required: pass --api-key or set {}", ImportConfig::API_KEY_ENV))
}

fn sanitize_name(raw: &str) -> String {
    let name: String =
        raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();
    if name.is_empty() {
        "map".to_string()
    } else {
        name
    }
}
