use crate::config::ImportConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const USAGE: &str = "gather_tiled

Usage:
  gather_tiled import <map.json> <output_dir> [options] [--verify]
  gather_tiled remote-import <space_id> <map_id> <output_dir> [options] [--verify]
  gather_tiled spaces [options]
  gather_tiled maps <space_id> [options]

Options:
  --config <file>      JSON config file
  --cache-dir <dir>    cache root for downloaded images
  --tile-px <n>        tile size in pixels (default 32)
  --api-key <key>      map service API key (or GATHER_API_KEY)
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Import { map_path: PathBuf, output_dir: PathBuf, verify: bool },
    RemoteImport { space_id: String, map_id: String, output_dir: PathBuf, verify: bool },
    Spaces,
    Maps { space_id: String },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub config_path: Option<PathBuf>,
    pub overrides: ImportConfigOverrides,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positional: Vec<String> = Vec::new();
        let mut config_path = None;
        let mut overrides = ImportConfigOverrides::default();
        let mut verify = false;
        let mut help = false;
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw) = iter.next() {
            let arg = raw.as_ref();
            if !arg.starts_with("--") {
                positional.push(arg.to_string());
                continue;
            }
            let key = &arg[2..];
            match key {
                "verify" => {
                    verify = true;
                    continue;
                }
                "help" => {
                    help = true;
                    continue;
                }
                _ => {}
            }
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?.as_ref().to_string();
            match key {
                "config" => config_path = Some(PathBuf::from(value)),
                "cache-dir" => overrides.cache_root = Some(PathBuf::from(value)),
                "tile-px" => {
                    let tile_px = value.parse::<u32>().with_context(|| format!("Invalid tile size '{value}'"))?;
                    if tile_px == 0 {
                        bail!("--tile-px must be greater than zero");
                    }
                    overrides.tile_px = Some(tile_px);
                }
                "api-key" => overrides.api_key = Some(value),
                _ => bail!("Unknown flag '{arg}'. Supported flags: --config, --cache-dir, --tile-px, --api-key, --verify."),
            }
        }

        let command = if help || positional.is_empty() {
            Command::Help
        } else {
            parse_command(&positional, verify)?
        };
        Ok(Self { command, config_path, overrides })
    }
}

fn parse_command(positional: &[String], verify: bool) -> Result<Command> {
    let (name, rest) = positional.split_first().ok_or_else(|| anyhow!("Missing command"))?;
    let command = match (name.as_str(), rest) {
        ("import", [map_path, output_dir]) => {
            Command::Import { map_path: map_path.into(), output_dir: output_dir.into(), verify }
        }
        ("remote-import", [space_id, map_id, output_dir]) => Command::RemoteImport {
            space_id: space_id.clone(),
            map_id: map_id.clone(),
            output_dir: output_dir.into(),
            verify,
        },
        ("spaces", []) => Command::Spaces,
        ("maps", [space_id]) => Command::Maps { space_id: space_id.clone() },
        ("import" | "remote-import" | "spaces" | "maps", _) => {
            bail!("Wrong number of arguments for '{name}'.\n\n{USAGE}")
        }
        (other, _) => bail!("Unknown command '{other}'.\n\n{USAGE}"),
    };
    if verify && !matches!(command, Command::Import { .. } | Command::RemoteImport { .. }) {
        bail!("--verify only applies to import commands");
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_with_flags() {
        let args = ["gather_tiled", "import", "map.json", "out", "--tile-px", "16", "--verify", "--cache-dir", "/tmp/c"];
        let parsed = CliArgs::parse(args).expect("parse args");
        assert_eq!(
            parsed.command,
            Command::Import { map_path: "map.json".into(), output_dir: "out".into(), verify: true }
        );
        assert_eq!(parsed.overrides.tile_px, Some(16));
        assert_eq!(parsed.overrides.cache_root, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn parses_remote_commands() {
        let parsed = CliArgs::parse(["app", "maps", "abc\\Office", "--api-key", "k"]).expect("parse");
        assert_eq!(parsed.command, Command::Maps { space_id: "abc\\Office".to_string() });
        assert_eq!(parsed.overrides.api_key.as_deref(), Some("k"));
        let parsed = CliArgs::parse(["app", "remote-import", "s", "m", "out"]).expect("parse");
        assert!(matches!(parsed.command, Command::RemoteImport { verify: false, .. }));
    }

    #[test]
    fn no_arguments_means_help() {
        assert_eq!(CliArgs::parse(["app"]).expect("parse").command, Command::Help);
    }

    #[test]
    fn missing_value_errors() {
        let err = CliArgs::parse(["app", "import", "a", "b", "--tile-px"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_zero_tile_size_and_unknown_flags() {
        assert!(CliArgs::parse(["app", "spaces", "--tile-px", "0"]).is_err());
        let err = CliArgs::parse(["app", "spaces", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
    }

    #[test]
    fn wrong_arity_is_reported() {
        let err = CliArgs::parse(["app", "import", "only-one"]).unwrap_err();
        assert!(err.to_string().contains("Wrong number of arguments"), "{err}");
    }
}
